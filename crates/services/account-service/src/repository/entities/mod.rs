//! SeaORM entities backing the Postgres collections.

pub mod attribute;
pub mod business;
pub mod user;
