//! Repository layer for data access.
//!
//! `Gateway` routes each operation to the collection registered under the
//! resource name. Collections are backed either by Postgres (`SeaCollection`)
//! or by process memory (`MemoryCollection`).

mod collection;
pub mod entities;
mod gateway;
mod memory;
mod sea;

pub use collection::{Filter, ResourceCollection, UniqueKey};
#[cfg(any(test, feature = "test-utils"))]
pub use collection::MockResourceCollection;
pub use gateway::{Gateway, GatewayBuilder};
pub use memory::MemoryCollection;
pub use sea::{ResourceEntity, SeaCollection};
