//! Account Service Library
//!
//! Data access for user, business and attribute accounts: a gateway over
//! per-resource collections (Postgres or in-memory), the services built on
//! it, and test doubles for the gateway.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;
pub mod testing;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::info;

use common::{AppError, AppResult};
use domain::{Record, RESOURCES};

use crate::config::{AccountServiceConfig, StorageDriver};
use crate::infra::Database;
use crate::repository::entities::{attribute, business, user};
use crate::repository::{Filter, Gateway, SeaCollection};

/// Gateway over Postgres tables for every resource.
pub fn postgres_gateway(db: Arc<DatabaseConnection>) -> Gateway {
    Gateway::builder()
        .register(Arc::new(SeaCollection::<user::Entity>::new(db.clone())))
        .register(Arc::new(SeaCollection::<business::Entity>::new(db.clone())))
        .register(Arc::new(SeaCollection::<attribute::Entity>::new(db)))
        .build()
}

/// Build the gateway for the configured storage engine.
///
/// Postgres connections apply pending migrations first.
pub async fn connect_gateway(config: &AccountServiceConfig) -> AppResult<Gateway> {
    match config.storage {
        StorageDriver::Memory => {
            info!("Using in-memory storage");
            Ok(Gateway::in_memory())
        }
        StorageDriver::Postgres => {
            let db = Database::connect(&config.database).await?;
            Ok(postgres_gateway(db.get_connection()))
        }
    }
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(config: &AccountServiceConfig, action: MigrateAction) -> AppResult<()> {
    if config.storage == StorageDriver::Memory {
        return Err(AppError::configuration(
            "Migrations require the postgres storage driver",
        ));
    }

    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Check that the configured storage is reachable.
pub async fn run_check(config: &AccountServiceConfig) -> AppResult<()> {
    match config.storage {
        StorageDriver::Memory => println!("storage: memory (always available)"),
        StorageDriver::Postgres => {
            let db = Database::connect_without_migrations(&config.database).await?;
            db.ping().await?;
            println!("storage: postgres (reachable)");
        }
    }
    Ok(())
}

/// Insert fixture records, resource by resource, each batch atomically.
///
/// Resources are seeded in dependency order (users, businesses, attributes).
/// Returns the number of records created per resource.
pub async fn seed_gateway(
    gateway: &Gateway,
    mut fixtures: BTreeMap<String, Vec<Record>>,
) -> AppResult<Vec<(&'static str, u64)>> {
    if let Some(unknown) = fixtures.keys().find(|name| !gateway.owns(name)) {
        return Err(AppError::configuration(format!(
            "Cannot seed unknown resource '{}'",
            unknown
        )));
    }

    let mut created = Vec::new();
    for resource in RESOURCES.iter().copied() {
        let Some(records) = fixtures.remove(resource) else {
            continue;
        };
        let count = gateway.create_many(resource, records).await?;
        info!(resource, count, "Seeded");
        created.push((resource, count));
    }
    Ok(created)
}

/// Seed the configured storage from a JSON file `{ "<resource>": [records] }`.
pub async fn run_seed(config: &AccountServiceConfig, path: &Path) -> AppResult<()> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::configuration(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let fixtures: BTreeMap<String, Vec<Record>> = serde_json::from_str(&raw).map_err(|e| {
        AppError::configuration(format!("Invalid seed file {}: {}", path.display(), e))
    })?;

    let gateway = connect_gateway(config).await?;
    for (resource, count) in seed_gateway(&gateway, fixtures).await? {
        println!("{}: {} created", resource, count);
    }
    Ok(())
}

/// Print every record of a resource as JSON.
pub async fn run_list(config: &AccountServiceConfig, resource: &str) -> AppResult<()> {
    let gateway = connect_gateway(config).await?;
    let records = gateway.find_many(resource, &Filter::all()).await?;

    let rendered = serde_json::to_string_pretty(&records)
        .map_err(|e| AppError::internal(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
