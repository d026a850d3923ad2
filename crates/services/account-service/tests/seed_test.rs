//! Fixture seeding tests.

use std::collections::BTreeMap;

use serde_json::json;

use account_service_lib::config::{AccountServiceConfig, StorageDriver};
use account_service_lib::repository::{Filter, Gateway};
use account_service_lib::{run_seed, seed_gateway};
use common::AppError;
use domain::Record;

fn fixtures(value: serde_json::Value) -> BTreeMap<String, Vec<Record>> {
    serde_json::from_value(value).expect("fixtures must be resource arrays")
}

#[tokio::test]
async fn test_seed_creates_every_resource() {
    let gateway = Gateway::in_memory();

    let created = seed_gateway(
        &gateway,
        fixtures(json!({
            "attribute": [{ "business_id": 1, "name": "color", "value": "blue" }],
            "business": [{ "email": "shop@example.com", "password_hash": "hash", "name": "Shop" }],
            "user": [
                { "email": "a@example.com", "password_hash": "hash" },
                { "email": "b@example.com", "password_hash": "hash" }
            ]
        })),
    )
    .await
    .unwrap();

    assert_eq!(created, vec![("user", 2), ("business", 1), ("attribute", 1)]);
    assert_eq!(gateway.find_many("user", &Filter::all()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_seed_rejects_unknown_resource_before_inserting() {
    let gateway = Gateway::in_memory();

    let result = seed_gateway(
        &gateway,
        fixtures(json!({
            "user": [{ "email": "a@example.com", "password_hash": "hash" }],
            "invoice": [{ "total": 1 }]
        })),
    )
    .await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
    assert!(gateway.find_many("user", &Filter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seed_batch_is_atomic_per_resource() {
    let gateway = Gateway::in_memory();

    let result = seed_gateway(
        &gateway,
        fixtures(json!({
            "user": [
                { "email": "a@example.com", "password_hash": "hash" },
                { "email": "a@example.com", "password_hash": "hash" }
            ]
        })),
    )
    .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(gateway.find_many("user", &Filter::all()).await.unwrap().is_empty());
}

fn memory_config() -> AccountServiceConfig {
    AccountServiceConfig {
        storage: StorageDriver::Memory,
        ..AccountServiceConfig::default()
    }
}

#[tokio::test]
async fn test_run_seed_reads_fixture_file() {
    let path = std::env::temp_dir().join(format!("account-seed-{}.json", std::process::id()));
    tokio::fs::write(
        &path,
        r#"{ "user": [{ "email": "a@example.com", "password_hash": "hash" }] }"#,
    )
    .await
    .unwrap();

    let result = run_seed(&memory_config(), &path).await;
    tokio::fs::remove_file(&path).await.unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_run_seed_missing_file_is_configuration_error() {
    let path = std::env::temp_dir().join("account-seed-does-not-exist.json");

    let result = run_seed(&memory_config(), &path).await;

    assert!(matches!(result, Err(AppError::Configuration(msg)) if msg.starts_with("Cannot read")));
}

#[tokio::test]
async fn test_run_seed_malformed_file_is_configuration_error() {
    let path = std::env::temp_dir().join(format!("account-seed-bad-{}.json", std::process::id()));
    tokio::fs::write(&path, "[1, 2, 3]").await.unwrap();

    let result = run_seed(&memory_config(), &path).await;
    tokio::fs::remove_file(&path).await.unwrap();

    assert!(matches!(result, Err(AppError::Configuration(msg)) if msg.starts_with("Invalid seed file")));
}
