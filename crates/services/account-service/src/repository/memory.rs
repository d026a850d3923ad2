//! In-memory storage engine.
//!
//! Enforces the same schema rules as the Postgres engine (declared fields,
//! required fields, unique fields, timestamps) so tests and local runs see the
//! same errors. Foreign keys are not enforced.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use common::{AppError, AppResult};
use domain::{Record, ResourceSchema};

use super::collection::{Filter, ResourceCollection, UniqueKey};

/// Rows of one resource keyed by primary key
#[derive(Debug, Clone, Default)]
struct MemoryTable {
    rows: BTreeMap<i64, Record>,
    last_id: i64,
}

impl MemoryTable {
    fn locate(&self, key: &UniqueKey) -> Option<i64> {
        self.rows
            .iter()
            .find(|(_, record)| key.matches(record))
            .map(|(id, _)| *id)
    }

    fn matching(&self, filter: &Filter) -> Vec<i64> {
        self.rows
            .iter()
            .filter(|(_, record)| filter.matches(record))
            .map(|(id, _)| *id)
            .collect()
    }

    fn check_unique(
        &self,
        schema: &ResourceSchema,
        record: &Record,
        exclude: Option<i64>,
    ) -> AppResult<()> {
        for spec in schema.unique_fields() {
            let Some(value) = record.get(spec.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .rows
                .iter()
                .any(|(id, other)| Some(*id) != exclude && other.get(spec.name) == Some(value));
            if taken {
                return Err(AppError::conflict(format!(
                    "{}.{} already exists",
                    schema.name, spec.name
                )));
            }
        }
        Ok(())
    }

    fn insert(
        &mut self,
        schema: &ResourceSchema,
        mut record: Record,
        now: DateTime<Utc>,
    ) -> AppResult<Record> {
        schema.check_payload(&record)?;
        schema.canonicalize(&mut record);

        let id = match record.get(schema.primary_key).and_then(Value::as_i64) {
            Some(id) if self.rows.contains_key(&id) => {
                return Err(AppError::conflict(format!(
                    "{}.{} already exists",
                    schema.name, schema.primary_key
                )));
            }
            Some(id) => id,
            None => self.last_id.checked_add(1).ok_or_else(|| {
                AppError::conflict(format!(
                    "{}.{} has no values left to assign",
                    schema.name, schema.primary_key
                ))
            })?,
        };

        record.insert(schema.primary_key.to_string(), Value::from(id));
        schema.stamp_created(&mut record, now);
        self.check_unique(schema, &record, None)?;

        self.last_id = self.last_id.max(id);
        self.rows.insert(id, record.clone());
        Ok(record)
    }

    fn patch(
        &mut self,
        schema: &ResourceSchema,
        id: i64,
        patch: &Record,
        now: DateTime<Utc>,
    ) -> AppResult<Record> {
        let mut record = self.rows.get(&id).cloned().ok_or(AppError::NotFound)?;
        record.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
        schema.stamp_updated(&mut record, now);
        self.check_unique(schema, &record, Some(id))?;

        self.rows.insert(id, record.clone());
        Ok(record)
    }
}

/// One resource held in process memory.
pub struct MemoryCollection {
    schema: &'static ResourceSchema,
    inner: Mutex<MemoryTable>,
}

impl MemoryCollection {
    pub fn new(schema: &'static ResourceSchema) -> Self {
        Self {
            schema,
            inner: Mutex::new(MemoryTable::default()),
        }
    }

    fn table(&self) -> AppResult<MutexGuard<'_, MemoryTable>> {
        self.inner
            .lock()
            .map_err(|_| AppError::internal("mutex poisoned"))
    }
}

#[async_trait]
impl ResourceCollection for MemoryCollection {
    fn name(&self) -> &'static str {
        self.schema.name
    }

    async fn find_many(&self, filter: &Filter) -> AppResult<Vec<Record>> {
        filter.validate(self.schema)?;
        let filter = filter.canonical(self.schema);
        let table = self.table()?;
        Ok(table
            .rows
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn find_unique(&self, key: &UniqueKey) -> AppResult<Option<Record>> {
        key.validate(self.schema)?;
        let key = key.canonical(self.schema);
        let table = self.table()?;
        Ok(table.locate(&key).and_then(|id| table.rows.get(&id).cloned()))
    }

    async fn create(&self, payload: Record) -> AppResult<Record> {
        let mut table = self.table()?;
        table.insert(self.schema, payload, Utc::now())
    }

    async fn create_many(&self, payloads: Vec<Record>) -> AppResult<u64> {
        let now = Utc::now();
        let mut table = self.table()?;

        // Work on a copy so a failing payload leaves the table untouched
        let mut staged = table.clone();
        for payload in payloads.iter().cloned() {
            staged.insert(self.schema, payload, now)?;
        }
        *table = staged;

        Ok(payloads.len() as u64)
    }

    async fn update(&self, key: &UniqueKey, mut patch: Record) -> AppResult<Record> {
        key.validate(self.schema)?;
        self.schema.check_patch(&patch)?;
        self.schema.canonicalize(&mut patch);
        let key = key.canonical(self.schema);

        let mut table = self.table()?;
        let id = table.locate(&key).ok_or(AppError::NotFound)?;
        table.patch(self.schema, id, &patch, Utc::now())
    }

    async fn update_many(&self, filter: &Filter, mut patch: Record) -> AppResult<u64> {
        filter.validate(self.schema)?;
        self.schema.check_patch(&patch)?;
        self.schema.canonicalize(&mut patch);
        let filter = filter.canonical(self.schema);

        let now = Utc::now();
        let mut table = self.table()?;
        let ids = table.matching(&filter);

        let mut staged = table.clone();
        for id in &ids {
            staged.patch(self.schema, *id, &patch, now)?;
        }
        *table = staged;

        Ok(ids.len() as u64)
    }

    async fn delete(&self, key: &UniqueKey) -> AppResult<Record> {
        key.validate(self.schema)?;
        let key = key.canonical(self.schema);
        let mut table = self.table()?;
        let id = table.locate(&key).ok_or(AppError::NotFound)?;
        table.rows.remove(&id).ok_or(AppError::NotFound)
    }

    async fn delete_many(&self, filter: &Filter) -> AppResult<u64> {
        filter.validate(self.schema)?;
        let filter = filter.canonical(self.schema);
        let mut table = self.table()?;
        let ids = table.matching(&filter);
        for id in &ids {
            table.rows.remove(id);
        }
        Ok(ids.len() as u64)
    }
}
