//! Postgres storage engine built on SeaORM.
//!
//! One generic collection serves every entity: records travel as JSON
//! objects and are converted to active models with `ActiveModel::from_json`,
//! filters become `Condition::all()` of column equalities.

use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, SqlErr,
    TransactionTrait, TryIntoModel, Value as SeaValue,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use common::{AppError, AppResult};
use domain::{FieldKind, FieldSpec, Record, ResourceSchema};

use super::collection::{Filter, ResourceCollection, UniqueKey};

/// Entity that stores one resource
pub trait ResourceEntity: EntityTrait {
    fn schema() -> &'static ResourceSchema;
}

/// One resource stored in a Postgres table.
pub struct SeaCollection<E> {
    db: Arc<DatabaseConnection>,
    entity: PhantomData<fn() -> E>,
}

impl<E> SeaCollection<E> {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            entity: PhantomData,
        }
    }
}

impl<E> SeaCollection<E>
where
    E: ResourceEntity,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel:
        ActiveModelTrait<Entity = E> + ActiveModelBehavior + TryIntoModel<E::Model> + Send + Sync,
{
    fn schema() -> &'static ResourceSchema {
        E::schema()
    }

    fn column(name: &str) -> AppResult<E::Column> {
        E::Column::from_str(name).map_err(|_| {
            AppError::internal(format!("{} has no column '{}'", Self::schema().name, name))
        })
    }

    fn condition(filter: &Filter) -> AppResult<Condition> {
        let schema = Self::schema();
        let mut condition = Condition::all();
        for (field, value) in filter.conditions() {
            let spec = schema.check_field(field)?;
            let column = Self::column(field)?;
            condition = if value.is_null() {
                condition.add(column.is_null())
            } else {
                condition.add(column.eq(sea_value(spec, value)?))
            };
        }
        Ok(condition)
    }

    fn key_condition(key: &UniqueKey) -> AppResult<Condition> {
        let spec = Self::schema().check_unique_key(&key.field)?;
        let column = Self::column(&key.field)?;
        Ok(Condition::all().add(column.eq(sea_value(spec, &key.value)?)))
    }

    fn to_record(model: E::Model) -> AppResult<Record> {
        match serde_json::to_value(model) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(_) => Err(AppError::internal(format!(
                "{} model did not serialize to an object",
                Self::schema().name
            ))),
            Err(e) => Err(AppError::internal(e.to_string())),
        }
    }

    fn to_active_model(record: Record) -> AppResult<E::ActiveModel> {
        E::ActiveModel::from_json(Value::Object(record)).map_err(|e| map_db_err(Self::schema(), e))
    }

    /// Validate, stamp and convert a creation payload
    fn prepare_insert(mut payload: Record, now: DateTime<Utc>) -> AppResult<E::ActiveModel> {
        let schema = Self::schema();
        schema.check_payload(&payload)?;
        schema.stamp_created(&mut payload, now);

        let generated = !payload
            .get(schema.primary_key)
            .is_some_and(|id| !id.is_null());
        if generated {
            // Placeholder so the model deserializes; the column is left unset
            payload.insert(schema.primary_key.to_string(), Value::from(0));
        }

        let mut active = Self::to_active_model(payload)?;
        if generated {
            active.not_set(Self::column(schema.primary_key)?);
        }
        Ok(active)
    }

    async fn find_record(&self, key: &UniqueKey) -> AppResult<Option<E::Model>> {
        key.validate(Self::schema())?;
        E::find()
            .filter(Self::key_condition(key)?)
            .one(&*self.db)
            .await
            .map_err(|e| map_db_err(Self::schema(), e))
    }
}

#[async_trait]
impl<E> ResourceCollection for SeaCollection<E>
where
    E: ResourceEntity,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel:
        ActiveModelTrait<Entity = E> + ActiveModelBehavior + TryIntoModel<E::Model> + Send + Sync,
{
    fn name(&self) -> &'static str {
        Self::schema().name
    }

    async fn find_many(&self, filter: &Filter) -> AppResult<Vec<Record>> {
        let schema = Self::schema();
        filter.validate(schema)?;

        let models = E::find()
            .filter(Self::condition(filter)?)
            .order_by_asc(Self::column(schema.primary_key)?)
            .all(&*self.db)
            .await
            .map_err(|e| map_db_err(schema, e))?;

        models.into_iter().map(Self::to_record).collect()
    }

    async fn find_unique(&self, key: &UniqueKey) -> AppResult<Option<Record>> {
        self.find_record(key).await?.map(Self::to_record).transpose()
    }

    async fn create(&self, payload: Record) -> AppResult<Record> {
        let active = Self::prepare_insert(payload, Utc::now())?;
        let model = active
            .insert(&*self.db)
            .await
            .map_err(|e| map_db_err(Self::schema(), e))?;
        Self::to_record(model)
    }

    async fn create_many(&self, payloads: Vec<Record>) -> AppResult<u64> {
        if payloads.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let models = payloads
            .into_iter()
            .map(|payload| Self::prepare_insert(payload, now))
            .collect::<AppResult<Vec<_>>>()?;
        let count = models.len() as u64;

        let txn = self.db.begin().await.map_err(AppError::from)?;
        for active in models {
            if let Err(e) = active.insert(&txn).await {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                return Err(map_db_err(Self::schema(), e));
            }
        }
        txn.commit().await.map_err(AppError::from)?;

        Ok(count)
    }

    async fn update(&self, key: &UniqueKey, patch: Record) -> AppResult<Record> {
        let schema = Self::schema();
        schema.check_patch(&patch)?;

        let existing = self.find_record(key).await?.ok_or(AppError::NotFound)?;
        let mut record = Self::to_record(existing)?;
        record.extend(patch);
        schema.stamp_updated(&mut record, Utc::now());

        let model = Self::to_active_model(record)?
            .update(&*self.db)
            .await
            .map_err(|e| map_db_err(schema, e))?;
        Self::to_record(model)
    }

    async fn update_many(&self, filter: &Filter, mut patch: Record) -> AppResult<u64> {
        let schema = Self::schema();
        filter.validate(schema)?;
        schema.check_patch(&patch)?;
        schema.stamp_updated(&mut patch, Utc::now());

        let condition = Self::condition(filter)?;
        if patch.is_empty() {
            return E::find()
                .filter(condition)
                .count(&*self.db)
                .await
                .map_err(|e| map_db_err(schema, e));
        }

        let mut update = E::update_many().filter(condition);
        for (field, value) in &patch {
            let spec = schema.check_field(field)?;
            update = update.col_expr(Self::column(field)?, Expr::value(sea_value(spec, value)?));
        }

        let result = update
            .exec(&*self.db)
            .await
            .map_err(|e| map_db_err(schema, e))?;
        Ok(result.rows_affected)
    }

    async fn delete(&self, key: &UniqueKey) -> AppResult<Record> {
        let schema = Self::schema();
        let existing = self.find_record(key).await?.ok_or(AppError::NotFound)?;

        let result = E::delete_many()
            .filter(Self::key_condition(key)?)
            .exec(&*self.db)
            .await
            .map_err(|e| map_db_err(schema, e))?;
        // Removed by someone else between the read and the delete
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Self::to_record(existing)
    }

    async fn delete_many(&self, filter: &Filter) -> AppResult<u64> {
        let schema = Self::schema();
        filter.validate(schema)?;

        let result = E::delete_many()
            .filter(Self::condition(filter)?)
            .exec(&*self.db)
            .await
            .map_err(|e| map_db_err(schema, e))?;
        Ok(result.rows_affected)
    }
}

/// Typed SeaORM value for a JSON field value; nulls stay typed.
fn sea_value(spec: &FieldSpec, value: &Value) -> AppResult<SeaValue> {
    let invalid = || AppError::validation(format!("{} must be {}", spec.name, spec.kind));

    let converted: SeaValue = match spec.kind {
        FieldKind::Integer => match value {
            Value::Null => Option::<i64>::None.into(),
            _ => value.as_i64().ok_or_else(invalid)?.into(),
        },
        FieldKind::Text => match value {
            Value::Null => Option::<String>::None.into(),
            _ => value.as_str().ok_or_else(invalid)?.to_owned().into(),
        },
        FieldKind::Timestamp => match value {
            Value::Null => Option::<DateTime<Utc>>::None.into(),
            _ => value
                .as_str()
                .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                .ok_or_else(invalid)?
                .into(),
        },
    };
    Ok(converted)
}

/// Map driver errors onto the shared error kinds.
fn map_db_err(schema: &ResourceSchema, err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            let field = schema
                .unique_fields()
                .find(|spec| detail.contains(spec.name))
                .map(|spec| spec.name);
            return match field {
                Some(field) => AppError::conflict(format!("{}.{} already exists", schema.name, field)),
                None => AppError::conflict(format!("{} already exists", schema.name)),
            };
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            return AppError::conflict(format!("{} references a missing record", schema.name));
        }
        _ => {}
    }

    match err {
        DbErr::Json(msg) => AppError::validation(msg),
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => AppError::NotFound,
        other => AppError::Database(other),
    }
}
