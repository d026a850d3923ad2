//! Business service - business accounts and their lifecycle.

use async_trait::async_trait;
use validator::Validate;

use common::AppResult;
use domain::{
    decode_record, Business, CreateBusiness, Password, UpdateBusiness, RESOURCE_ATTRIBUTE,
    RESOURCE_BUSINESS,
};

use crate::repository::{Filter, Gateway, UniqueKey};

#[async_trait]
pub trait BusinessService: Send + Sync {
    /// Validate the DTO (including the embedded user rules) and store it
    async fn register_business(&self, input: CreateBusiness) -> AppResult<Business>;

    async fn get_business(&self, id: i64) -> AppResult<Business>;

    async fn list_businesses(&self) -> AppResult<Vec<Business>>;

    async fn update_business(&self, id: i64, input: UpdateBusiness) -> AppResult<Business>;

    /// Delete the business together with its attributes
    async fn delete_business(&self, id: i64) -> AppResult<Business>;
}

#[derive(Clone)]
pub struct BusinessManager {
    gateway: Gateway,
}

impl BusinessManager {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl BusinessService for BusinessManager {
    async fn register_business(&self, input: CreateBusiness) -> AppResult<Business> {
        input.validate()?;
        let password = Password::new(&input.user.password)?;

        let record = self
            .gateway
            .create(RESOURCE_BUSINESS, input.into_record(password))
            .await?;
        let business: Business = decode_record(RESOURCE_BUSINESS, record)?;

        tracing::info!(business_id = business.id, "Business registered");
        Ok(business)
    }

    async fn get_business(&self, id: i64) -> AppResult<Business> {
        let record = self
            .gateway
            .find_unique_or_fail(RESOURCE_BUSINESS, &UniqueKey::id(id))
            .await?;
        Ok(decode_record(RESOURCE_BUSINESS, record)?)
    }

    async fn list_businesses(&self) -> AppResult<Vec<Business>> {
        self.gateway
            .find_many(RESOURCE_BUSINESS, &Filter::all())
            .await?
            .into_iter()
            .map(|record| decode_record(RESOURCE_BUSINESS, record).map_err(Into::into))
            .collect()
    }

    async fn update_business(&self, id: i64, input: UpdateBusiness) -> AppResult<Business> {
        input.validate()?;
        let record = self
            .gateway
            .update(RESOURCE_BUSINESS, &UniqueKey::id(id), input.into_patch())
            .await?;
        Ok(decode_record(RESOURCE_BUSINESS, record)?)
    }

    /// The business goes first: a failed delete leaves its attributes in
    /// place. Postgres cascades to the attributes in the same statement; the
    /// sweep afterwards clears them for engines without foreign keys.
    async fn delete_business(&self, id: i64) -> AppResult<Business> {
        let record = self
            .gateway
            .delete(RESOURCE_BUSINESS, &UniqueKey::id(id))
            .await?;

        let removed = self
            .gateway
            .delete_many(RESOURCE_ATTRIBUTE, &Filter::all().eq("business_id", id))
            .await?;

        tracing::info!(business_id = id, attributes = removed, "Business deleted");
        Ok(decode_record(RESOURCE_BUSINESS, record)?)
    }
}
