//! Attribute service - named values attached to businesses.

use std::collections::BTreeSet;

use async_trait::async_trait;
use validator::Validate;

use common::AppResult;
use domain::{
    decode_record, Attribute, CreateAttribute, UpdateAttribute, RESOURCE_ATTRIBUTE,
    RESOURCE_BUSINESS,
};

use crate::repository::{Filter, Gateway, UniqueKey};

#[async_trait]
pub trait AttributeService: Send + Sync {
    /// Attach an attribute to an existing business
    async fn create_attribute(&self, input: CreateAttribute) -> AppResult<Attribute>;

    /// Attach a batch of attributes; nothing is stored unless all are valid
    async fn create_attributes(&self, inputs: Vec<CreateAttribute>) -> AppResult<u64>;

    /// Attributes of one business
    async fn list_attributes(&self, business_id: i64) -> AppResult<Vec<Attribute>>;

    async fn update_attribute(&self, id: i64, input: UpdateAttribute) -> AppResult<Attribute>;

    async fn delete_attribute(&self, id: i64) -> AppResult<Attribute>;
}

#[derive(Clone)]
pub struct AttributeManager {
    gateway: Gateway,
}

impl AttributeManager {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    async fn require_business(&self, business_id: i64) -> AppResult<()> {
        self.gateway
            .find_unique_or_fail(RESOURCE_BUSINESS, &UniqueKey::id(business_id))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl AttributeService for AttributeManager {
    async fn create_attribute(&self, input: CreateAttribute) -> AppResult<Attribute> {
        input.validate()?;
        self.require_business(input.business_id).await?;

        let record = self
            .gateway
            .create(RESOURCE_ATTRIBUTE, input.into_record())
            .await?;
        Ok(decode_record(RESOURCE_ATTRIBUTE, record)?)
    }

    async fn create_attributes(&self, inputs: Vec<CreateAttribute>) -> AppResult<u64> {
        for input in &inputs {
            input.validate()?;
        }

        let owners: BTreeSet<i64> = inputs.iter().map(|input| input.business_id).collect();
        for business_id in owners {
            self.require_business(business_id).await?;
        }

        let records = inputs.into_iter().map(CreateAttribute::into_record).collect();
        let count = self.gateway.create_many(RESOURCE_ATTRIBUTE, records).await?;

        tracing::info!(count, "Attributes created");
        Ok(count)
    }

    async fn list_attributes(&self, business_id: i64) -> AppResult<Vec<Attribute>> {
        self.gateway
            .find_many(
                RESOURCE_ATTRIBUTE,
                &Filter::all().eq("business_id", business_id),
            )
            .await?
            .into_iter()
            .map(|record| decode_record(RESOURCE_ATTRIBUTE, record).map_err(Into::into))
            .collect()
    }

    async fn update_attribute(&self, id: i64, input: UpdateAttribute) -> AppResult<Attribute> {
        input.validate()?;
        let record = self
            .gateway
            .update(RESOURCE_ATTRIBUTE, &UniqueKey::id(id), input.into_patch())
            .await?;
        Ok(decode_record(RESOURCE_ATTRIBUTE, record)?)
    }

    async fn delete_attribute(&self, id: i64) -> AppResult<Attribute> {
        let record = self
            .gateway
            .delete(RESOURCE_ATTRIBUTE, &UniqueKey::id(id))
            .await?;
        Ok(decode_record(RESOURCE_ATTRIBUTE, record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AppError;
    use serde_json::json;

    async fn gateway_with_business() -> (Gateway, i64) {
        let gateway = Gateway::in_memory();
        let business = gateway
            .create(
                RESOURCE_BUSINESS,
                json!({ "email": "shop@example.com", "password_hash": "hash", "name": "Shop" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = business["id"].as_i64().unwrap();
        (gateway, id)
    }

    fn input(business_id: i64, name: &str) -> CreateAttribute {
        CreateAttribute {
            business_id,
            name: name.to_string(),
            value: Some("blue".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_attribute_for_existing_business() {
        let (gateway, business_id) = gateway_with_business().await;
        let attributes = AttributeManager::new(gateway);

        let attribute = attributes
            .create_attribute(input(business_id, "color"))
            .await
            .unwrap();

        assert_eq!(attribute.business_id, business_id);
        assert_eq!(attribute.value.as_deref(), Some("blue"));
    }

    #[tokio::test]
    async fn test_create_attribute_requires_business() {
        let attributes = AttributeManager::new(Gateway::in_memory());

        let result = attributes.create_attribute(input(99, "color")).await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_create_attributes_is_atomic() {
        let (gateway, business_id) = gateway_with_business().await;
        let attributes = AttributeManager::new(gateway);

        let result = attributes
            .create_attributes(vec![input(business_id, "color"), input(business_id, "")])
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(attributes.list_attributes(business_id).await.unwrap().is_empty());

        let count = attributes
            .create_attributes(vec![input(business_id, "color"), input(business_id, "size")])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(attributes.list_attributes(business_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_attribute() {
        let (gateway, business_id) = gateway_with_business().await;
        let attributes = AttributeManager::new(gateway);
        let attribute = attributes
            .create_attribute(input(business_id, "color"))
            .await
            .unwrap();

        let updated = attributes
            .update_attribute(
                attribute.id,
                UpdateAttribute {
                    value: Some("red".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.value.as_deref(), Some("red"));
        assert_eq!(updated.name, "color");

        attributes.delete_attribute(attribute.id).await.unwrap();
        assert!(matches!(
            attributes.delete_attribute(attribute.id).await,
            Err(AppError::NotFound)
        ));
    }
}
