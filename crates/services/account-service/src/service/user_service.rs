//! User service - registration and lookup of user accounts.

use async_trait::async_trait;
use validator::Validate;

use common::AppResult;
use domain::{decode_record, CreateUser, Password, User, RESOURCE_USER};

use crate::repository::{Filter, Gateway, UniqueKey};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Validate the DTO, hash the password and store the user
    async fn register_user(&self, input: CreateUser) -> AppResult<User>;

    /// Get user by ID
    async fn get_user(&self, id: i64) -> AppResult<User>;

    /// List all users
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Delete user by ID, returning the removed user
    async fn delete_user(&self, id: i64) -> AppResult<User>;
}

/// Concrete implementation of UserService using the gateway.
#[derive(Clone)]
pub struct UserManager {
    gateway: Gateway,
}

impl UserManager {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn register_user(&self, input: CreateUser) -> AppResult<User> {
        input.validate()?;
        let password = Password::new(&input.password)?;

        let record = self
            .gateway
            .create(RESOURCE_USER, input.into_record(password))
            .await?;
        let user: User = decode_record(RESOURCE_USER, record)?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> AppResult<User> {
        let record = self
            .gateway
            .find_unique_or_fail(RESOURCE_USER, &UniqueKey::id(id))
            .await?;
        Ok(decode_record(RESOURCE_USER, record)?)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.gateway
            .find_many(RESOURCE_USER, &Filter::all())
            .await?
            .into_iter()
            .map(|record| decode_record(RESOURCE_USER, record).map_err(Into::into))
            .collect()
    }

    async fn delete_user(&self, id: i64) -> AppResult<User> {
        let record = self
            .gateway
            .delete(RESOURCE_USER, &UniqueKey::id(id))
            .await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(decode_record(RESOURCE_USER, record)?)
    }
}
