//! Service layer - account use cases on top of the gateway.

mod attribute_service;
mod business_service;
mod user_service;

pub use attribute_service::{AttributeManager, AttributeService};
pub use business_service::{BusinessManager, BusinessService};
pub use user_service::{UserManager, UserService};

use crate::repository::Gateway;

/// Every account service wired to one gateway.
#[derive(Clone)]
pub struct Services {
    pub users: UserManager,
    pub businesses: BusinessManager,
    pub attributes: AttributeManager,
}

impl Services {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            users: UserManager::new(gateway.clone()),
            businesses: BusinessManager::new(gateway.clone()),
            attributes: AttributeManager::new(gateway),
        }
    }
}
