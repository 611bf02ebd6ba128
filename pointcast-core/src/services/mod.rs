// File: pointcast-core/src/services/mod.rs

pub mod auth_service;
pub mod listener_manager;
pub mod redemption_service;
pub mod token_service;
pub mod trigger_service;
pub mod usage_service;

pub use auth_service::AuthService;
pub use listener_manager::ListenerManager;
pub use redemption_service::RedemptionService;
pub use token_service::TokenService;
pub use trigger_service::{NewTrigger, TriggerService};
pub use usage_service::UsageService;
