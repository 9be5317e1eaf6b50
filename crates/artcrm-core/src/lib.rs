//! Shared domain types and configuration for the artcrm workspace.
//!
//! Holds the lead categories, the language-model backend selector, the
//! contact records exchanged with the store, and the [`ContactStore`]
//! capability the scout pipeline writes through.

pub mod app_config;
pub mod category;
pub mod config;
pub mod contacts;
pub mod model_backend;
pub mod store;

pub use app_config::AppConfig;
pub use category::Category;
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use contacts::{
    Contact, ContactPatch, ContactQuery, CreateOutcome, NewContact, LEAD_UNVERIFIED_STATUS,
};
pub use model_backend::{ModelBackend, UnknownModelBackend};
pub use store::{ContactStore, StoreError};
