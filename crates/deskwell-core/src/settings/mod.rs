//! Persisted configuration: the settings store and the registry bridge.

pub mod bridge;
pub mod store;

pub use bridge::{ConfigBridge, ENABLED_KEY_PREFIX};
pub use store::SettingsStore;
