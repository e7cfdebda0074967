//! Deskwell extension system core.
//!
//! The host side of the Deskwell extension mechanism:
//!
//! - [`ExtensionRegistry`] scans a directory for extension archives, screens
//!   them against host name/version compatibility, orders them, loads each
//!   through an isolated, scope-released archive guard, and tracks the loaded
//!   extensions' enabled state.
//! - [`SettingsStore`] is the persisted key-value configuration file.
//! - [`ConfigBridge`] reconciles the store and the registry in both
//!   directions (store wins on pull, registry wins on push) and aggregates
//!   host and extension configuration entries into one editable set.
//!
//! All operations are synchronous and expect a single control thread; see the
//! registry docs for the threading contract. Per-archive problems never
//! escape as errors; they are recorded as [`LoadFailure`] entries for the
//! host UI to display.

pub mod error;
pub mod extension;
pub mod settings;

pub use error::{LoadError, SettingsError};
pub use extension::{
    ARCHIVE_EXTENSION, ExtensionInfo, ExtensionRegistry, LOAD_ORDER_FILE, LoadFailure,
};
pub use settings::{ConfigBridge, ENABLED_KEY_PREFIX, SettingsStore};

pub use deskwell_extension_sdk as sdk;
