//! Deskwell Extension SDK
//!
//! Everything an extension author compiles against: the
//! [`ExtensionDescriptor`] metadata record, the [`ExtensionUnit`] contract,
//! [`ConfigProperty`] settings entries, and the `declare_extension!` macro
//! that generates the FFI exports the host loader resolves.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use deskwell_extension_sdk::prelude::*;
//!
//! struct WeatherPanel {
//!     descriptor: ExtensionDescriptor,
//! }
//!
//! impl Default for WeatherPanel {
//!     fn default() -> Self {
//!         Self {
//!             descriptor: ExtensionDescriptor::new("Weather Panel", "1.0", "Deskwell", "3.2"),
//!         }
//!     }
//! }
//!
//! impl ExtensionUnit for WeatherPanel {
//!     fn descriptor(&self) -> &ExtensionDescriptor {
//!         &self.descriptor
//!     }
//!
//!     fn impl_id(&self) -> &str {
//!         deskwell_extension_sdk::impl_id!(WeatherPanel)
//!     }
//!
//!     fn create_config_properties(&mut self) -> Vec<ConfigProperty> {
//!         vec![ConfigProperty::new("weather.units", "Units").with_value("metric")]
//!     }
//! }
//!
//! deskwell_extension_sdk::declare_extension!(WeatherPanel);
//! ```

pub mod descriptor;
#[macro_use]
pub mod macros;
pub mod types;

pub use descriptor::{DESCRIPTOR_FILE_NAME, ExtensionDescriptor};
pub use types::{
    ABI_VERSION, ABI_VERSION_SYMBOL, AbiVersionFn, BoxedExtension, CREATE_SYMBOL, ConfigProperty,
    CreateFn, ExtensionUnit, ResourceSource,
};

/// Prelude with the imports every extension needs.
pub mod prelude {
    pub use crate::descriptor::{DESCRIPTOR_FILE_NAME, ExtensionDescriptor};
    pub use crate::types::{
        ABI_VERSION, BoxedExtension, ConfigProperty, ExtensionUnit, ResourceSource,
    };
    pub use serde_json::Value;
}
