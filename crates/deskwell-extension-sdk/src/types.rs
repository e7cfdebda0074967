//! The extension contract and the FFI surface extensions export.
//!
//! An extension archive carries one dynamic library. That library must export
//! two symbols for the host loader:
//! - `deskwell_extension_abi_version() -> u32`, checked against [`ABI_VERSION`]
//! - `deskwell_extension_create() -> *mut BoxedExtension`, the zero-argument
//!   constructor
//!
//! The `declare_extension!` macro generates both.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::ExtensionDescriptor;

/// Extension ABI version. Incremented when the `ExtensionUnit` contract or
/// the export symbols change incompatibly.
pub const ABI_VERSION: u32 = 1;

/// Export symbol reporting the ABI version the extension was built against.
pub const ABI_VERSION_SYMBOL: &[u8] = b"deskwell_extension_abi_version";

/// Export symbol constructing the extension instance.
pub const CREATE_SYMBOL: &[u8] = b"deskwell_extension_create";

/// Boxed trait object handed across the FFI boundary by the create symbol.
pub type BoxedExtension = Box<dyn ExtensionUnit>;

/// Signature of the `deskwell_extension_abi_version` export.
pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

/// Signature of the `deskwell_extension_create` export.
///
/// Returns an owning raw pointer produced by
/// `Box::into_raw(Box::new(boxed_extension))`, or null on failure.
pub type CreateFn = unsafe extern "C" fn() -> *mut BoxedExtension;

/// One configuration entry an extension (or the host) contributes to the
/// application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProperty {
    /// Fully-qualified property name. Also the persistence key and the merge
    /// deduplication key.
    pub key: String,

    /// Human-readable label.
    #[serde(default)]
    pub label: String,

    /// Current value.
    #[serde(default)]
    pub value: Value,

    /// Selectable options, for choice-style properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    /// Whether the property is currently editable. Properties of a disabled
    /// extension stay persisted but become non-interactive.
    #[serde(default = "default_interactive")]
    pub interactive: bool,
}

fn default_interactive() -> bool {
    true
}

impl ConfigProperty {
    /// Create a property with a key and label.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value: Value::Null,
            choices: Vec::new(),
            interactive: true,
        }
    }

    /// Set the current value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the selectable options.
    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }
}

/// Read access to the resources of the archive an extension was loaded from.
///
/// Only available inside [`ExtensionUnit::finish_loading`]; the archive handle
/// is released as soon as that hook returns.
pub trait ResourceSource {
    /// Read a named archive entry fully into memory.
    fn read_resource(&mut self, name: &str) -> std::io::Result<Vec<u8>>;
}

/// The contract a Deskwell extension implements.
///
/// Instances are constructed exactly once, by the zero-argument create export
/// at load time or programmatically by host code. Enabling and disabling
/// toggles registry state and fires the lifecycle hooks; it never re-creates
/// the instance.
pub trait ExtensionUnit: Send {
    /// The extension's metadata record. Re-validated by the registry after
    /// instantiation; an invalid descriptor gets the instance discarded.
    fn descriptor(&self) -> &ExtensionDescriptor;

    /// Stable fully-qualified implementation type path, unique per extension.
    /// The registry key. The `impl_id!` macro derives it.
    fn impl_id(&self) -> &str;

    /// Called when the extension transitions to enabled.
    fn on_activate(&mut self) {}

    /// Called when the extension transitions to disabled or is unloaded.
    fn on_deactivate(&mut self) {}

    /// Configuration entries this extension contributes.
    ///
    /// Invoked exactly once, during loading, while the source archive is
    /// still open. The registry caches the result; callers only ever see
    /// copies of the cached list.
    fn create_config_properties(&mut self) -> Vec<ConfigProperty> {
        Vec::new()
    }

    /// Last chance to read resources out of the extension's own archive.
    ///
    /// Runs after `create_config_properties`, still inside the loading step.
    /// Nothing can read the archive after this returns.
    fn finish_loading(&mut self, _resources: &mut dyn ResourceSource) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_property_builder() {
        let prop = ConfigProperty::new("deskwell.theme", "Theme")
            .with_value("dark")
            .with_choices(vec!["light".into(), "dark".into()]);

        assert_eq!(prop.key, "deskwell.theme");
        assert_eq!(prop.value, Value::String("dark".into()));
        assert_eq!(prop.choices.len(), 2);
        assert!(prop.interactive);
    }

    #[test]
    fn test_config_property_round_trip() {
        let prop = ConfigProperty::new("a.b.c", "Label").with_value(7);
        let json = serde_json::to_string(&prop).expect("serialize");
        let back: ConfigProperty = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, prop);
    }

    #[test]
    fn test_interactive_defaults_true_on_parse() {
        let back: ConfigProperty =
            serde_json::from_str(r#"{"key": "k", "label": "L", "value": 1}"#).expect("parse");
        assert!(back.interactive);
    }
}
