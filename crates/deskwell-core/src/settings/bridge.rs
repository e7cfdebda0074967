//! Reconciliation between the settings store and the extension registry.
//!
//! The direction of authority depends on the operation, and deliberately so:
//! on [`pull`](ConfigBridge::pull) the persisted store wins and its enabled
//! flags are pushed into the registry; on [`push`](ConfigBridge::push) the
//! registry's current state wins and is written back to the store. In between
//! those boundaries the registry is the single source of truth.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use deskwell_extension_sdk::ConfigProperty;

use crate::error::SettingsError;
use crate::extension::ExtensionRegistry;
use crate::settings::store::SettingsStore;

/// Store key prefix for per-extension enabled flags; the suffix is the
/// extension's implementation id.
pub const ENABLED_KEY_PREFIX: &str = "extension.enabled.";

/// Bridges the persisted settings store and the extension registry into one
/// editable configuration set.
#[derive(Debug)]
pub struct ConfigBridge {
    store: SettingsStore,
    host_properties: Vec<ConfigProperty>,
    properties: Vec<ConfigProperty>,
}

impl ConfigBridge {
    /// Create a bridge over a settings store.
    pub fn new(store: SettingsStore) -> Self {
        Self {
            store,
            host_properties: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Set the host-defined configuration entries. These always precede
    /// extension-contributed entries in the merged set.
    pub fn with_host_properties(mut self, properties: Vec<ConfigProperty>) -> Self {
        self.host_properties = properties;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// The merged editable configuration set.
    pub fn properties(&self) -> &[ConfigProperty] {
        &self.properties
    }

    /// Update the value of one merged property. Returns whether the key was
    /// found.
    pub fn set_value(&mut self, key: &str, value: Value) -> bool {
        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(prop) => {
                prop.value = value;
                true
            }
            None => false,
        }
    }

    /// Load the store and reconcile it into the registry. The store is
    /// authoritative here: each extension's persisted enabled flag (default
    /// true) is pushed into the registry without firing lifecycle hooks, the
    /// merged set is rebuilt, and stored values overlay the merged
    /// properties.
    pub fn pull(&mut self, registry: &mut ExtensionRegistry) -> Result<(), SettingsError> {
        self.store.load()?;

        for info in registry.extensions() {
            let key = format!("{ENABLED_KEY_PREFIX}{}", info.impl_id);
            let enabled = self.store.get_bool(&key, true);
            registry.set_enabled(&info.impl_id, enabled, false);
        }

        self.reinitialize(registry);
        for prop in &mut self.properties {
            if let Some(stored) = self.store.get(&prop.key) {
                prop.value = stored.clone();
            }
        }
        debug!(properties = self.properties.len(), "configuration pulled from store");
        Ok(())
    }

    /// Reconcile the registry into the store and persist. The registry is
    /// authoritative here: its enabled flags and the merged property values
    /// are written back before saving.
    pub fn push(&mut self, registry: &ExtensionRegistry) -> Result<(), SettingsError> {
        for info in registry.extensions() {
            let key = format!("{ENABLED_KEY_PREFIX}{}", info.impl_id);
            self.store.set_bool(key, info.enabled);
        }
        for prop in &self.properties {
            self.store.set(prop.key.clone(), prop.value.clone());
        }
        self.store.save()
    }

    /// Rebuild the merged configuration set from scratch.
    ///
    /// Host-defined entries come first, then every registered extension's
    /// entries in descriptor-name order, deduplicated by key keeping the
    /// first occurrence. A disabled extension's entries stay in the set but
    /// become non-interactive, so their persisted values survive the
    /// disabled period.
    ///
    /// Required whenever the set of loaded or enabled extensions changes:
    /// host-defined selectable options may need to incorporate
    /// extension-contributed choices.
    pub fn reinitialize(&mut self, registry: &ExtensionRegistry) {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for prop in &self.host_properties {
            if seen.insert(prop.key.clone()) {
                merged.push(prop.clone());
            }
        }
        for info in registry.extensions() {
            for mut prop in registry.config_properties_of(&info.impl_id) {
                if seen.insert(prop.key.clone()) {
                    prop.interactive = info.enabled;
                    merged.push(prop);
                } else {
                    debug!(key = %prop.key, impl_id = %info.impl_id, "duplicate property key, keeping first");
                }
            }
        }
        self.properties = merged;
    }
}
