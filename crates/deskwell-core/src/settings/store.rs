//! Persisted key-value settings store.
//!
//! A single pretty-printed JSON file mapping string keys to values, loaded
//! and saved whole. This is the store the [`ConfigBridge`](super::ConfigBridge)
//! reconciles against the extension registry.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::SettingsError;

/// File-backed key-value store.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl SettingsStore {
    /// Create a store bound to a file path. Nothing is read until
    /// [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: BTreeMap::new(),
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory values with the file contents. A missing file is
    /// a first run, not an error: the store comes up empty.
    pub fn load(&mut self) -> Result<(), SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                self.values = serde_json::from_str(&text).map_err(|source| {
                    SettingsError::Malformed {
                        path: self.path.clone(),
                        source,
                    }
                })?;
                debug!(path = %self.path.display(), keys = self.values.len(), "settings loaded");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file yet, starting empty");
                self.values.clear();
                Ok(())
            }
            Err(source) => Err(SettingsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write the in-memory values back to the file, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            SettingsError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text).map_err(io_err)
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a boolean, falling back to `default` for missing or non-boolean
    /// values.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Get a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Set a raw value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Set a boolean value.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, Value::Bool(value));
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Read one raw value straight from a store file, bypassing the load
    /// lifecycle.
    ///
    /// This exists to break a circularity: an extension's own configuration
    /// construction may need a value before the bridge has finished
    /// initializing. Returns `None` on any I/O or parse problem.
    pub fn peek(path: &Path, key: &str) -> Option<String> {
        let text = fs::read_to_string(path).ok()?;
        let values: BTreeMap<String, Value> = serde_json::from_str(&text).ok()?;
        match values.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
