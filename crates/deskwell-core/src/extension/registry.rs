//! Extension registry: discovery, loading, and lifecycle management.
//!
//! The registry scans a directory for extension archives, screens their
//! descriptors against the host's name and version, orders the survivors,
//! loads each through a scoped archive guard, and afterwards tracks every
//! loaded extension together with its enabled flag and source archive.
//!
//! All registry operations run on a single control thread; there is no
//! internal locking. Callers who share a registry across threads must
//! synchronize externally.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use libloading::Library;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use deskwell_extension_sdk::{
    BoxedExtension, ConfigProperty, ExtensionDescriptor, ExtensionUnit, ResourceSource,
};

use crate::error::LoadError;
use crate::extension::loader::{self, ArchiveScope};
use crate::extension::order;

/// File extension of extension archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// A load attempt the registry rejected, kept for the host UI to display.
///
/// `archive` is `None` for programmatically added extensions. The list is
/// append-only within a load pass and cleared only by [`ExtensionRegistry::clear`].
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Archive the failure originated from, if any.
    pub archive: Option<PathBuf>,
    /// Human-readable reason.
    pub message: String,
}

/// Snapshot of one registered extension.
#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    /// Fully-qualified implementation id, the registry key.
    pub impl_id: String,
    /// The extension's metadata record.
    pub descriptor: ExtensionDescriptor,
    /// Current enabled flag.
    pub enabled: bool,
    /// Source archive; `None` for programmatic registrations.
    pub archive: Option<PathBuf>,
    /// When the extension was loaded.
    pub loaded_at: DateTime<Utc>,
}

/// One loaded extension and everything keeping it alive.
///
/// Field order is load-bearing: the unit drops before the library holding its
/// code, and the library before the scratch directory it was extracted into.
struct RegistryEntry {
    enabled: bool,
    archive: Option<PathBuf>,
    properties: Vec<ConfigProperty>,
    loaded_at: DateTime<Utc>,
    unit: BoxedExtension,
    _library: Option<Library>,
    _scratch: Option<TempDir>,
}

/// Registry of loaded extensions, keyed by implementation id.
pub struct ExtensionRegistry {
    entries: HashMap<String, RegistryEntry>,
    failures: Vec<LoadFailure>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            failures: Vec::new(),
        }
    }

    /// Scan a directory tree for extension archives and load every
    /// compatible one. Returns the number of extensions loaded in this pass.
    ///
    /// `host_name` and `host_version`, when supplied, gate candidates through
    /// the compatibility policy: the descriptor's target host name must match
    /// exactly, and when both version strings carry a parseable leading major
    /// component those majors must be equal. Every rejection is recorded as a
    /// [`LoadFailure`]; archives without a parseable descriptor are silently
    /// excluded from candidacy.
    pub fn load_extensions(
        &mut self,
        dir: &Path,
        host_name: Option<&str>,
        host_version: Option<&str>,
    ) -> usize {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "extension directory does not exist, nothing to load");
            return 0;
        }

        let mut candidates = Vec::new();
        for archive in collect_archives(dir) {
            let Some(descriptor) = loader::peek_descriptor(&archive) else {
                debug!(archive = %archive.display(), "no parseable descriptor, not a candidate");
                continue;
            };
            if !descriptor.is_valid() {
                self.reject(&archive, "descriptor is missing required fields".to_string());
                continue;
            }
            match check_compatibility(&descriptor, host_name, host_version) {
                Ok(()) => candidates.push(archive),
                Err(reason) => self.reject(&archive, reason),
            }
        }

        let mut loaded = 0;
        for archive in order::order_archives(dir, candidates) {
            if self.load_extension_from_archive(&archive) {
                loaded += 1;
            }
        }
        info!(loaded, dir = %dir.display(), "extension scan complete");
        loaded
    }

    /// Load a single extension archive.
    ///
    /// The archive handle is released before this returns, success or
    /// failure; the archive file can be deleted or overwritten immediately
    /// afterwards. Failures are recorded, never propagated. Returns whether
    /// an extension was actually added (a duplicate implementation id is
    /// skipped silently and returns `false` without a failure record).
    pub fn load_extension_from_archive(&mut self, archive: &Path) -> bool {
        match self.try_load_archive(archive) {
            Ok(Some(impl_id)) => {
                info!(impl_id, archive = %archive.display(), "extension loaded");
                true
            }
            Ok(None) => false,
            Err(err) => {
                self.reject(archive, err.to_string());
                false
            }
        }
    }

    fn try_load_archive(&mut self, archive: &Path) -> Result<Option<String>, LoadError> {
        // The scope owns the archive handle and the loading scratch space; it
        // must not outlive this function.
        let mut scope = ArchiveScope::open(archive)?;

        let descriptor = scope.read_descriptor().ok_or(LoadError::MissingDescriptor)?;
        if !descriptor.is_valid() {
            return Err(LoadError::InvalidDescriptor(descriptor.name));
        }

        let parts = loader::instantiate(&mut scope)?;
        self.admit(
            archive,
            parts.unit,
            Some(parts.library),
            Some(parts.scratch),
            &mut scope,
        )
    }

    /// Admit one instantiated unit into the registry under its source archive.
    ///
    /// Runs the duplicate check, the descriptor re-validation, and the two
    /// load-time hooks while `resources` is still readable. Returns `Ok(None)`
    /// for a silently skipped duplicate.
    fn admit(
        &mut self,
        archive: &Path,
        mut unit: BoxedExtension,
        library: Option<Library>,
        scratch: Option<TempDir>,
        resources: &mut dyn ResourceSource,
    ) -> Result<Option<String>, LoadError> {
        let impl_id = unit.impl_id().to_string();
        if self.entries.contains_key(&impl_id) {
            debug!(impl_id, archive = %archive.display(), "already loaded, skipping duplicate");
            return Ok(None);
        }
        // The instance's own descriptor is authoritative from here on.
        if !unit.descriptor().is_valid() {
            return Err(LoadError::InvalidDescriptor(impl_id));
        }

        // Both hooks run while the archive is still open; the properties
        // factory first, then the resource hook. Nothing can read the archive
        // once the loading step returns.
        let properties = unit.create_config_properties();
        unit.finish_loading(resources);

        self.entries.insert(
            impl_id.clone(),
            RegistryEntry {
                enabled: true,
                archive: Some(archive.to_path_buf()),
                properties,
                loaded_at: Utc::now(),
                unit,
                _library: library,
                _scratch: scratch,
            },
        );
        Ok(Some(impl_id))
    }

    /// Register an extension instance built by host code.
    ///
    /// Programmatic extensions have no source archive, bypass the load-order
    /// mechanism, and start with the caller's enabled flag. Returns whether
    /// the extension was registered.
    pub fn add_extension(&mut self, mut unit: BoxedExtension, enabled: bool) -> bool {
        let impl_id = unit.impl_id().to_string();
        if !unit.descriptor().is_valid() {
            warn!(impl_id, "rejecting extension with incomplete descriptor");
            self.failures.push(LoadFailure {
                archive: None,
                message: format!("{impl_id}: descriptor is missing required fields"),
            });
            return false;
        }
        if self.entries.contains_key(&impl_id) {
            debug!(impl_id, "already registered, skipping duplicate");
            return false;
        }

        let properties = unit.create_config_properties();
        self.entries.insert(
            impl_id.clone(),
            RegistryEntry {
                enabled,
                archive: None,
                properties,
                loaded_at: Utc::now(),
                unit,
                _library: None,
                _scratch: None,
            },
        );
        info!(impl_id, enabled, "extension registered programmatically");
        true
    }

    /// Toggle an extension's enabled flag.
    ///
    /// Idempotent: returns whether a transition actually occurred. Lifecycle
    /// hooks fire only on an actual transition, and only when `notify` is
    /// set.
    pub fn set_enabled(&mut self, impl_id: &str, enabled: bool, notify: bool) -> bool {
        let Some(entry) = self.entries.get_mut(impl_id) else {
            warn!(impl_id, "cannot change enabled state of unknown extension");
            return false;
        };
        if entry.enabled == enabled {
            return false;
        }
        entry.enabled = enabled;
        if notify {
            if enabled {
                entry.unit.on_activate();
            } else {
                entry.unit.on_deactivate();
            }
        }
        info!(impl_id, enabled, "extension state changed");
        true
    }

    /// Remove an extension permanently, deactivating it first if enabled.
    ///
    /// Idempotent: unloading an unknown id returns `false`.
    pub fn unload(&mut self, impl_id: &str) -> bool {
        let Some(mut entry) = self.entries.remove(impl_id) else {
            return false;
        };
        if entry.enabled {
            entry.unit.on_deactivate();
        }
        info!(impl_id, "extension unloaded");
        true
    }

    /// Deactivate everything and reset the registry, including the recorded
    /// load failures.
    pub fn clear(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.enabled {
                entry.enabled = false;
                entry.unit.on_deactivate();
            }
        }
        self.entries.clear();
        self.failures.clear();
    }

    /// Number of loaded extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no extensions are loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an implementation id is registered.
    pub fn contains(&self, impl_id: &str) -> bool {
        self.entries.contains_key(impl_id)
    }

    /// Look up an extension by implementation id.
    pub fn get(&self, impl_id: &str) -> Option<&dyn ExtensionUnit> {
        self.entries.get(impl_id).map(|e| e.unit.as_ref())
    }

    /// Mutable lookup by implementation id.
    pub fn get_mut(&mut self, impl_id: &str) -> Option<&mut dyn ExtensionUnit> {
        self.entries.get_mut(impl_id).map(|e| &mut *e.unit as &mut dyn ExtensionUnit)
    }

    /// Snapshot of one extension's registry state.
    pub fn get_info(&self, impl_id: &str) -> Option<ExtensionInfo> {
        self.entries
            .get(impl_id)
            .map(|entry| self.info_for(impl_id, entry))
    }

    /// Look up an extension by descriptor name.
    pub fn find_by_name(&self, name: &str) -> Option<ExtensionInfo> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.unit.descriptor().name == name)
            .map(|(impl_id, entry)| self.info_for(impl_id, entry))
    }

    /// All registered extensions, sorted by descriptor name.
    pub fn extensions(&self) -> Vec<ExtensionInfo> {
        let mut infos: Vec<ExtensionInfo> = self
            .entries
            .iter()
            .map(|(impl_id, entry)| self.info_for(impl_id, entry))
            .collect();
        infos.sort_by(|a, b| {
            (a.descriptor.name.as_str(), a.impl_id.as_str())
                .cmp(&(b.descriptor.name.as_str(), b.impl_id.as_str()))
        });
        infos
    }

    /// The enabled subset of [`extensions`](Self::extensions), same order.
    pub fn enabled_extensions(&self) -> Vec<ExtensionInfo> {
        self.extensions().into_iter().filter(|i| i.enabled).collect()
    }

    /// Whether an extension is currently enabled. Unknown ids are `false`.
    pub fn is_enabled(&self, impl_id: &str) -> bool {
        self.entries.get(impl_id).is_some_and(|e| e.enabled)
    }

    /// Source archive of an extension; `None` for programmatic
    /// registrations and unknown ids.
    pub fn source_archive(&self, impl_id: &str) -> Option<&Path> {
        self.entries.get(impl_id)?.archive.as_deref()
    }

    /// The load failures recorded so far.
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// Copy of the configuration-property list cached for one extension.
    pub fn config_properties_of(&self, impl_id: &str) -> Vec<ConfigProperty> {
        self.entries
            .get(impl_id)
            .map(|e| e.properties.clone())
            .unwrap_or_default()
    }

    /// Merged configuration properties of all enabled extensions.
    ///
    /// Walks entries in descriptor-name order and deduplicates by property
    /// key, keeping the first occurrence: a later extension declaring a key
    /// an earlier one already claimed is dropped from the merged view.
    pub fn all_enabled_config_properties(&self) -> Vec<ConfigProperty> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for info in self.extensions() {
            if !info.enabled {
                continue;
            }
            let entry = &self.entries[&info.impl_id];
            for prop in &entry.properties {
                if seen.insert(prop.key.clone()) {
                    merged.push(prop.clone());
                } else {
                    debug!(key = %prop.key, impl_id = %info.impl_id, "duplicate property key, keeping first");
                }
            }
        }
        merged
    }

    fn info_for(&self, impl_id: &str, entry: &RegistryEntry) -> ExtensionInfo {
        ExtensionInfo {
            impl_id: impl_id.to_string(),
            descriptor: entry.unit.descriptor().clone(),
            enabled: entry.enabled,
            archive: entry.archive.clone(),
            loaded_at: entry.loaded_at,
        }
    }

    fn reject(&mut self, archive: &Path, message: String) {
        warn!(archive = %archive.display(), reason = %message, "extension rejected");
        self.failures.push(LoadFailure {
            archive: Some(archive.to_path_buf()),
            message,
        });
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate every archive file under `dir`, recursively.
fn collect_archives(dir: &Path) -> Vec<PathBuf> {
    let mut archives = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %current.display(), error = %e, "cannot read directory, skipping");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION) {
                archives.push(path);
            }
        }
    }
    archives
}

/// Apply the host compatibility policy to one descriptor.
///
/// An unparseable host major version disables the version check entirely; a
/// parseable host major with an unparseable target major rejects the
/// extension as malformed.
fn check_compatibility(
    descriptor: &ExtensionDescriptor,
    host_name: Option<&str>,
    host_version: Option<&str>,
) -> Result<(), String> {
    if let Some(host) = host_name {
        if descriptor.target_host_name != host {
            return Err(format!(
                "targets host {:?}, not {host:?}",
                descriptor.target_host_name
            ));
        }
    }
    if let Some(version) = host_version {
        if let Some(host_major) = ExtensionDescriptor::extract_major_version(version) {
            match ExtensionDescriptor::extract_major_version(&descriptor.target_host_version) {
                None => {
                    return Err(format!(
                        "unparseable target host version {:?}",
                        descriptor.target_host_version
                    ));
                }
                Some(target_major) if target_major != host_major => {
                    return Err(format!(
                        "targets host major version {target_major}, host is {host_major}"
                    ));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}
