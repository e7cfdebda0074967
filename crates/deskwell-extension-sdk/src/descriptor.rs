//! Extension descriptor definition.
//!
//! The descriptor is the metadata record every extension archive embeds as a
//! JSON blob. The host reads it before any code from the archive runs, so it
//! carries everything needed for compatibility screening: the extension's own
//! name and version plus the host name and host version it was built against.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

/// File name of the descriptor blob inside an extension archive.
///
/// The loader accepts any archive entry whose name *ends* with this, so the
/// descriptor does not have to sit at the archive root.
pub const DESCRIPTOR_FILE_NAME: &str = "extension.json";

/// Metadata record describing one extension.
///
/// Built through the `with_*` setters and treated as immutable afterwards.
/// `name`, `version`, `target_host_name` and `target_host_version` are
/// mandatory; everything else is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionDescriptor {
    /// Display name, also the registry sort key.
    pub name: String,

    /// Extension version string.
    pub version: String,

    /// Name of the host application this extension targets.
    pub target_host_name: String,

    /// Host version this extension was built against.
    pub target_host_version: String,

    /// Author name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Author homepage URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,

    /// Extension homepage URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_url: Option<String>,

    /// One-line description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    /// Long-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,

    /// Release notes for this version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,

    /// Free-form single-line fields, serialized in deterministic key order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
}

impl ExtensionDescriptor {
    /// Create a descriptor with the four mandatory fields.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        target_host_name: impl Into<String>,
        target_host_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            target_host_name: target_host_name.into(),
            target_host_version: target_host_version.into(),
            ..Self::default()
        }
    }

    /// Set the author name.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the author homepage URL.
    pub fn with_author_url(mut self, url: impl Into<String>) -> Self {
        self.author_url = Some(url.into());
        self
    }

    /// Set the extension homepage URL.
    pub fn with_extension_url(mut self, url: impl Into<String>) -> Self {
        self.extension_url = Some(url.into());
        self
    }

    /// Set the one-line description.
    pub fn with_short_description(mut self, text: impl Into<String>) -> Self {
        self.short_description = Some(text.into());
        self
    }

    /// Set the long-form description.
    pub fn with_long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    /// Set the release notes.
    pub fn with_release_notes(mut self, text: impl Into<String>) -> Self {
        self.release_notes = Some(text.into());
        self
    }

    /// Add a custom field. Values must be single-line; a value containing a
    /// line break is dropped with a warning rather than corrupting the blob.
    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if value.contains('\n') || value.contains('\r') {
            tracing::warn!(key, "dropping custom field with multi-line value");
            return self;
        }
        self.custom_fields.insert(key, value);
        self
    }

    /// Whether all mandatory fields are present and non-blank.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.version.trim().is_empty()
            && !self.target_host_name.trim().is_empty()
            && !self.target_host_version.trim().is_empty()
    }

    /// Parse a descriptor from its JSON blob.
    ///
    /// Returns `None` on malformed input, never an error. Unknown fields are
    /// ignored, missing optional fields parse as absent.
    pub fn parse(blob: &str) -> Option<Self> {
        serde_json::from_str(blob).ok()
    }

    /// Read a stream fully and parse it. Returns `None` on any I/O failure.
    pub fn parse_from_reader(mut reader: impl Read) -> Option<Self> {
        let mut blob = String::new();
        reader.read_to_string(&mut blob).ok()?;
        Self::parse(&blob)
    }

    /// Serialize to the pretty-printed JSON blob format.
    ///
    /// Output is deterministic: optional fields are omitted when absent and
    /// custom fields appear in sorted key order.
    pub fn serialize(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Parse the leading integer component of a dotted version string.
    ///
    /// `"3.2.1"` yields `Some(3)`; unparseable input yields `None`. This is
    /// the basis of the major-version compatibility policy.
    pub fn extract_major_version(version: &str) -> Option<u64> {
        version.trim().split('.').next()?.parse().ok()
    }
}
