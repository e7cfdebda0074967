//! Error types for the extension core.

use std::path::PathBuf;

use thiserror::Error;

/// A fault while loading one extension archive.
///
/// These never escape the registry's public surface; `ExtensionRegistry`
/// downgrades them to recorded [`LoadFailure`](crate::LoadFailure) entries so
/// one bad archive cannot poison the rest of a scan.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("no descriptor entry in archive (expected a file ending in \"extension.json\")")]
    MissingDescriptor,

    #[error("descriptor for {0:?} is missing required fields")]
    InvalidDescriptor(String),

    #[error("archive contains no native library for this platform")]
    MissingLibrary,

    #[error("library error: {0}")]
    Library(#[from] libloading::Error),

    #[error("extension ABI version {found} is incompatible with this host")]
    AbiMismatch { found: u32 },

    #[error("extension constructor failed: {0}")]
    CreateFailed(String),
}

/// A fault in the persisted settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
