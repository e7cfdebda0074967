//! Archive loading with scoped resource guards.
//!
//! Every archive is opened through an [`ArchiveScope`], an RAII guard owning
//! the zip reader and a scratch directory. The scope lives only for the
//! duration of one load step; dropping it releases the archive file handle on
//! every exit path, so the archive can be deleted or overwritten immediately
//! after loading finishes. The dynamic library is extracted into the scratch
//! directory first, so the retained `Library` handle pins the scratch copy,
//! never the archive.

use std::fs::File;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tempfile::TempDir;
use zip::ZipArchive;

use deskwell_extension_sdk::{
    ABI_VERSION, ABI_VERSION_SYMBOL, AbiVersionFn, BoxedExtension, CREATE_SYMBOL, CreateFn,
    DESCRIPTOR_FILE_NAME, ExtensionDescriptor, ResourceSource,
};

use crate::error::LoadError;

/// Scoped access to one open extension archive.
pub(crate) struct ArchiveScope {
    archive: ZipArchive<File>,
}

impl ArchiveScope {
    /// Open an archive for one load step.
    pub(crate) fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        Ok(Self { archive })
    }

    /// Find and parse the embedded descriptor blob.
    ///
    /// Any entry whose name ends with the sentinel file name qualifies; it
    /// does not have to sit at the archive root.
    pub(crate) fn read_descriptor(&mut self) -> Option<ExtensionDescriptor> {
        let name = self
            .archive
            .file_names()
            .find(|n| n.ends_with(DESCRIPTOR_FILE_NAME))
            .map(str::to_string)?;
        let entry = self.archive.by_name(&name).ok()?;
        ExtensionDescriptor::parse_from_reader(entry)
    }

    /// Extract the platform dynamic library into the scratch directory.
    fn extract_library(&mut self, scratch: &Path) -> Result<PathBuf, LoadError> {
        let suffix = format!(".{}", library_extension());
        let name = self
            .archive
            .file_names()
            .find(|n| n.ends_with(&suffix))
            .map(str::to_string)
            .ok_or(LoadError::MissingLibrary)?;

        let file_name = Path::new(&name)
            .file_name()
            .ok_or(LoadError::MissingLibrary)?;
        let target = scratch.join(file_name);

        let mut entry = self.archive.by_name(&name)?;
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        Ok(target)
    }
}

impl ResourceSource for ArchiveScope {
    fn read_resource(&mut self, name: &str) -> io::Result<Vec<u8>> {
        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// The parts of a successfully instantiated extension.
///
/// Field order is load-bearing: the unit must drop before the library that
/// holds its code, and the library before the scratch directory it was
/// extracted into.
pub(crate) struct LoadedParts {
    pub(crate) unit: BoxedExtension,
    pub(crate) library: Library,
    pub(crate) scratch: TempDir,
}

/// Parse the descriptor out of an archive without loading any code.
pub(crate) fn peek_descriptor(path: &Path) -> Option<ExtensionDescriptor> {
    ArchiveScope::open(path).ok()?.read_descriptor()
}

/// Extract the archive's dynamic library, resolve the export symbols, and
/// invoke the zero-argument constructor.
pub(crate) fn instantiate(scope: &mut ArchiveScope) -> Result<LoadedParts, LoadError> {
    let scratch = tempfile::Builder::new().prefix("deskwell-ext-").tempdir()?;
    let library_path = scope.extract_library(scratch.path())?;

    // SAFETY: loading an extension library runs its initializers; that is the
    // contract of hosting native extensions.
    let library = unsafe { Library::new(&library_path)? };

    let unit = {
        let abi: Symbol<AbiVersionFn> = unsafe { library.get(ABI_VERSION_SYMBOL)? };
        let found = unsafe { abi() };
        if found != ABI_VERSION {
            return Err(LoadError::AbiMismatch { found });
        }

        let create: Symbol<CreateFn> = unsafe { library.get(CREATE_SYMBOL)? };
        let raw = panic::catch_unwind(AssertUnwindSafe(|| unsafe { create() }))
            .map_err(|payload| LoadError::CreateFailed(panic_message(payload.as_ref())))?;
        if raw.is_null() {
            return Err(LoadError::CreateFailed(
                "constructor returned null".to_string(),
            ));
        }
        // SAFETY: the create export hands over ownership of a
        // `Box<BoxedExtension>` produced by `Box::into_raw`.
        unsafe { *Box::from_raw(raw) }
    };

    Ok(LoadedParts {
        unit,
        library,
        scratch,
    })
}

/// Dynamic library file extension for the current platform.
pub(crate) fn library_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        format!("constructor panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("constructor panicked: {s}")
    } else {
        "constructor panicked".to_string()
    }
}
