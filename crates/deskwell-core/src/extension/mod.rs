//! The extension system: archive loading, ordering, and the registry.

mod loader;
pub mod order;
pub mod registry;

pub use order::LOAD_ORDER_FILE;
pub use registry::{ARCHIVE_EXTENSION, ExtensionInfo, ExtensionRegistry, LoadFailure};
