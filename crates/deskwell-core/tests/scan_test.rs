//! Integration tests for the scan-and-load protocol.
//!
//! Archives are fabricated with the zip writer. None of them carry a native
//! library, so loading stops at the library-extraction step, which is enough
//! to exercise candidacy screening, the compatibility policy, load ordering,
//! failure recording, and the archive-handle release contract.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use deskwell_core::{ExtensionRegistry, LOAD_ORDER_FILE};
use deskwell_extension_sdk::ExtensionDescriptor;

fn init_logging() {
    // Initialize logging (use try_init to avoid panic if already set)
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .try_init();
}

fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create archive");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(data).expect("write entry");
    }
    writer.finish().expect("finish archive");
}

fn write_extension_archive(path: &Path, name: &str, target_version: &str) {
    let blob = ExtensionDescriptor::new(name, "1.0", "Deskwell", target_version).serialize();
    write_archive(path, &[("extension.json", blob.as_bytes())]);
}

#[test]
fn test_incidental_archives_are_not_failures() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    write_archive(&dir.path().join("backup.zip"), &[("notes.txt", b"hello")]);
    std::fs::write(dir.path().join("readme.md"), b"not an archive").expect("write");

    let mut registry = ExtensionRegistry::new();
    let loaded = registry.load_extensions(dir.path(), Some("Deskwell"), Some("3.2"));

    assert_eq!(loaded, 0);
    assert!(registry.failures().is_empty());
}

#[test]
fn test_compatibility_rejections_are_recorded() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    write_extension_archive(&dir.path().join("old.zip"), "Old", "2.9");
    write_extension_archive(&dir.path().join("future.zip"), "Future", "4.0");

    let wrong_host =
        ExtensionDescriptor::new("Other", "1.0", "SomeOtherApp", "3.0").serialize();
    write_archive(
        &dir.path().join("other.zip"),
        &[("extension.json", wrong_host.as_bytes())],
    );

    let mut registry = ExtensionRegistry::new();
    let loaded = registry.load_extensions(dir.path(), Some("Deskwell"), Some("3.2"));

    assert_eq!(loaded, 0);
    assert_eq!(registry.failures().len(), 3);
    for failure in registry.failures() {
        assert!(failure.archive.is_some());
        assert!(!failure.message.is_empty());
    }
}

#[test]
fn test_invalid_descriptor_is_recorded() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let incomplete = ExtensionDescriptor {
        name: "Broken".to_string(),
        version: "1.0".to_string(),
        ..ExtensionDescriptor::default()
    }
    .serialize();
    write_archive(
        &dir.path().join("broken.zip"),
        &[("extension.json", incomplete.as_bytes())],
    );

    let mut registry = ExtensionRegistry::new();
    assert_eq!(registry.load_extensions(dir.path(), Some("Deskwell"), None), 0);
    assert_eq!(registry.failures().len(), 1);
    assert!(registry.failures()[0].message.contains("required fields"));
}

#[test]
fn test_unparseable_host_version_skips_version_check() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    write_extension_archive(&dir.path().join("ext.zip"), "Ext", "9.9");

    let mut registry = ExtensionRegistry::new();
    registry.load_extensions(dir.path(), Some("Deskwell"), Some("snapshot"));

    // The only recorded failure is the missing native library, not a
    // version rejection.
    assert_eq!(registry.failures().len(), 1);
    assert!(registry.failures()[0].message.contains("native library"));
}

#[test]
fn test_candidates_load_in_control_file_order() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    write_extension_archive(&dir.path().join("b.zip"), "B", "3.0");
    write_extension_archive(&dir.path().join("a.zip"), "A", "3.0");
    write_extension_archive(&dir.path().join("c.zip"), "C", "3.0");
    std::fs::write(
        dir.path().join(LOAD_ORDER_FILE),
        "c.zip\n\n#comment\na.zip\n",
    )
    .expect("control file");

    let mut registry = ExtensionRegistry::new();
    registry.load_extensions(dir.path(), Some("Deskwell"), Some("3.2"));

    // Every candidate fails at the same step (no native library), so the
    // failure sequence mirrors the load order.
    let order: Vec<String> = registry
        .failures()
        .iter()
        .filter_map(|f| f.archive.as_ref())
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .map(str::to_string)
        .collect();
    assert_eq!(order, ["c.zip", "a.zip", "b.zip"]);
}

#[test]
fn test_archives_in_subdirectories_are_found() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("bundled");
    std::fs::create_dir(&nested).expect("mkdir");
    write_extension_archive(&nested.join("ext.zip"), "Nested", "3.0");

    let mut registry = ExtensionRegistry::new();
    registry.load_extensions(dir.path(), Some("Deskwell"), Some("3.2"));

    assert_eq!(registry.failures().len(), 1);
    assert_eq!(
        registry.failures()[0].archive.as_deref(),
        Some(nested.join("ext.zip").as_path())
    );
}

#[test]
fn test_archive_handle_released_after_load_attempt() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = dir.path().join("ext.zip");
    write_extension_archive(&archive, "Ext", "3.0");

    let mut registry = ExtensionRegistry::new();
    assert!(!registry.load_extension_from_archive(&archive));

    // The guard is gone; the archive can be replaced on the spot.
    std::fs::remove_file(&archive).expect("archive must be deletable after loading");
    write_extension_archive(&archive, "Ext", "3.0");
}

#[test]
fn test_direct_load_without_descriptor_records_failure() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = dir.path().join("plain.zip");
    write_archive(&archive, &[("data.bin", b"\x00\x01")]);

    let mut registry = ExtensionRegistry::new();
    assert!(!registry.load_extension_from_archive(&archive));
    assert_eq!(registry.failures().len(), 1);
    assert!(registry.failures()[0].message.contains("descriptor"));
}
