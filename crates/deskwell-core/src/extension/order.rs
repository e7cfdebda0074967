//! Load-order policy for candidate archives.
//!
//! An administrator can pin load order with an optional control file in the
//! scanned directory: one archive file name (or file-name prefix) per line,
//! `#` comments and blank lines ignored. Archives the control file does not
//! place are appended in lexicographic order of their absolute path.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

/// Fixed file name of the optional order-control file.
pub const LOAD_ORDER_FILE: &str = "load-order.txt";

/// Produce a total order over the candidate archives.
///
/// Every input appears in the output exactly once. Ambiguous prefix matches
/// resolve to the lexicographically first remaining candidate.
pub(crate) fn order_archives(dir: &Path, candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut remaining = candidates;
    // Sorted up front: the lexicographic fallback and the deterministic
    // tie-break both read off this order.
    remaining.sort();

    let mut ordered = Vec::with_capacity(remaining.len());
    let control = dir.join(LOAD_ORDER_FILE);
    match fs::read_to_string(&control) {
        Ok(text) => {
            for line in text.lines() {
                let entry = line.trim();
                if entry.is_empty() || entry.starts_with('#') {
                    continue;
                }
                place_entry(entry, &mut remaining, &mut ordered);
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            error!(
                file = %control.display(),
                error = %e,
                "could not read load-order file, falling back to lexicographic order"
            );
        }
    }

    ordered.extend(remaining);
    ordered
}

fn place_entry(entry: &str, remaining: &mut Vec<PathBuf>, ordered: &mut Vec<PathBuf>) {
    // Exact file-name match first.
    if let Some(pos) = remaining.iter().position(|p| file_name(p) == Some(entry)) {
        ordered.push(remaining.remove(pos));
        return;
    }

    // Then prefix matching.
    let matches: Vec<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, p)| file_name(p).is_some_and(|n| n.starts_with(entry)))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [] => debug!(entry, "load-order entry matched no archive"),
        [pos] => ordered.push(remaining.remove(*pos)),
        [first, ..] => {
            warn!(
                entry,
                matches = matches.len(),
                "ambiguous load-order entry, taking lexicographically first match"
            );
            ordered.push(remaining.remove(*first));
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(ordered: &[PathBuf]) -> Vec<&str> {
        ordered.iter().filter_map(|p| file_name(p)).collect()
    }

    #[test]
    fn test_no_control_file_is_lexicographic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let candidates = vec![
            dir.path().join("b.zip"),
            dir.path().join("a.zip"),
            dir.path().join("c.zip"),
        ];

        let ordered = order_archives(dir.path(), candidates);
        assert_eq!(names(&ordered), ["a.zip", "b.zip", "c.zip"]);
    }

    #[test]
    fn test_control_file_places_explicit_entries_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(LOAD_ORDER_FILE), "c.zip\n\n#comment\na.zip\n")
            .expect("control file");
        let candidates = vec![
            dir.path().join("b.zip"),
            dir.path().join("a.zip"),
            dir.path().join("c.zip"),
        ];

        let ordered = order_archives(dir.path(), candidates);
        assert_eq!(names(&ordered), ["c.zip", "a.zip", "b.zip"]);
    }

    #[test]
    fn test_prefix_match_single() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(LOAD_ORDER_FILE), "clock\n").expect("control file");
        let candidates = vec![
            dir.path().join("weather-1.2.zip"),
            dir.path().join("clock-2.0.zip"),
        ];

        let ordered = order_archives(dir.path(), candidates);
        assert_eq!(names(&ordered), ["clock-2.0.zip", "weather-1.2.zip"]);
    }

    #[test]
    fn test_prefix_match_ambiguous_takes_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(LOAD_ORDER_FILE), "clock\n").expect("control file");
        let candidates = vec![
            dir.path().join("clock-b.zip"),
            dir.path().join("clock-a.zip"),
            dir.path().join("other.zip"),
        ];

        let ordered = order_archives(dir.path(), candidates);
        assert_eq!(names(&ordered), ["clock-a.zip", "clock-b.zip", "other.zip"]);
    }

    #[test]
    fn test_unmatched_entry_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(LOAD_ORDER_FILE), "nothing-like-this\nb.zip\n")
            .expect("control file");
        let candidates = vec![dir.path().join("b.zip"), dir.path().join("a.zip")];

        let ordered = order_archives(dir.path(), candidates);
        assert_eq!(names(&ordered), ["b.zip", "a.zip"]);
    }

    #[test]
    fn test_every_candidate_appears_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(LOAD_ORDER_FILE), "a.zip\na.zip\n").expect("control file");
        let candidates = vec![dir.path().join("a.zip"), dir.path().join("b.zip")];

        let ordered = order_archives(dir.path(), candidates);
        assert_eq!(names(&ordered), ["a.zip", "b.zip"]);
    }
}
