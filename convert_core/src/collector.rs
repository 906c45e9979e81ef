//! File collector: turns dropped paths into an ordered list of inputs.
//!
//! Directories are walked recursively; only `.heic`/`.heif` files (compared
//! case-insensitively) are accepted. Files already in the working set are
//! skipped silently in append mode. Filesystem sidecar artifacts like
//! `.DS_Store` and `Thumbs.db` are ignored entirely. Everything else is
//! reported as rejected by base filename so the caller can show a short
//! "unsupported files ignored" notice.

use crate::common_utils::{base_name, has_extension};
use crate::session::WorkingSet;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Filesystem metadata sidecars, ignored without being counted as rejects.
const SYSTEM_ARTIFACT_PREFIXES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// How many unique rejected basenames to surface in a user-facing notice.
pub const REJECT_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct CollectOutcome {
    /// Newly accepted inputs, in discovery order, deduplicated.
    pub accepted: Vec<PathBuf>,
    /// Base filenames of unsupported files, in discovery order.
    pub rejected: Vec<String>,
}

/// Collect candidate inputs from dropped files and/or directories.
///
/// In append mode, paths already present in `existing` are skipped without
/// being counted as new or rejected. With `append_mode` false the caller is
/// expected to replace its working set with the result, so `existing` is
/// not consulted.
///
/// Unreadable directories contribute nothing; walk errors are logged and
/// skipped rather than aborting collection.
pub fn collect(roots: &[PathBuf], existing: &WorkingSet, append_mode: bool) -> CollectOutcome {
    let mut outcome = CollectOutcome::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        if root.is_dir() {
            for entry in WalkDir::new(root) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if entry.file_type().is_file() {
                    visit_file(entry.path(), existing, append_mode, &mut seen, &mut outcome);
                }
            }
        } else if root.is_file() {
            visit_file(root, existing, append_mode, &mut seen, &mut outcome);
        } else {
            warn!(path = %root.display(), "Dropped path does not exist, ignoring");
        }
    }

    outcome
}

fn visit_file(
    path: &Path,
    existing: &WorkingSet,
    append_mode: bool,
    seen: &mut HashSet<PathBuf>,
    outcome: &mut CollectOutcome,
) {
    let name = base_name(path);
    if is_system_artifact(&name) {
        return;
    }

    if has_extension(path, SUPPORTED_EXTENSIONS) {
        if append_mode && existing.contains(path) {
            return;
        }
        if seen.insert(path.to_path_buf()) {
            outcome.accepted.push(path.to_path_buf());
        }
    } else {
        outcome.rejected.push(name);
    }
}

fn is_system_artifact(name: &str) -> bool {
    SYSTEM_ARTIFACT_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// User-facing condition derived from a collect outcome. The caller decides
/// how to render each variant (message box, console line, log entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectReport {
    /// Nothing worth telling the user.
    Quiet,
    /// No new files accepted and the resulting working set is empty.
    NothingUsable { ignored: usize },
    /// Some files were accepted (or already queued) but others were ignored.
    UnsupportedIgnored {
        total: usize,
        /// Up to [`REJECT_SAMPLE_LIMIT`] unique basenames.
        sample: Vec<String>,
        /// True when more unique basenames exist than the sample shows.
        truncated: bool,
    },
}

/// Classify an outcome given the size of the working set after merging.
pub fn classify_report(outcome: &CollectOutcome, resulting_set_len: usize) -> CollectReport {
    if outcome.rejected.is_empty() {
        return CollectReport::Quiet;
    }
    if outcome.accepted.is_empty() && resulting_set_len == 0 {
        return CollectReport::NothingUsable {
            ignored: outcome.rejected.len(),
        };
    }

    let mut unique: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for name in &outcome.rejected {
        if seen.insert(name.as_str()) {
            unique.push(name.clone());
        }
    }
    let truncated = unique.len() > REJECT_SAMPLE_LIMIT;
    unique.truncate(REJECT_SAMPLE_LIMIT);

    CollectReport::UnsupportedIgnored {
        total: outcome.rejected.len(),
        sample: unique,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_extension_filter_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        let a = touch(tmp.path(), "IMG_0001.HEIC");
        let b = touch(tmp.path(), "img_0002.heif");
        touch(tmp.path(), "image.heics");
        touch(tmp.path(), "photo.jpg");

        let outcome = collect(
            &[tmp.path().to_path_buf()],
            &WorkingSet::new(),
            false,
        );
        let mut accepted = outcome.accepted.clone();
        accepted.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(accepted, expected);
        let mut rejected = outcome.rejected.clone();
        rejected.sort();
        assert_eq!(rejected, vec!["image.heics", "photo.jpg"]);
    }

    #[test]
    fn test_system_artifacts_neither_accepted_nor_rejected() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), ".DS_Store");
        touch(tmp.path(), "Thumbs.db");
        touch(tmp.path(), "a.heic");

        let outcome = collect(&[tmp.path().to_path_buf()], &WorkingSet::new(), false);
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_recursive_directory_walk() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("trip").join("day2");
        fs::create_dir_all(&nested).unwrap();
        touch(&nested, "deep.heic");
        touch(tmp.path(), "top.heic");

        let outcome = collect(&[tmp.path().to_path_buf()], &WorkingSet::new(), false);
        assert_eq!(outcome.accepted.len(), 2);
    }

    #[test]
    fn test_append_mode_skips_existing() {
        let tmp = TempDir::new().unwrap();
        let a = touch(tmp.path(), "1.heic");
        let b = touch(tmp.path(), "2.heic");

        let mut existing = WorkingSet::new();
        existing.insert(a.clone());

        let outcome = collect(&[a.clone(), b.clone()], &existing, true);
        assert_eq!(outcome.accepted, vec![b]);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_fresh_collect_never_duplicates() {
        let tmp = TempDir::new().unwrap();
        let a = touch(tmp.path(), "1.heic");

        // Same file dropped twice, plus the directory containing it.
        let outcome = collect(
            &[a.clone(), a.clone(), tmp.path().to_path_buf()],
            &WorkingSet::new(),
            false,
        );
        assert_eq!(outcome.accepted, vec![a]);
    }

    #[test]
    fn test_collect_idempotent_in_append_mode() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "1.heic");
        touch(tmp.path(), "2.heic");

        let mut set = WorkingSet::new();
        let first = collect(&[tmp.path().to_path_buf()], &set, true);
        for path in first.accepted {
            set.insert(path);
        }
        let len_after_first = set.len();

        let second = collect(&[tmp.path().to_path_buf()], &set, true);
        assert!(second.accepted.is_empty());
        for path in second.accepted {
            set.insert(path);
        }
        assert_eq!(set.len(), len_after_first);
    }

    #[test]
    fn test_missing_root_is_ignored() {
        let outcome = collect(
            &[PathBuf::from("/definitely/not/here.heic")],
            &WorkingSet::new(),
            false,
        );
        assert!(outcome.accepted.is_empty());
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_classify_nothing_usable() {
        let outcome = CollectOutcome {
            accepted: vec![],
            rejected: vec!["a.jpg".into()],
        };
        assert_eq!(
            classify_report(&outcome, 0),
            CollectReport::NothingUsable { ignored: 1 }
        );
    }

    #[test]
    fn test_classify_sample_limited_to_five_unique() {
        let rejected: Vec<String> = (0..8).map(|i| format!("f{}.jpg", i)).collect();
        let outcome = CollectOutcome {
            accepted: vec![PathBuf::from("/a/1.heic")],
            rejected: rejected.clone(),
        };
        match classify_report(&outcome, 1) {
            CollectReport::UnsupportedIgnored {
                total,
                sample,
                truncated,
            } => {
                assert_eq!(total, 8);
                assert_eq!(sample.len(), REJECT_SAMPLE_LIMIT);
                assert!(truncated);
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_classify_duplicate_basenames_counted_once_in_sample() {
        let outcome = CollectOutcome {
            accepted: vec![PathBuf::from("/a/1.heic")],
            rejected: vec!["same.jpg".into(), "same.jpg".into()],
        };
        match classify_report(&outcome, 1) {
            CollectReport::UnsupportedIgnored {
                total,
                sample,
                truncated,
            } => {
                assert_eq!(total, 2);
                assert_eq!(sample, vec!["same.jpg"]);
                assert!(!truncated);
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    proptest! {
        /// Collecting the same roots twice in append mode never grows the
        /// working set beyond the single-run result.
        #[test]
        fn prop_append_collect_is_idempotent(names in proptest::collection::hash_set("[a-z]{1,8}", 1..12)) {
            let tmp = TempDir::new().unwrap();
            for name in &names {
                touch(tmp.path(), &format!("{}.heic", name));
            }

            let mut set = WorkingSet::new();
            let first = collect(&[tmp.path().to_path_buf()], &set, true);
            for path in first.accepted {
                set.insert(path);
            }
            let len_after_first = set.len();
            prop_assert_eq!(len_after_first, names.len());

            let second = collect(&[tmp.path().to_path_buf()], &set, true);
            prop_assert!(second.accepted.is_empty());
            prop_assert_eq!(set.len(), len_after_first);
        }
    }
}
