//! Session state: the working set of queued input files.
//!
//! The working set is an insertion-ordered, deduplicated sequence of paths.
//! Order determines both display order and batch iteration order. It is
//! owned by an explicit [`Session`] value and only mutated through
//! collector merges and `clear` — no hidden globals.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone)]
pub struct WorkingSet {
    paths: Vec<PathBuf>,
    index: HashSet<PathBuf>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path if not already present. Returns true if it was added.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.index.contains(&path) {
            return false;
        }
        self.index.insert(path.clone());
        self.paths.push(path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.index.clear();
    }
}

/// Per-session state passed into the collector and the batch runner.
#[derive(Debug, Default)]
pub struct Session {
    pub working_set: WorkingSet,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge newly collected paths. With `append` false the previous set is
    /// replaced, matching a fresh drop.
    pub fn merge(&mut self, accepted: Vec<PathBuf>, append: bool) {
        if !append {
            self.working_set.clear();
        }
        for path in accepted {
            self.working_set.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates() {
        let mut set = WorkingSet::new();
        assert!(set.insert(PathBuf::from("/a/1.heic")));
        assert!(!set.insert(PathBuf::from("/a/1.heic")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut set = WorkingSet::new();
        set.insert(PathBuf::from("/a/2.heic"));
        set.insert(PathBuf::from("/a/1.heic"));
        set.insert(PathBuf::from("/a/3.heic"));
        let order: Vec<_> = set.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(order, vec!["/a/2.heic", "/a/1.heic", "/a/3.heic"]);
    }

    #[test]
    fn test_merge_replace_vs_append() {
        let mut session = Session::new();
        session.merge(vec![PathBuf::from("/a/1.heic")], false);
        session.merge(
            vec![PathBuf::from("/a/1.heic"), PathBuf::from("/a/2.heic")],
            true,
        );
        assert_eq!(session.working_set.len(), 2);

        session.merge(vec![PathBuf::from("/a/3.heic")], false);
        assert_eq!(session.working_set.len(), 1);
        assert!(session.working_set.contains(Path::new("/a/3.heic")));
    }

    #[test]
    fn test_clear() {
        let mut set = WorkingSet::new();
        set.insert(PathBuf::from("/a/1.heic"));
        set.clear();
        assert!(set.is_empty());
        assert!(set.insert(PathBuf::from("/a/1.heic")));
    }
}
