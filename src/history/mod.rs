//! History module for cross-run URL deduplication
//!
//! This module persists the set of URLs the crawler has already processed,
//! so a later run (or a run resumed after a crash) skips them. Two backends
//! are available:
//! - an append-only text file, one URL per line (the default)
//! - a SQLite database

mod file;
mod schema;
mod sqlite;
mod traits;

pub use file::FileHistory;
pub use sqlite::SqliteHistory;
pub use traits::{HistoryError, HistoryResult, HistoryStore};

use crate::config::{HistoryBackend, HistoryConfig};
use std::collections::HashSet;
use std::path::Path;

/// Opens the history backend selected in the configuration
///
/// # Returns
///
/// * `Ok(Box<dyn HistoryStore>)` - Store with the persisted history loaded
/// * `Err(HistoryError)` - The backing storage could not be opened or read
pub fn open_history(config: &HistoryConfig) -> HistoryResult<Box<dyn HistoryStore>> {
    let path = Path::new(&config.path);
    let store: Box<dyn HistoryStore> = match config.backend {
        HistoryBackend::File => Box::new(FileHistory::open(path)?),
        HistoryBackend::Sqlite => Box::new(SqliteHistory::open(path)?),
    };
    Ok(store)
}

/// Set of canonical URL strings that iterates in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a URL, returning false if it was already present
    pub fn insert(&mut self, url: String) -> bool {
        if self.index.contains(&url) {
            return false;
        }
        self.index.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns true if every URL in `other` is also in this set
    pub fn is_superset(&self, other: &VisitedSet) -> bool {
        other.iter().all(|url| self.contains(url))
    }
}

impl FromIterator<String> for VisitedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for url in iter {
            set.insert(url);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_visited_set_dedup_and_order() {
        let mut set = VisitedSet::new();
        assert!(set.insert("b".to_string()));
        assert!(set.insert("a".to_string()));
        assert!(!set.insert("b".to_string()));

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_visited_set_superset() {
        let small: VisitedSet = vec!["a".to_string()].into_iter().collect();
        let large: VisitedSet = vec!["a".to_string(), "b".to_string()].into_iter().collect();

        assert!(large.is_superset(&small));
        assert!(!small.is_superset(&large));
    }

    #[test]
    fn test_open_history_backends() {
        let dir = TempDir::new().unwrap();

        let file_config = HistoryConfig {
            backend: HistoryBackend::File,
            path: dir.path().join("history.txt").display().to_string(),
        };
        let mut store = open_history(&file_config).unwrap();
        store.record("http://a.onion/").unwrap();
        assert_eq!(store.len(), 1);

        let sqlite_config = HistoryConfig {
            backend: HistoryBackend::Sqlite,
            path: dir.path().join("history.db").display().to_string(),
        };
        let store = open_history(&sqlite_config).unwrap();
        assert!(store.is_empty());
    }
}
