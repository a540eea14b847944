//! SQLite history implementation
//!
//! This module provides a SQLite-based implementation of the HistoryStore trait.

use crate::history::schema::initialize_schema;
use crate::history::traits::{HistoryResult, HistoryStore};
use crate::history::VisitedSet;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQLite history backend
pub struct SqliteHistory {
    conn: Connection,
    path: Option<PathBuf>,
    visited: VisitedSet,
}

impl SqliteHistory {
    /// Opens or creates a history database and loads its contents
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> HistoryResult<Self> {
        let conn = Connection::open(path)?;

        // FULL makes every committed insert durable on its own
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        let mut history = Self {
            conn,
            path: Some(path.to_path_buf()),
            visited: VisitedSet::new(),
        };
        history.load()?;

        Ok(history)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> HistoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            path: None,
            visited: VisitedSet::new(),
        })
    }
}

impl HistoryStore for SqliteHistory {
    fn load(&mut self) -> HistoryResult<VisitedSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM visited_urls ORDER BY id")?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<VisitedSet, _>>()?;

        self.visited = urls;
        Ok(self.visited.clone())
    }

    fn contains(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    fn record(&mut self, url: &str) -> HistoryResult<bool> {
        if self.visited.contains(url) {
            return Ok(false);
        }

        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO visited_urls (url, recorded_at) VALUES (?1, ?2)",
            params![url, now],
        )?;

        self.visited.insert(url.to_string());
        Ok(inserted > 0)
    }

    fn flush(&mut self) -> HistoryResult<()> {
        self.conn
            .query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(()))?;
        Ok(())
    }

    fn clear(&mut self) -> HistoryResult<()> {
        self.conn.execute("DELETE FROM visited_urls", [])?;
        self.visited = VisitedSet::new();
        Ok(())
    }

    fn len(&self) -> usize {
        self.visited.len()
    }

    fn location(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }
}
