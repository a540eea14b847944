//! History store trait and error types

use crate::history::VisitedSet;
use thiserror::Error;

/// Errors that can occur while reading or writing visit history
///
/// All of them are fatal for a crawl: continuing without a durable record
/// risks revisiting the same URLs on the next run.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot record URL containing a line break: {0:?}")]
    InvalidEntry(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Durable, append-only set of visited URLs
///
/// Implementations keep an in-memory mirror of what is on disk so that
/// `contains` never touches storage. `record` must not return before the URL
/// is durably written.
pub trait HistoryStore: Send {
    /// Re-reads the persisted history and returns every URL in it
    fn load(&mut self) -> HistoryResult<VisitedSet>;

    /// Returns true if the URL has been recorded
    fn contains(&self, url: &str) -> bool;

    /// Durably records a URL
    ///
    /// Recording a URL that is already present is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if the URL was newly written
    fn record(&mut self, url: &str) -> HistoryResult<bool>;

    /// Guarantees everything recorded so far has reached stable storage
    fn flush(&mut self) -> HistoryResult<()>;

    /// Forgets every recorded URL
    fn clear(&mut self) -> HistoryResult<()>;

    /// Number of recorded URLs
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable location of the backing storage, for logs
    fn location(&self) -> String;
}
