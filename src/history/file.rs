//! Line-oriented history file
//!
//! One canonical URL per line, only ever appended to. Every record is
//! `sync_data`'d before `record` returns, so a crash loses at most the line
//! being written.

use crate::history::traits::{HistoryError, HistoryResult, HistoryStore};
use crate::history::VisitedSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only history file backend
pub struct FileHistory {
    path: PathBuf,
    file: File,
    visited: VisitedSet,
}

impl FileHistory {
    /// Opens (creating if needed) a history file and loads its contents
    pub fn open(path: &Path) -> HistoryResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        terminate_last_line(&mut file)?;

        let mut history = Self {
            path: path.to_path_buf(),
            file,
            visited: VisitedSet::new(),
        };
        history.load()?;

        tracing::debug!(
            "Opened history file {} with {} URLs",
            path.display(),
            history.visited.len()
        );

        Ok(history)
    }
}

/// Makes sure a hand-edited file without a trailing newline does not get
/// the next URL glued onto its last line
fn terminate_last_line(file: &mut File) -> HistoryResult<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;

    if last[0] != b'\n' {
        file.write_all(b"\n")?;
        file.sync_data()?;
    }

    Ok(())
}

impl HistoryStore for FileHistory {
    fn load(&mut self) -> HistoryResult<VisitedSet> {
        let content = std::fs::read_to_string(&self.path)?;

        self.visited = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(self.visited.clone())
    }

    fn contains(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    fn record(&mut self, url: &str) -> HistoryResult<bool> {
        if url.contains('\n') || url.contains('\r') {
            return Err(HistoryError::InvalidEntry(url.to_string()));
        }

        if self.visited.contains(url) {
            return Ok(false);
        }

        writeln!(self.file, "{}", url)?;
        self.file.sync_data()?;
        self.visited.insert(url.to_string());

        Ok(true)
    }

    fn flush(&mut self) -> HistoryResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn clear(&mut self) -> HistoryResult<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.visited = VisitedSet::new();
        Ok(())
    }

    fn len(&self) -> usize {
        self.visited.len()
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
