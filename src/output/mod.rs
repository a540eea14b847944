//! Output module for crawl results
//!
//! This module handles:
//! - The site content aggregate and its JSON form
//! - Writing the aggregate to disk
//! - Recording and printing crawl statistics

mod content;
pub mod stats;

pub use content::{MediaRecord, MediaType, SiteContent, TextPageRecord};
pub use stats::{print_statistics, CrawlStatistics};

use crate::UmbraError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Writes the aggregate as pretty-printed JSON, replacing any existing file
///
/// Parent directories are created as needed.
pub fn write_json(content: &SiteContent, path: &Path) -> Result<(), UmbraError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, content)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads an aggregate previously written by [`write_json`]
pub fn read_json(path: &Path) -> Result<SiteContent, UmbraError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("output.json");

        let mut content = SiteContent::new();
        content.push_text(TextPageRecord {
            url: "http://example.onion/".to_string(),
            parent_url: None,
            depth: 0,
            title: None,
            content: "Hello".to_string(),
        });

        write_json(&content, &path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"TextPages\""));
        assert!(raw.contains("\"MediaContentList\": []"));

        assert_eq!(read_json(&path).unwrap(), content);
    }

    #[test]
    fn test_write_empty_aggregate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.json");

        write_json(&SiteContent::new(), &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"TextPages": [], "MediaContentList": []}));
    }
}
