//! The crawled site content aggregate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Other,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Readable text of one crawled page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextPageRecord {
    pub url: String,
    pub parent_url: Option<String>,
    pub depth: u32,
    pub title: Option<String>,
    pub content: String,
}

/// One retained media asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaRecord {
    pub url: String,
    pub parent_url: Option<String>,
    pub depth: u32,
    pub media_type: MediaType,
    pub content_type: String,
    pub size_bytes: u64,
    pub description: Option<String>,
}

/// Everything a crawl produced, in the order it was classified
///
/// Records are only ever appended. Serializes to one object holding the
/// `TextPages` and `MediaContentList` arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    #[serde(rename = "TextPages")]
    pub text_pages: Vec<TextPageRecord>,

    #[serde(rename = "MediaContentList")]
    pub media: Vec<MediaRecord>,
}

impl SiteContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, record: TextPageRecord) {
        self.text_pages.push(record);
    }

    pub fn push_media(&mut self, record: MediaRecord) {
        self.media.push(record);
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.text_pages.len() + self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_pages.is_empty() && self.media.is_empty()
    }

    /// Returns true if any record, text or media, has this URL
    pub fn contains_url(&self, url: &str) -> bool {
        self.text_pages.iter().any(|p| p.url == url) || self.media.iter().any(|m| m.url == url)
    }

    /// Total bytes of retained media
    pub fn media_bytes(&self) -> u64 {
        self.media.iter().map(|m| m.size_bytes).sum()
    }
}
