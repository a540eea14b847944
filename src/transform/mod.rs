//! Optional post-processing of crawled content
//!
//! Two capabilities can be plugged into a crawl:
//! - a text simplifier applied to every extracted page text
//! - a media describer producing a short description of a media asset
//!
//! Both default to doing nothing. A transform that errors never fails the
//! crawl: the error is logged and the untransformed value is kept.

use crate::config::{DescriberKind, SimplifierKind, TransformConfig};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
#[error("{transform} failed: {message}")]
pub struct TransformError {
    pub transform: &'static str,
    pub message: String,
}

/// Rewrites page text, e.g. into simpler language
#[async_trait]
pub trait TextSimplifier: Send + Sync {
    async fn simplify(&self, text: &str) -> Result<String, TransformError>;
}

/// Describes a media asset, e.g. by captioning an image
#[async_trait]
pub trait MediaDescriber: Send + Sync {
    async fn describe(
        &self,
        url: &Url,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<Option<String>, TransformError>;
}

/// Returns text unchanged
pub struct IdentitySimplifier;

#[async_trait]
impl TextSimplifier for IdentitySimplifier {
    async fn simplify(&self, text: &str) -> Result<String, TransformError> {
        Ok(text.to_string())
    }
}

/// Drops repeated lines and whitespace runs, optionally capping the length
///
/// Navigation menus and footers repeated across a page collapse to a single
/// occurrence.
pub struct CompactSimplifier {
    max_chars: Option<usize>,
}

impl CompactSimplifier {
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl TextSimplifier for CompactSimplifier {
    async fn simplify(&self, text: &str) -> Result<String, TransformError> {
        let mut seen = HashSet::new();
        let mut lines = Vec::new();

        for line in text.lines() {
            let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if !line.is_empty() && seen.insert(line.clone()) {
                lines.push(line);
            }
        }

        let mut compact = lines.join("\n");
        if let Some(max) = self.max_chars {
            if let Some((idx, _)) = compact.char_indices().nth(max) {
                compact.truncate(idx);
            }
        }

        Ok(compact)
    }
}

/// Never describes anything
pub struct NoDescriber;

#[async_trait]
impl MediaDescriber for NoDescriber {
    async fn describe(
        &self,
        _url: &Url,
        _content_type: &str,
        _bytes: &[u8],
    ) -> Result<Option<String>, TransformError> {
        Ok(None)
    }
}

/// Describes media by file name, type and size
pub struct MetadataDescriber;

#[async_trait]
impl MediaDescriber for MetadataDescriber {
    async fn describe(
        &self,
        url: &Url,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<Option<String>, TransformError> {
        let name = crate::url::file_name(url).unwrap_or("unnamed");
        let size_kb = bytes.len() as f64 / 1024.0;
        Ok(Some(format!(
            "{} - {}, size: {:.1} KB",
            name, content_type, size_kb
        )))
    }
}

/// The transforms a crawl applies, chosen once at construction time
#[derive(Clone)]
pub struct Transforms {
    simplifier: Arc<dyn TextSimplifier>,
    describer: Arc<dyn MediaDescriber>,
}

impl Default for Transforms {
    fn default() -> Self {
        Self {
            simplifier: Arc::new(IdentitySimplifier),
            describer: Arc::new(NoDescriber),
        }
    }
}

impl Transforms {
    pub fn new(simplifier: Arc<dyn TextSimplifier>, describer: Arc<dyn MediaDescriber>) -> Self {
        Self {
            simplifier,
            describer,
        }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        let simplifier: Arc<dyn TextSimplifier> = match config.simplify {
            SimplifierKind::None => Arc::new(IdentitySimplifier),
            SimplifierKind::Compact => Arc::new(CompactSimplifier::new(config.max_text_chars)),
        };
        let describer: Arc<dyn MediaDescriber> = match config.describe {
            DescriberKind::None => Arc::new(NoDescriber),
            DescriberKind::Metadata => Arc::new(MetadataDescriber),
        };
        Self::new(simplifier, describer)
    }

    /// Simplifies text, falling back to the original on error
    pub async fn simplify(&self, url: &Url, text: String) -> String {
        match self.simplifier.simplify(&text).await {
            Ok(simplified) => simplified,
            Err(e) => {
                tracing::warn!("Keeping original text for {}: {}", url, e);
                text
            }
        }
    }

    /// Describes a media asset, falling back to no description on error
    pub async fn describe(&self, url: &Url, content_type: &str, bytes: &[u8]) -> Option<String> {
        match self.describer.describe(url, content_type, bytes).await {
            Ok(description) => description,
            Err(e) => {
                tracing::warn!("No description for {}: {}", url, e);
                None
            }
        }
    }
}
