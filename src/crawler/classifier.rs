//! Content classification
//!
//! Decides whether a fetched resource is a text page to extract, a media
//! asset to record, or something the crawl ignores.

use crate::output::MediaType;
use std::fmt;
use url::Url;

/// Why a fetched resource was not retained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Media smaller than the configured minimum
    BelowMinimumSize { size_bytes: u64, minimum: u64 },

    /// Favicons and UI icons
    Icon,

    /// Off-site media source that turned out to be a page
    OffSitePage,

    /// Neither text nor a known media type
    Unsupported(String),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowMinimumSize { size_bytes, minimum } => {
                write!(f, "{} bytes is below the {} byte minimum", size_bytes, minimum)
            }
            Self::Icon => f.write_str("icon"),
            Self::OffSitePage => f.write_str("off-site page embedded as media"),
            Self::Unsupported(content_type) => write!(f, "unsupported content type {:?}", content_type),
        }
    }
}

/// Outcome of classifying one fetched resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    TextPage,
    Media { media_type: MediaType, size_bytes: u64 },
    Ignored(IgnoreReason),
}

/// What a content type or extension says about a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Media(MediaType),
}

const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct Classifier {
    min_media_size: u64,
}

impl Classifier {
    pub fn new(min_media_size: u64) -> Self {
        Self { min_media_size }
    }

    /// Classifies a resource from its declared content type, falling back
    /// to sniffing the body and then to the URL extension
    pub fn classify(&self, url: &Url, content_type: Option<&str>, body: &[u8]) -> Classification {
        let essence = content_type.map(mime_essence).filter(|ct| !ct.is_empty());

        let kind = match essence.as_deref() {
            Some(ct) if ct != GENERIC_CONTENT_TYPE => kind_from_content_type(ct),
            _ => {
                if looks_like_html(body) {
                    Some(Kind::Text)
                } else {
                    kind_from_extension(url)
                }
            }
        };

        match kind {
            Some(Kind::Text) => Classification::TextPage,
            Some(Kind::Media(media_type)) => self.classify_media(url, media_type, body.len() as u64),
            None => Classification::Ignored(IgnoreReason::Unsupported(
                essence.unwrap_or_else(|| "none".to_string()),
            )),
        }
    }

    fn classify_media(&self, url: &Url, media_type: MediaType, size_bytes: u64) -> Classification {
        if url.path().to_ascii_lowercase().contains("icon") {
            return Classification::Ignored(IgnoreReason::Icon);
        }

        if size_bytes < self.min_media_size {
            return Classification::Ignored(IgnoreReason::BelowMinimumSize {
                size_bytes,
                minimum: self.min_media_size,
            });
        }

        Classification::Media {
            media_type,
            size_bytes,
        }
    }
}

/// Lowercased `type/subtype` without parameters
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

fn kind_from_content_type(essence: &str) -> Option<Kind> {
    match essence {
        "text/html" | "application/xhtml+xml" | "text/plain" => Some(Kind::Text),
        "application/pdf" => Some(Kind::Media(MediaType::Other)),
        ct if ct.starts_with("image/") => Some(Kind::Media(MediaType::Image)),
        ct if ct.starts_with("video/") => Some(Kind::Media(MediaType::Video)),
        ct if ct.starts_with("audio/") => Some(Kind::Media(MediaType::Other)),
        _ => None,
    }
}

fn kind_from_extension(url: &Url) -> Option<Kind> {
    let name = crate::url::file_name(url)?;
    let (_, extension) = name.rsplit_once('.')?;

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" => Some(Kind::Media(MediaType::Image)),
        "mp4" | "webm" | "mov" => Some(Kind::Media(MediaType::Video)),
        "pdf" | "mp3" | "wav" => Some(Kind::Media(MediaType::Other)),
        "html" | "htm" | "txt" => Some(Kind::Text),
        _ => None,
    }
}

/// Checks the start of a body for an HTML prologue
fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(512)];
    let head = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 102_400;

    fn classifier() -> Classifier {
        Classifier::new(MIN)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_text_content_types() {
        let c = classifier();
        let u = url("http://example.onion/page");
        assert_eq!(c.classify(&u, Some("text/html; charset=utf-8"), b"<p>hi</p>"), Classification::TextPage);
        assert_eq!(c.classify(&u, Some("application/xhtml+xml"), b""), Classification::TextPage);
        assert_eq!(c.classify(&u, Some("TEXT/PLAIN"), b"hi"), Classification::TextPage);
    }

    #[test]
    fn test_media_size_boundary() {
        let c = classifier();
        let u = url("http://example.onion/photos/cat.jpg");

        let below = vec![0u8; (MIN - 1) as usize];
        assert!(matches!(
            c.classify(&u, Some("image/jpeg"), &below),
            Classification::Ignored(IgnoreReason::BelowMinimumSize { .. })
        ));

        let at = vec![0u8; MIN as usize];
        assert_eq!(
            c.classify(&u, Some("image/jpeg"), &at),
            Classification::Media {
                media_type: MediaType::Image,
                size_bytes: MIN
            }
        );
    }

    #[test]
    fn test_media_types() {
        let c = Classifier::new(0);
        let u = url("http://example.onion/file");
        let media = |ct| match c.classify(&u, Some(ct), b"x") {
            Classification::Media { media_type, .. } => Some(media_type),
            _ => None,
        };

        assert_eq!(media("image/png"), Some(MediaType::Image));
        assert_eq!(media("video/mp4"), Some(MediaType::Video));
        assert_eq!(media("audio/mpeg"), Some(MediaType::Other));
        assert_eq!(media("application/pdf"), Some(MediaType::Other));
    }

    #[test]
    fn test_icons_ignored() {
        let c = Classifier::new(0);
        let u = url("http://example.onion/static/favicon.png");
        assert_eq!(
            c.classify(&u, Some("image/png"), &[0u8; 10]),
            Classification::Ignored(IgnoreReason::Icon)
        );
    }

    #[test]
    fn test_missing_content_type_sniffs_html() {
        let c = classifier();
        let u = url("http://example.onion/download");
        assert_eq!(
            c.classify(&u, None, b"  <!DOCTYPE html><html></html>"),
            Classification::TextPage
        );
        assert_eq!(
            c.classify(&u, Some("application/octet-stream"), b"<html><body></body></html>"),
            Classification::TextPage
        );
    }

    #[test]
    fn test_missing_content_type_uses_extension() {
        let c = Classifier::new(0);
        assert!(matches!(
            c.classify(&url("http://example.onion/clip.WEBM"), None, b"\x1a\x45"),
            Classification::Media {
                media_type: MediaType::Video,
                ..
            }
        ));
        assert!(matches!(
            c.classify(&url("http://example.onion/blob"), Some("application/octet-stream"), b"\x00"),
            Classification::Ignored(IgnoreReason::Unsupported(_))
        ));
    }

    #[test]
    fn test_unsupported_content_type() {
        let c = classifier();
        let u = url("http://example.onion/app.js");
        assert_eq!(
            c.classify(&u, Some("application/javascript"), b"var x;"),
            Classification::Ignored(IgnoreReason::Unsupported("application/javascript".to_string()))
        );
    }
}
