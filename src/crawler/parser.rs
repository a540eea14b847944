//! HTML link, media and text extraction
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Media sources (img, video, audio, source, iframe)
//! - Page title
//! - Readable body text

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text is never part of the readable content
const SKIPPED_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "header", "footer", "nav"];

/// Elements whose `src` attribute points at media
const MEDIA_SELECTOR: &str = "img[src], video[src], audio[src], source[src], iframe[src]";

/// Everything the crawler needs from one HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// Absolute http(s) URLs of linked pages, in document order
    pub links: Vec<Url>,

    /// Absolute http(s) URLs of embedded media, in document order
    pub media: Vec<Url>,

    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Readable text, one phrase per line
    pub text: String,
}

/// Turns an HTML document into links, media sources and text
///
/// Extraction is total: malformed markup yields whatever could be recovered,
/// never an error.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, html: &str, base_url: &Url) -> ExtractedPage;
}

/// Default extractor built on `scraper`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use umbra_crawler::crawler::{HtmlExtractor, LinkExtractor};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("http://example.onion/").unwrap();
/// let page = HtmlExtractor.extract(html, &base_url);
/// assert_eq!(page.title, Some("Test".to_string()));
/// assert_eq!(page.links[0].as_str(), "http://example.onion/page");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl LinkExtractor for HtmlExtractor {
    fn extract(&self, html: &str, base_url: &Url) -> ExtractedPage {
        let document = Html::parse_document(html);

        ExtractedPage {
            links: extract_links(&document, base_url),
            media: extract_media(&document, base_url),
            title: extract_title(&document),
            text: extract_text(&document),
        }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                links.push(url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(url) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
                links.push(url);
            }
        }
    }

    links
}

fn extract_media(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(MEDIA_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(|src| resolve_link(src, base_url))
        .collect()
}

/// Collects the visible body text
///
/// Each text node is trimmed, runs separated by two or more spaces are split
/// into separate phrases, and blank phrases are dropped.
fn extract_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut phrases = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| SKIPPED_TEXT_ELEMENTS.contains(&el.value().name()));
        if hidden {
            continue;
        }

        for line in text.lines() {
            phrases.extend(
                line.split("  ")
                    .map(str::trim)
                    .filter(|phrase| !phrase.is_empty())
                    .map(str::to_string),
            );
        }
    }

    phrases.join("\n")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("http://example.onion/page").unwrap()
    }

    fn parse(html: &str) -> ExtractedPage {
        HtmlExtractor.extract(html, &base_url())
    }

    fn link_strings(page: &ExtractedPage) -> Vec<&str> {
        page.links.iter().map(Url::as_str).collect()
    }

    #[test]
    fn test_extract_title() {
        let parsed = parse(r#"<html><head><title>  Test Page  </title></head><body></body></html>"#);
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let parsed = parse(r#"<html><head></head><body></body></html>"#);
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="http://other.onion/page">Abs</a>
            <a href="/other">Root</a>
            <a href="sibling">Rel</a>
        </body></html>"#;
        let parsed = parse(html);
        assert_eq!(
            link_strings(&parsed),
            vec![
                "http://other.onion/page",
                "http://example.onion/other",
                "http://example.onion/sibling"
            ]
        );
    }

    #[test]
    fn test_skip_excluded_links() {
        let html = r##"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="JavaScript:alert(1)">js</a>
            <a href="mailto:test@example.com">mail</a>
            <a href="tel:+1234567890">call</a>
            <a href="data:text/html,<h1>Test</h1>">data</a>
            <a href="/file.pdf" download>dl</a>
            <a href="#section">jump</a>
            <a href="ftp://example.onion/file">ftp</a>
            <a href="/valid">ok</a>
        </body></html>"##;
        let parsed = parse(html);
        assert_eq!(link_strings(&parsed), vec!["http://example.onion/valid"]);
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<html><head><link rel="canonical" href="http://example.onion/canonical" /></head><body></body></html>"#;
        let parsed = parse(html);
        assert_eq!(link_strings(&parsed), vec!["http://example.onion/canonical"]);
    }

    #[test]
    fn test_extract_media_sources() {
        let html = r#"<html><body>
            <img src="/img/cat.jpg">
            <video src="clip.mp4"></video>
            <video><source src="http://cdn.onion/v.webm"></video>
            <audio src="/a.mp3"></audio>
            <iframe src="/embed"></iframe>
            <img alt="no source">
            <img src="data:image/png;base64,AAAA">
        </body></html>"#;
        let parsed = parse(html);
        let media: Vec<_> = parsed.media.iter().map(Url::as_str).collect();
        assert_eq!(
            media,
            vec![
                "http://example.onion/img/cat.jpg",
                "http://example.onion/clip.mp4",
                "http://cdn.onion/v.webm",
                "http://example.onion/a.mp3",
                "http://example.onion/embed"
            ]
        );
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_extract_text_skips_chrome() {
        let html = r#"<html><head><title>T</title><style>body { color: red }</style></head><body>
            <header>Site header</header>
            <nav><a href="/">Home</a></nav>
            <h1>Heading</h1>
            <p>First   paragraph.</p>
            <script>var hidden = 1;</script>
            <noscript>Enable JS</noscript>
            <p>Second  line</p>
            <footer>Copyright</footer>
        </body></html>"#;
        let parsed = parse(html);
        assert_eq!(parsed.text, "Heading\nFirst\nparagraph.\nSecond\nline");
    }

    #[test]
    fn test_malformed_html_is_recovered() {
        let html = r#"<html><body><p>Unclosed <a href="/next">next<div>tail"#;
        let parsed = parse(html);
        assert_eq!(link_strings(&parsed), vec!["http://example.onion/next"]);
        assert!(parsed.text.contains("tail"));
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse("");
        assert_eq!(parsed, ExtractedPage::default());
    }
}
