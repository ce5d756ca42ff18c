//! Plain-text extraction from files and web pages.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Unsupported file type: {0} (expected .txt, .md or .pdf)")]
    UnsupportedType(String),

    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("No text could be extracted from {0}")]
    Empty(String),

    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Decode UTF-8, silently dropping invalid byte sequences.
#[must_use]
pub fn load_txt(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Extract PDF text, one page per line group.
pub fn load_pdf(bytes: &[u8]) -> Result<String, SourceError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| SourceError::Pdf(e.to_string()))?;
    let pages: Vec<&str> = text.split('\x0C').map(str::trim).collect();
    Ok(pages.join("\n"))
}

/// Load a local document, dispatching on its extension.
pub fn load_file(path: &Path) -> Result<String, SourceError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !matches!(extension.as_str(), "txt" | "md" | "pdf") {
        return Err(SourceError::UnsupportedType(path.display().to_string()));
    }

    let bytes = std::fs::read(path).map_err(|e| SourceError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());

    if extension == "pdf" {
        load_pdf(&bytes)
    } else {
        Ok(load_txt(&bytes))
    }
}

/// Fetch a web page and keep its readable text.
///
/// A network or HTTP failure, or a page without text, is an error; no retries.
pub async fn load_url(url: &str, timeout: Duration) -> Result<String, SourceError> {
    let fetch_error = |reason: String| SourceError::Fetch {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("docchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| fetch_error(e.to_string()))?;
    let html = response.text().await.map_err(|e| fetch_error(e.to_string()))?;

    let text = html_to_text(&html)?;
    if text.trim().is_empty() {
        return Err(SourceError::Empty(url.to_string()));
    }
    log::info!("Fetched {url} ({} chars of text)", text.len());
    Ok(text)
}

struct HtmlPatterns {
    hidden_blocks: Vec<Regex>,
    comments: Regex,
    line_breaks: Regex,
    tags: Regex,
    numeric_entity: Regex,
}

const HIDDEN_ELEMENTS: [&str; 6] = ["head", "script", "style", "noscript", "template", "svg"];

impl HtmlPatterns {
    fn new() -> Result<Self, regex::Error> {
        let hidden_blocks = HIDDEN_ELEMENTS
            .iter()
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            hidden_blocks,
            comments: Regex::new(r"(?s)<!--.*?-->")?,
            line_breaks: Regex::new(r"(?i)<(?:br|/p|/div|/li|/tr|/h[1-6]|/section|/article)\b[^>]*>")?,
            tags: Regex::new(r"(?s)<[^>]*>")?,
            numeric_entity: Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);")?,
        })
    }
}

static HTML_PATTERNS: OnceCell<HtmlPatterns> = OnceCell::new();

fn decode_entities(text: &str, numeric: &Regex) -> String {
    let decoded = numeric.replace_all(text, |caps: &regex::Captures<'_>| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Strip markup from an HTML document, leaving its visible text.
pub fn html_to_text(html: &str) -> Result<String, SourceError> {
    let patterns = HTML_PATTERNS.get_or_try_init(HtmlPatterns::new)?;

    let mut text = patterns.comments.replace_all(html, " ").into_owned();
    for block in &patterns.hidden_blocks {
        text = block.replace_all(&text, " ").into_owned();
    }
    let text = patterns.line_breaks.replace_all(&text, "\n");
    let text = patterns.tags.replace_all(&text, " ");
    let text = decode_entities(&text, &patterns.numeric_entity);

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_txt_drops_invalid_bytes() {
        assert_eq!(load_txt(b"caf\xc3\xa9 ok"), "café ok");
        assert_eq!(load_txt(b"bad\xff\xfebytes"), "badbytes");
        assert_eq!(load_txt(b""), "");
    }

    #[test]
    fn test_html_to_text_keeps_visible_text() {
        let html = r#"<!DOCTYPE html>
<html><head><title>Ignored</title><style>body { color: red; }</style></head>
<body>
  <script type="text/javascript">var x = "<p>not text</p>";</script>
  <!-- a comment -->
  <h1>Capitals</h1>
  <p>Paris is the capital of <b>France</b>.</p>
  <noscript>Enable JS</noscript>
  <p>Tom &amp; Jerry &lt;3 &#8212; caf&#xe9;</p>
</body></html>"#;
        let text = html_to_text(html).unwrap();
        assert_eq!(
            text,
            "Capitals\nParis is the capital of  France .\nTom & Jerry <3 — café"
        );
    }

    #[test]
    fn test_html_without_text_is_empty() {
        let text = html_to_text("<html><head><script>x()</script></head><body> </body></html>").unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_unknown_entity_left_alone() {
        assert_eq!(html_to_text("a &#xZZ; &copy; b").unwrap(), "a &#xZZ; &copy; b");
    }

    #[test]
    fn test_load_file_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.TXT");
        std::fs::write(&txt, "hello\nworld").unwrap();
        assert_eq!(load_file(&txt).unwrap(), "hello\nworld");

        let docx = dir.path().join("report.docx");
        std::fs::write(&docx, "zip").unwrap();
        assert!(matches!(load_file(&docx), Err(SourceError::UnsupportedType(_))));

        let missing = dir.path().join("missing.md");
        assert!(matches!(load_file(&missing), Err(SourceError::Read { .. })));
    }
}
