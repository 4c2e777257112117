//! Feed source handling
//!
//! Fetches one raw XMLTV document per source entry. Remote sources go over
//! HTTP(S) with the configured User-Agent; entries without a scheme are read
//! from the local filesystem. Gzip payloads are detected by magic bytes and
//! decompressed transparently, and servers that answer with an HTML error
//! page instead of a feed are caught before parsing. Every failure here is
//! per-source: the batch driver logs it and moves on.

use anyhow::Context;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::errors::PipelineError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// HTTP client wrapper for feed downloads
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Fetch one source to text, decompressing and sniffing as needed.
    pub async fn fetch(&self, source: &str) -> Result<String, PipelineError> {
        let bytes = if is_remote(source) {
            self.download(source).await?
        } else {
            std::fs::read(source)
                .map_err(|e| PipelineError::fetch(source, e.to_string()))?
        };

        let bytes =
            maybe_decompress(bytes).map_err(|e| PipelineError::fetch(source, format!("{e:#}")))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        if looks_like_html(&text) {
            return Err(PipelineError::fetch(
                source,
                "response is an HTML page, not an XMLTV feed",
            ));
        }

        info!("fetched {} ({} bytes)", source, text.len());
        Ok(text)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::fetch(url, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::fetch(url, e.to_string()))?;
        debug!("downloaded {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Read the source list file: one URL or path per line, blanks and `#`
/// comments skipped. An unreadable list is fatal, unlike the sources in it.
pub fn read_source_list(path: &Path) -> Result<Vec<String>, PipelineError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| PipelineError::input_not_found(path, e))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Decompress when the payload opens with the gzip magic bytes.
fn maybe_decompress(bytes: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .context("failed to decompress gzip payload")?;
    Ok(decompressed)
}

/// An error page pretending to be a feed: first markup is an HTML document.
fn looks_like_html(text: &str) -> bool {
    let head = text.trim_start().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_read_source_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epgs.txt");
        std::fs::write(&path, "# feeds\nhttps://a.example/guide.xml\n\nlocal/guide.xml\n").unwrap();
        let sources = read_source_list(&path).unwrap();
        assert_eq!(
            sources,
            vec!["https://a.example/guide.xml", "local/guide.xml"]
        );
    }

    #[test]
    fn test_missing_source_list_is_fatal() {
        let err = read_source_list(Path::new("/nonexistent/epgs.txt")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_gzip_detection_and_decompression() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<tv></tv>").unwrap();
        let compressed = encoder.finish().unwrap();

        let out = maybe_decompress(compressed).unwrap();
        assert_eq!(out, b"<tv></tv>");

        // Plain payloads pass through untouched
        let plain = maybe_decompress(b"<tv/>".to_vec()).unwrap();
        assert_eq!(plain, b"<tv/>");
    }

    #[test]
    fn test_html_detection() {
        assert!(looks_like_html("<!DOCTYPE html><html><body>404</body></html>"));
        assert!(looks_like_html("  \n<HTML><head></head></HTML>"));
        assert!(!looks_like_html("<?xml version=\"1.0\"?><tv></tv>"));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.xml");
        std::fs::write(&path, "<tv></tv>").unwrap();

        let fetcher = FeedFetcher::new(&crate::config::Config::default().fetch);
        let text = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, "<tv></tv>");
    }

    #[tokio::test]
    async fn test_fetch_html_page_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error.xml");
        std::fs::write(&path, "<!doctype html><html>blocked</html>").unwrap();

        let fetcher = FeedFetcher::new(&crate::config::Config::default().fetch);
        let err = fetcher.fetch(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_missing_local_file_degrades() {
        let fetcher = FeedFetcher::new(&crate::config::Config::default().fetch);
        let err = fetcher.fetch("/nonexistent/guide.xml").await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }
}
