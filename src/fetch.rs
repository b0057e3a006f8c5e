use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;
use ureq::ResponseExt;
use url::Url;

use crate::error::{FeescopeError, Result};

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP agent for connection pooling
static HTTP_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
        .build()
        .into()
});

/// Where checkout snapshots come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// Fetched over HTTP(S) on every observation
    Url(String),
    /// Re-read from disk on every observation, so edits act as page mutations
    File(PathBuf),
    /// Read once from standard input
    Stdin,
}

/// One snapshot of a page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Final URL after redirects, or the file path
    pub url: String,
    /// Raw HTML content
    pub html: String,
}

impl PageSource {
    /// Interpret a CLI argument: `-` for stdin, an http(s) URL, or a file path
    pub fn parse(arg: &str) -> Result<Self> {
        if arg == "-" {
            return Ok(PageSource::Stdin);
        }
        if arg.starts_with("http://") || arg.starts_with("https://") {
            let url = Url::parse(arg)?;
            return Ok(PageSource::Url(url.to_string()));
        }
        let path = PathBuf::from(arg);
        if !path.is_file() {
            return Err(FeescopeError::SourceError(format!(
                "'{}' is neither a URL nor a readable file",
                arg
            )));
        }
        Ok(PageSource::File(path))
    }

    /// Whether the source can be observed more than once
    pub fn is_live(&self) -> bool {
        !matches!(self, PageSource::Stdin)
    }

    /// Best guess at the site name: the URL host, or the file stem
    pub fn default_site(&self) -> String {
        match self {
            PageSource::Url(url) => Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(String::from))
                .unwrap_or_else(|| url.clone()),
            PageSource::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "local".to_string()),
            PageSource::Stdin => "stdin".to_string(),
        }
    }

    /// Take a snapshot
    pub fn load(&self) -> Result<PageContent> {
        match self {
            PageSource::Url(url) => fetch_http(url),
            PageSource::File(path) => Ok(PageContent {
                url: path.display().to_string(),
                html: std::fs::read_to_string(path)?,
            }),
            PageSource::Stdin => {
                let mut html = String::new();
                std::io::stdin().read_to_string(&mut html)?;
                Ok(PageContent {
                    url: "stdin".to_string(),
                    html,
                })
            }
        }
    }
}

/// Fetch using HTTP (ureq)
fn fetch_http(url: &str) -> Result<PageContent> {
    let response = HTTP_AGENT
        .get(url)
        .header(
            "User-Agent",
            "Mozilla/5.0 (compatible; feescope/0.1; checkout fee analyzer)",
        )
        .call()?;
    let final_url = response.get_uri().to_string();
    let html = response.into_body().read_to_string()?;

    Ok(PageContent {
        url: final_url,
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stdin_and_url() {
        assert_eq!(PageSource::parse("-").unwrap(), PageSource::Stdin);
        let source = PageSource::parse("https://www.swiggy.com/checkout").unwrap();
        assert!(matches!(source, PageSource::Url(_)));
        assert_eq!(source.default_site(), "www.swiggy.com");
        assert!(source.is_live());
        assert!(!PageSource::Stdin.is_live());
    }

    #[test]
    fn test_parse_missing_file_is_source_error() {
        let err = PageSource::parse("/definitely/not/here.html").unwrap_err();
        assert!(matches!(err, FeescopeError::SourceError(_)));
    }

    #[test]
    fn test_file_source_rereads() {
        let path = std::env::temp_dir().join(format!("feescope-fetch-{}.html", uuid::Uuid::new_v4()));
        std::fs::write(&path, "<p>one</p>").unwrap();
        let source = PageSource::parse(path.to_str().unwrap()).unwrap();
        assert_eq!(source.load().unwrap().html, "<p>one</p>");

        std::fs::write(&path, "<p>two</p>").unwrap();
        assert_eq!(source.load().unwrap().html, "<p>two</p>");
        assert!(source.default_site().starts_with("feescope-fetch-"));

        std::fs::remove_file(&path).unwrap();
        assert!(source.load().is_err());
    }
}
