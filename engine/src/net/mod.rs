pub mod cache;
pub mod image;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use cache::CachedProbe;
pub use image::{detect_from_magic_bytes, FileProbe, ImageType};

/// Settings for fetching remote documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of redirects to follow
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 5,
            user_agent: concat!("sizeproxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request for {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// A page's markup plus the directory its relative image paths resolve
/// against. Remote pages have no base directory.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub html: String,
    pub base_dir: Option<PathBuf>,
}

pub fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Loads `location` as a URL when it has an http(s) scheme, otherwise as a
/// filesystem path.
pub fn load_document(location: &str, config: &NetworkConfig) -> Result<LoadedDocument, LoadError> {
    if is_remote(location) {
        let html = fetch_html(location, config)?;
        return Ok(LoadedDocument { html, base_dir: None });
    }

    let path = Path::new(location);
    let html = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = html.len(), "read document");
    let base_dir = path.parent().map(|p| {
        if p.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            p.to_path_buf()
        }
    });
    Ok(LoadedDocument { html, base_dir })
}

fn fetch_html(url: &str, config: &NetworkConfig) -> Result<String, LoadError> {
    let http = |source: reqwest::Error| LoadError::Http {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(http)?;

    let response = client.get(url).send().map_err(http)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let html = response.text().map_err(http)?;
    tracing::debug!(%url, bytes = html.len(), "fetched document");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn recognises_remote_locations() {
        assert!(is_remote("https://example.com/"));
        assert!(is_remote("HTTP://example.com/"));
        assert!(!is_remote("pages/index.html"));
        assert!(!is_remote("/srv/http/index.html"));
    }

    #[test]
    fn loads_files_with_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "<p>hi</p>").unwrap();

        let doc = load_document(path.to_str().unwrap(), &NetworkConfig::default()).unwrap();
        assert_eq!(doc.html, "<p>hi</p>");
        assert_eq!(doc.base_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.html");
        let err = load_document(path.to_str().unwrap(), &NetworkConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
