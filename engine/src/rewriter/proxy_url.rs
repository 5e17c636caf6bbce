use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyUrlError {
    #[error("proxy URL must start with '/': {0:?}")]
    NotRooted(String),
    #[error("proxy URL is missing its {0} segment")]
    MissingSegment(&'static str),
    #[error("invalid width segment {0:?}")]
    InvalidWidth(String),
}

/// `/<proxy_id>/<width>/<source>`, the address handed to the image proxy.
///
/// The source is appended verbatim. Absolute sources are not stripped or
/// encoded, so `https://x/y.png` yields `/img/10/https://x/y.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrl {
    pub proxy_id: String,
    pub width: u32,
    pub source: String,
}

impl ProxyUrl {
    pub fn new(proxy_id: &str, width: u32, source: &str) -> Self {
        Self {
            proxy_id: proxy_id.to_string(),
            width,
            source: source.to_string(),
        }
    }

    /// The value for a `background-image` declaration. Unquoted.
    pub fn css_url(&self) -> String {
        format!("url({})", self)
    }

    /// Inverse of `Display`. The source is everything after the third slash,
    /// so sources containing slashes survive.
    pub fn parse(path: &str) -> Result<Self, ProxyUrlError> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| ProxyUrlError::NotRooted(path.to_string()))?;
        let mut segments = rest.splitn(3, '/');

        let proxy_id = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(ProxyUrlError::MissingSegment("proxy id"))?;
        let width = segments.next().ok_or(ProxyUrlError::MissingSegment("width"))?;
        let source = segments.next().ok_or(ProxyUrlError::MissingSegment("source"))?;

        Ok(Self {
            proxy_id: proxy_id.to_string(),
            width: parse_width(width)?,
            source: source.to_string(),
        })
    }
}

/// Widths are plain base-10 integers: no sign, no leading zeros.
fn parse_width(segment: &str) -> Result<u32, ProxyUrlError> {
    let invalid = || ProxyUrlError::InvalidWidth(segment.to_string());
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return Err(invalid());
    }
    segment.parse().map_err(|_| invalid())
}

impl fmt::Display for ProxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", self.proxy_id, self.width, self.source)
    }
}

impl FromStr for ProxyUrl {
    type Err = ProxyUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_path_and_css_value() {
        let url = ProxyUrl::new("img", 240, "photos/a.jpg");
        assert_eq!(url.to_string(), "/img/240/photos/a.jpg");
        assert_eq!(url.css_url(), "url(/img/240/photos/a.jpg)");
    }

    #[test]
    fn leading_slash_in_source_doubles() {
        assert_eq!(ProxyUrl::new("img", 0, "/hero.png").to_string(), "/img/0//hero.png");
    }

    #[test]
    fn parses_sources_with_slashes() {
        let url: ProxyUrl = "/img/10/https://cdn.example.com/a.png".parse().unwrap();
        assert_eq!(url, ProxyUrl::new("img", 10, "https://cdn.example.com/a.png"));
        assert_eq!(ProxyUrl::parse("/img/240/").unwrap().source, "");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(ProxyUrl::parse("img/1/a"), Err(ProxyUrlError::NotRooted("img/1/a".into())));
        assert_eq!(ProxyUrl::parse("//1/a"), Err(ProxyUrlError::MissingSegment("proxy id")));
        assert_eq!(ProxyUrl::parse("/img/12"), Err(ProxyUrlError::MissingSegment("source")));
        assert_eq!(ProxyUrl::parse("/img/012/a"), Err(ProxyUrlError::InvalidWidth("012".into())));
        assert_eq!(ProxyUrl::parse("/img/-1/a"), Err(ProxyUrlError::InvalidWidth("-1".into())));
        assert!(ProxyUrl::parse("/img/99999999999/a").is_err());
    }
}
