use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} contains a forbidden character: {value:?}")]
    ForbiddenCharacter { field: &'static str, value: String },
}

/// Settings for a rewrite pass, fixed for the lifetime of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriterConfig {
    /// First path segment of every generated URL.
    pub proxy_id: String,
    /// Class that marks an element as a rewrite candidate.
    pub marker_class: String,
    /// Attribute holding the original image source.
    pub source_attribute: String,
    /// Attribute holding the original background image source.
    pub background_attribute: String,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            proxy_id: "img".to_string(),
            marker_class: "proxied".to_string(),
            source_attribute: "data-src".to_string(),
            background_attribute: "data-bg".to_string(),
        }
    }
}

impl RewriterConfig {
    pub fn new(proxy_id: impl Into<String>, marker_class: impl Into<String>) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            marker_class: marker_class.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // A slash in the proxy id would shift the width segment.
        check("proxy_id", &self.proxy_id, |c| c.is_whitespace() || c == '/')?;
        check("marker_class", &self.marker_class, |c| c.is_whitespace() || c == '/')?;
        let bad_attribute_char =
            |c: char| c.is_whitespace() || matches!(c, '/' | '=' | '>' | '"' | '\'');
        check("source_attribute", &self.source_attribute, bad_attribute_char)?;
        check("background_attribute", &self.background_attribute, bad_attribute_char)?;
        Ok(())
    }
}

fn check(
    field: &'static str,
    value: &str,
    forbidden: impl Fn(char) -> bool,
) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    if value.chars().any(forbidden) {
        return Err(ConfigError::ForbiddenCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
