use crate::layout::LayoutConfig;
use crate::net::NetworkConfig;
use crate::rewriter::{ConfigError, RewriterConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// `[layout]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutSection {
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self { viewport_width: 1280 }
    }
}

impl LayoutSection {
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            viewport_width: self.viewport_width as f32,
        }
    }
}

/// Contents of `sizeproxy.toml`. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizeproxyConfig {
    pub rewriter: RewriterConfig,
    pub layout: LayoutSection,
    pub network: NetworkConfig,
}

impl SizeproxyConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rewriter.validate()
    }
}
