use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::PLAIN_TEXT_LANGUAGE_ID;

/// Settings read from `~/.tmbridge/config.toml`. Every field is optional in
/// the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directories whose children are extensions.
    pub extension_dirs: Vec<PathBuf>,
    /// Active color theme, by id or label.
    pub color_theme: Option<String>,
    pub log_level: String,
    /// Language id reported when no language claims an extension.
    pub plain_text_language: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            extension_dirs: default_extension_dirs(),
            color_theme: None,
            log_level: "info".to_string(),
            plain_text_language: PLAIN_TEXT_LANGUAGE_ID.to_string(),
        }
    }
}

fn default_extension_dirs() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| vec![home.join(".vscode").join("extensions")])
        .unwrap_or_default()
}

/// `~/.tmbridge/config.toml`, or `None` when there is no home directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tmbridge").join("config.toml"))
}

/// Load config from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(BridgeConfig::default());
        }
        Err(source) => {
            return Err(BridgeError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&content).map_err(|e| BridgeError::Config {
        message: format!("{}: {e}", path.display()),
    })
}
