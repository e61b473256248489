//! Console configuration, stored as JSON in the user's config directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_MAX_LINES;
use crate::history::DEFAULT_HISTORY_SIZE;
use crate::style::{Rgb, StyleTag};
use crate::theme::{Theme, ThemeName};
use crate::tool::Tool;

pub const CONFIG_FILENAME: &str = "console.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid color for `{tag}`: {value}")]
    InvalidColor { tag: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub max_lines: usize,
    pub history_size: usize,
    pub syntax_highlight_input: bool,
    pub theme: ThemeName,
    /// Per-tag color overrides, `"stdout": "#00ffff"`.
    pub colors: BTreeMap<String, String>,
    pub script_language: String,
    pub start_directory: Option<PathBuf>,
    pub tools: Vec<Tool>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            history_size: DEFAULT_HISTORY_SIZE,
            syntax_highlight_input: true,
            theme: ThemeName::default(),
            colors: BTreeMap::new(),
            script_language: "lua".to_string(),
            start_directory: None,
            tools: Vec::new(),
        }
    }
}

impl ConsoleConfig {
    /// `<config dir>/conch/console.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "conch")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Loads from the default location. Missing file or unknown config
    /// directory means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("no config directory; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ConsoleConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.color_overrides()?;
        tracing::info!(path = %path.display(), tools = config.tools.len(), "config loaded");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(io_err)
    }

    /// Parsed `colors`, rejecting unknown tags and malformed hex.
    pub fn color_overrides(&self) -> Result<BTreeMap<StyleTag, Rgb>, ConfigError> {
        self.colors
            .iter()
            .map(|(tag, value)| {
                let invalid = || ConfigError::InvalidColor {
                    tag: tag.clone(),
                    value: value.clone(),
                };
                let tag = StyleTag::from_name(tag).ok_or_else(invalid)?;
                let color = Rgb::from_hex(value).ok_or_else(invalid)?;
                Ok((tag, color))
            })
            .collect()
    }

    /// The configured theme with valid overrides applied. Invalid entries
    /// are logged and skipped.
    pub fn theme(&self) -> Theme {
        let mut theme = Theme::new(self.theme);
        for (tag, value) in &self.colors {
            match (StyleTag::from_name(tag), Rgb::from_hex(value)) {
                (Some(tag), Some(color)) => theme.set_override(tag, color),
                _ => tracing::warn!(%tag, %value, "ignoring invalid color override"),
            }
        }
        theme
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }
}
