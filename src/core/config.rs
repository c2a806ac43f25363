//! Configuration file handling and session parameters
//!
//! The config file stores persistent defaults (model, sampling parameters,
//! history directory). [`ModelParameters`] is the in-session view: config
//! values merged over built-in defaults, then mutated by slash commands
//! without writing back to disk.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::builtin_models::{is_chat_model, CHAT_MODELS, DEFAULT_CHAT_MODEL};
use crate::core::store::DEFAULT_HISTORY_DIR;

pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_TEMPERATURE: f64 = 0.6;
pub const DEFAULT_TOP_P: f64 = 0.95;

pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 1024..=16384;
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=2.0;
pub const TOP_P_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn StdError>> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn StdError>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
            let config: Config =
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: config_path.to_path_buf(),
                    source,
                })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn StdError>> {
        self.save_to_path(&Self::config_path())
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<(), Box<dyn StdError>> {
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };

        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file
            .persist(config_path)
            .map_err(|err| -> Box<dyn StdError> { Box::new(err) })?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let proj_dirs =
            ProjectDirs::from("", "", "confab").expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Session parameters: configured values over built-in defaults.
    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p.unwrap_or(DEFAULT_TOP_P),
            web_search_enabled: self.web_search.unwrap_or(false),
        }
    }

    pub fn history_dir(&self) -> PathBuf {
        self.history_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_HISTORY_DIR.to_string())
            .into()
    }
}

/// Per-session request parameters.
///
/// `web_search_enabled` is tracked for the session but never serialized into
/// request bodies; the provider ignores it on the completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub web_search_enabled: bool,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            web_search_enabled: false,
        }
    }
}

/// A settable parameter name, shared by the in-session `/set` command and
/// the `set-default` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKey {
    Model,
    MaxTokens,
    Temperature,
    TopP,
}

impl ParameterKey {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "model" => Some(Self::Model),
            "max-tokens" | "max_tokens" => Some(Self::MaxTokens),
            "temperature" => Some(Self::Temperature),
            "top-p" | "top_p" => Some(Self::TopP),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::MaxTokens => "max-tokens",
            Self::Temperature => "temperature",
            Self::TopP => "top-p",
        }
    }
}

impl ModelParameters {
    /// Applies a textual value to one parameter, enforcing the same bounds
    /// the provider documents for each sampling knob.
    pub fn set(&mut self, key: ParameterKey, value: &str) -> Result<(), String> {
        match key {
            ParameterKey::Model => {
                if !is_chat_model(value) {
                    return Err(format!(
                        "unknown model '{}'; available: {}",
                        value,
                        CHAT_MODELS.join(", ")
                    ));
                }
                self.model = value.to_string();
            }
            ParameterKey::MaxTokens => {
                let parsed: u32 = value
                    .parse()
                    .map_err(|_| format!("max-tokens must be an integer, got '{value}'"))?;
                if !MAX_TOKENS_RANGE.contains(&parsed) {
                    return Err(format!(
                        "max-tokens must be between {} and {}",
                        MAX_TOKENS_RANGE.start(),
                        MAX_TOKENS_RANGE.end()
                    ));
                }
                self.max_tokens = parsed;
            }
            ParameterKey::Temperature => {
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| format!("temperature must be a number, got '{value}'"))?;
                if !TEMPERATURE_RANGE.contains(&parsed) {
                    return Err(format!(
                        "temperature must be between {} and {}",
                        TEMPERATURE_RANGE.start(),
                        TEMPERATURE_RANGE.end()
                    ));
                }
                self.temperature = parsed;
            }
            ParameterKey::TopP => {
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| format!("top-p must be a number, got '{value}'"))?;
                if !TOP_P_RANGE.contains(&parsed) {
                    return Err(format!(
                        "top-p must be between {} and {}",
                        TOP_P_RANGE.start(),
                        TOP_P_RANGE.end()
                    ));
                }
                self.top_p = parsed;
            }
        }
        Ok(())
    }
}

impl Config {
    /// Applies a textual value to one persisted default. Values are checked
    /// with the same rules as the in-session setter.
    pub fn set_default(&mut self, key: ParameterKey, value: &str) -> Result<(), String> {
        let mut probe = self.parameters();
        probe.set(key, value)?;
        match key {
            ParameterKey::Model => self.model = Some(probe.model),
            ParameterKey::MaxTokens => self.max_tokens = Some(probe.max_tokens),
            ParameterKey::Temperature => self.temperature = Some(probe.temperature),
            ParameterKey::TopP => self.top_p = Some(probe.top_p),
        }
        Ok(())
    }
}
