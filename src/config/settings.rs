//! Session settings structs, defaults and TOML persistence.
//!
//! `SessionConfig` doubles as the on-disk settings format and the payload of
//! the worker `init` command, so everything here implements `Serialize`,
//! `Deserialize`, `Default` and `Clone`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Configuration problems caught by [`SessionConfig::validate`] before any
/// engine or audio-source construction starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no keyword spec configured")]
    MissingKeyword,
    #[error("no context spec configured")]
    MissingContext,
    #[error("{field} sensitivity must be within [0, 1], got {value}")]
    InvalidSensitivity { field: &'static str, value: f32 },
}

// ---------------------------------------------------------------------------
// KeywordSpec
// ---------------------------------------------------------------------------

/// Wake-word model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordSpec {
    /// Label reported with every detection (e.g. `"hey hark"`).
    pub label: String,
    /// Path to the keyword model file.
    pub model_path: PathBuf,
    /// Detection sensitivity (0.0 – 1.0).  Higher values reduce misses at the
    /// cost of more false alarms.
    pub sensitivity: f32,
}

impl KeywordSpec {
    pub fn new(label: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            model_path: model_path.into(),
            sensitivity: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// ContextSpec
// ---------------------------------------------------------------------------

/// Intent-inference model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSpec {
    /// Path to the context model file.
    pub model_path: PathBuf,
    /// Inference sensitivity (0.0 – 1.0).
    pub sensitivity: f32,
    /// Wait for a chunk of silence before finalising an inference instead of
    /// finishing as soon as the grammar is satisfied.
    pub require_endpoint: bool,
}

impl ContextSpec {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            sensitivity: 0.5,
            require_endpoint: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level session configuration, serialised as `settings.toml` and sent
/// verbatim as the `init` command payload.
///
/// # Persistence
///
/// ```rust,no_run
/// use hark::config::SessionConfig;
///
/// // Load (returns Default when file is missing)
/// let config = SessionConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wake-word model.  Required for a session to open.
    pub keyword: Option<KeywordSpec>,
    /// Intent context model.  Required for a session to open.
    pub context: Option<ContextSpec>,
    /// Start listening immediately after init instead of paused.
    #[serde(default = "default_start")]
    pub start: bool,
}

fn default_start() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keyword: None,
            context: None,
            start: true,
        }
    }
}

impl SessionConfig {
    /// Checks everything a session cannot open without: both model specs
    /// present, both sensitivities in [0, 1].
    ///
    /// NaN sensitivities fail the range check and are rejected too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keyword = self.keyword.as_ref().ok_or(ConfigError::MissingKeyword)?;
        let context = self.context.as_ref().ok_or(ConfigError::MissingContext)?;
        check_sensitivity("keyword", keyword.sensitivity)?;
        check_sensitivity("context", context.sensitivity)?;
        Ok(())
    }

    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(SessionConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet — first-run
    /// detection used by the demo to seed a starter config.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

fn check_sensitivity(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidSensitivity { field, value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
