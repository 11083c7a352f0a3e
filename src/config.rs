//! Runner configuration.
//!
//! Loaded from TOML, every section defaulted, with a small set of
//! environment overrides applied on top. Secrets never live here; see
//! [`crate::credentials`].

use std::path::{Path, PathBuf};

use aeo_search::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunnerError};

/// Top-level configuration for the workflow runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Output and workflow-definition locations.
    pub paths: PathsConfig,
    /// Product catalogue API.
    pub subject: SubjectConfig,
    /// Answer engines, SerpAPI and fan-out width.
    pub search: SearchConfig,
    /// Translation model used by the localization workflow.
    pub translation: TranslationConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8015,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory CSV artifacts are written to. Created on demand.
    pub output_dir: PathBuf,
    /// Directory of `<flow_id>.json` workflow definitions. When unset, the
    /// catalog is empty and run creation does not check it.
    pub workflow_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            workflow_dir: None,
        }
    }
}

/// Product catalogue (Trustana) API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    /// Scheme and authority of the API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.trustana.com".to_owned(),
            timeout_seconds: 30,
        }
    }
}

/// Translation model settings (OpenAI Responses API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Scheme and authority of the API.
    pub base_url: String,
    /// Reasoning model used for translation.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_owned(),
            model: "gpt-5.1".to_owned(),
            timeout_seconds: 180,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RunnerError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RunnerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/aeo-runner/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("aeo-runner").join("config.toml")
        } else if let Some(dir) = dirs::config_dir() {
            dir.join("aeo-runner").join("config.toml")
        } else {
            PathBuf::from("/tmp/aeo-runner-config/config.toml")
        }
    }

    /// Apply `OUTPUT_DIR`, `WORKFLOW_DIR` and `AEO_RUNNER_PORT` from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if `AEO_RUNNER_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if the port value is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("WORKFLOW_DIR") {
            self.paths.workflow_dir = Some(PathBuf::from(dir));
        }
        if let Some(port) = get("AEO_RUNNER_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| RunnerError::Config(format!("AEO_RUNNER_PORT {port:?}: {e}")))?;
        }
        Ok(())
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.search
            .validate()
            .map_err(|e| RunnerError::Config(e.to_string()))?;
        if self.subject.timeout_seconds == 0 {
            return Err(RunnerError::Config(
                "subject timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.translation.timeout_seconds == 0 {
            return Err(RunnerError::Config(
                "translation timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.translation.model.trim().is_empty() {
            return Err(RunnerError::Config(
                "translation model must not be empty".into(),
            ));
        }
        Ok(())
    }
}
