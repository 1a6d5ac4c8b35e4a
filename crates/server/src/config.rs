// crates/server/src/config.rs
//! Server configuration.
//!
//! Precedence, lowest first: built-in defaults, `facts.toml`, `FACTS_*`
//! environment variables (plus `PORT`), command-line flags.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use facts_core::llm::{DEFAULT_GENERATION_TIMEOUT, DEFAULT_GENERATOR_COMMAND};
use facts_core::{Language, PipelineConfig, DEFAULT_CHUNK_SIZE};

pub const DEFAULT_PORT: u16 = 5000;
pub const CONFIG_FILE_NAME: &str = "facts.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub downloads_root: PathBuf,
    pub data_root: PathBuf,
    pub analysis_root: PathBuf,
    /// Daily-rolling log files go here when set; stderr only otherwise.
    pub log_dir: Option<PathBuf>,
    pub locale: Language,
    pub chunk_size: usize,
    pub generator_command: String,
    pub generator_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            downloads_root: PathBuf::from("downloads"),
            data_root: PathBuf::from("data"),
            analysis_root: PathBuf::from("analysis"),
            log_dir: None,
            locale: Language::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            generator_command: DEFAULT_GENERATOR_COMMAND.to_string(),
            generator_timeout_secs: DEFAULT_GENERATION_TIMEOUT.as_secs(),
        }
    }
}

/// Command-line flags. Every flag overrides the matching config key.
#[derive(Debug, Default, Parser)]
#[command(name = "facts", version, about = "Grounded answer extraction from PDF collections")]
pub struct Cli {
    /// Config file (default: ./facts.toml, then <config dir>/facts/facts.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long, short)]
    pub port: Option<u16>,
    #[arg(long)]
    pub downloads_root: Option<PathBuf>,
    #[arg(long)]
    pub data_root: Option<PathBuf>,
    #[arg(long)]
    pub analysis_root: Option<PathBuf>,
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// `en` or `de`
    #[arg(long)]
    pub locale: Option<Language>,
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// e.g. "ollama run llama3.1p"
    #[arg(long)]
    pub generator_command: Option<String>,
    #[arg(long)]
    pub generator_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Resolve the full configuration for a parsed command line.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match config_file_path(cli.config.as_deref()) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Apply `FACTS_*` overrides read through `get`. `PORT` is honored when
    /// `FACTS_PORT` is unset.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = get("FACTS_PORT").or_else(|| get("PORT")) {
            self.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = get("FACTS_HOST") {
            self.host = v;
        }
        if let Some(v) = get("FACTS_DOWNLOADS_ROOT") {
            self.downloads_root = PathBuf::from(v);
        }
        if let Some(v) = get("FACTS_DATA_ROOT") {
            self.data_root = PathBuf::from(v);
        }
        if let Some(v) = get("FACTS_ANALYSIS_ROOT") {
            self.analysis_root = PathBuf::from(v);
        }
        if let Some(v) = get("FACTS_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("FACTS_LOCALE") {
            self.locale = parse_value("FACTS_LOCALE", &v)?;
        }
        if let Some(v) = get("FACTS_CHUNK_SIZE") {
            self.chunk_size = parse_value("FACTS_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("FACTS_GENERATOR_COMMAND") {
            self.generator_command = v;
        }
        if let Some(v) = get("FACTS_GENERATOR_TIMEOUT_SECS") {
            self.generator_timeout_secs = parse_value("FACTS_GENERATOR_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(v) = &cli.host {
            self.host = v.clone();
        }
        if let Some(v) = cli.port {
            self.port = v;
        }
        if let Some(v) = &cli.downloads_root {
            self.downloads_root = v.clone();
        }
        if let Some(v) = &cli.data_root {
            self.data_root = v.clone();
        }
        if let Some(v) = &cli.analysis_root {
            self.analysis_root = v.clone();
        }
        if let Some(v) = &cli.log_dir {
            self.log_dir = Some(v.clone());
        }
        if let Some(v) = cli.locale {
            self.locale = v;
        }
        if let Some(v) = cli.chunk_size {
            self.chunk_size = v;
        }
        if let Some(v) = &cli.generator_command {
            self.generator_command = v.clone();
        }
        if let Some(v) = cli.generator_timeout_secs {
            self.generator_timeout_secs = v;
        }
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            language: self.locale,
            chunk_size: self.chunk_size.max(1),
            generator_timeout_secs: self.generator_timeout_secs,
        }
    }
}

/// Explicit path if given, else `./facts.toml`, else the per-user config
/// directory. `None` when no file exists.
fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|d| d.join("facts").join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
