//! Configuration loading and validation.
//!
//! `config.toml` holds non-secret settings only; API keys come from the
//! `.env` file handled by [`crate::credentials`]. Every section has defaults,
//! so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::providers::openai::OPENAI_API_BASE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Hosted language-model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Geocoding collaborator settings.
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Backend persistence settings.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Language-model settings shared by the classifier and generator.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat-completions endpoint.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Temperature used when classifying a message.
    #[serde(default = "default_classify_temperature")]
    pub classify_temperature: f32,

    /// Temperature used when phrasing the next reply.
    #[serde(default = "default_reply_temperature")]
    pub reply_temperature: f32,

    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_llm_endpoint(),
            classify_temperature: default_classify_temperature(),
            reply_temperature: default_reply_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Geocoding API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// Geocoding endpoint.
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,

    /// Region bias (ccTLD code).
    #[serde(default = "default_region")]
    pub region: String,

    /// Language for formatted addresses.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            region: default_region(),
            language: default_language(),
        }
    }
}

/// Which backend implementation persists requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local SQLite database.
    #[default]
    Sqlite,
    /// Hosted PostgREST API.
    Rest,
}

/// Backend persistence settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Backend implementation.
    #[serde(default)]
    pub kind: BackendKind,

    /// SQLite URL. Defaults to `~/.artisan/artisan.db`.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Base URL of the hosted project (e.g. `https://xyz.supabase.co/`).
    #[serde(default)]
    pub rest_url: Option<String>,
}

// Default value functions for serde

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}
fn default_llm_endpoint() -> String {
    OPENAI_API_BASE.to_owned()
}
fn default_classify_temperature() -> f32 {
    0.3
}
fn default_reply_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    500
}
fn default_geocoding_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".to_owned()
}
fn default_region() -> String {
    "fr".to_owned()
}
fn default_language() -> String {
    "fr".to_owned()
}

/// Config file written by `artisan init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"[llm]
model = "gpt-4o-mini"
classify_temperature = 0.3
reply_temperature = 0.7

[geocoding]
region = "fr"
language = "fr"

[backend]
kind = "sqlite"
"#;

/// Load the configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Load the configuration, falling back to defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or parsed.
pub fn load_config_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Resolve the default config directory (`~/.artisan/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".artisan"))
}

/// Filesystem layout under the config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root directory (`~/.artisan`).
    pub root: PathBuf,
    /// `config.toml`.
    pub config_file: PathBuf,
    /// `.env` holding API keys.
    pub env_file: PathBuf,
    /// Rotated JSON logs.
    pub logs_dir: PathBuf,
    /// Default SQLite database file.
    pub database: PathBuf,
}

impl RuntimePaths {
    /// Derive the layout from a root directory.
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.toml"),
            env_file: root.join(".env"),
            logs_dir: root.join("logs"),
            database: root.join("artisan.db"),
            root,
        }
    }

    /// SQLite URL for the configured or default database.
    pub fn database_url(&self, backend: &BackendConfig) -> String {
        match &backend.database_url {
            Some(url) => url.clone(),
            None => format!("sqlite://{}?mode=rwc", self.database.display()),
        }
    }
}

/// Resolve the runtime paths under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::from_root(config_dir()?))
}
