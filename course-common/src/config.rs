//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Every section is optional;
//! a missing file or missing keys fall back to compiled defaults so the
//! service can always start.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `COURSEGEN_ROOT_FOLDER`
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "COURSEGEN_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "coursegen.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the database and generated artifacts
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generative model provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Chapter generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Generative model provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (environment variable takes priority, see course-gen config)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Messages endpoint base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Client-side request rate limit
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Chapter generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on chapter runs executing at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Word-overlap ratio above which two sections are reported as redundant
    #[serde(default = "default_redundancy_threshold")]
    pub redundancy_threshold: f64,
}

fn default_port() -> u16 {
    5740
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_requests_per_minute() -> u32 {
    50
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_redundancy_threshold() -> f64 {
    0.5
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            redundancy_threshold: default_redundancy_threshold(),
        }
    }
}

/// Parse a TOML configuration file
///
/// Fails if the file cannot be read or is not valid TOML. Use
/// [`load_or_default`] when a missing file should not stop startup.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load configuration, falling back to defaults when the file is absent
///
/// A file that exists but does not parse is still an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No configuration file location available, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Configuration file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(path)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Write configuration atomically
///
/// Content is written to a temporary file in the target directory and then
/// renamed over the destination, so readers never see a half-written file.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

/// Default configuration file path for the platform
///
/// `<config dir>/coursegen/course-gen.toml`, e.g. `~/.config/coursegen/course-gen.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("coursegen").join("course-gen.toml"))
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("coursegen"))
        .unwrap_or_else(|| PathBuf::from("./coursegen_data"))
}

/// Create the root folder if it does not exist
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(())
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}
