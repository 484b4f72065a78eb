use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::exchange::{DetailLevel, ExchangeSettings, Tone};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Status of config file loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoadStatus {
    /// Config loaded successfully from existing file
    Loaded,
    /// Created default config file (first run)
    Created,
    /// Error occurred during loading, using defaults
    Error(String),
}

impl ConfigLoadStatus {
    /// Short text for the status bar.
    pub fn summary(&self) -> String {
        match self {
            ConfigLoadStatus::Loaded => "loaded".to_string(),
            ConfigLoadStatus::Created => "created".to_string(),
            ConfigLoadStatus::Error(e) => format!("defaults ({})", e),
        }
    }
}

/// Text-generation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Optional key stored in the file. `ANTHROPIC_API_KEY` wins when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            key: None,
        }
    }
}

/// Initial form selections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub tone: Tone,
    pub detail: DetailLevel,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Replace zero limits with their defaults.
    pub fn normalize(&mut self) {
        if self.api.max_tokens == 0 {
            self.api.max_tokens = DEFAULT_MAX_TOKENS;
        }
        if self.api.timeout_secs == 0 {
            self.api.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
    }

    /// The credential to send, if any non-blank one is configured.
    pub fn api_key(&self) -> Option<String> {
        self.api
            .key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn exchange_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            model: self.api.model.clone(),
            max_tokens: self.api.max_tokens,
        }
    }
}

/// Loaded configuration with metadata
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_path: PathBuf,
    pub status: ConfigLoadStatus,
}

/// Get the platform-appropriate config directory
fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "golden", "golden").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the full path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load configuration from file, environment, and defaults
pub fn load_config() -> LoadedConfig {
    let config_path = match get_config_path() {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return LoadedConfig {
                config: apply_env_overrides(Config::default()),
                config_path: PathBuf::from("config.toml"),
                status: ConfigLoadStatus::Error("Could not determine config directory".to_string()),
            };
        }
    };

    debug!("Config path: {:?}", config_path);

    let (config, status) = load_or_create_config(&config_path);
    let config = apply_env_overrides(config);

    LoadedConfig {
        config,
        config_path,
        status,
    }
}

/// Load config from file, or create default if not exists
fn load_or_create_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    match fs::read_to_string(config_path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(mut config) => {
                config.normalize();
                info!("Loaded config from {:?}", config_path);
                (config, ConfigLoadStatus::Loaded)
            }
            Err(e) => {
                warn!(
                    "Config file malformed at {:?}: {}. Using defaults.",
                    config_path, e
                );
                (
                    Config::default(),
                    ConfigLoadStatus::Error(format!("Malformed TOML: {}", e.message())),
                )
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => create_default_config(config_path),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                "Permission denied reading config at {:?}. Using defaults.",
                config_path
            );
            (
                Config::default(),
                ConfigLoadStatus::Error("Permission denied reading config".to_string()),
            )
        }
        Err(e) => {
            warn!(
                "Error reading config at {:?}: {}. Using defaults.",
                config_path, e
            );
            (
                Config::default(),
                ConfigLoadStatus::Error(format!("Read error: {}", e)),
            )
        }
    }
}

/// Create the default config file
fn create_default_config(config_path: &Path) -> (Config, ConfigLoadStatus) {
    let config = Config::default();

    if let Some(parent) = config_path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!(
            "Could not create config directory {:?}: {}. Continuing without file.",
            parent, e
        );
        return (
            config,
            ConfigLoadStatus::Error(format!("Could not create config directory: {}", e)),
        );
    }

    let toml_content = match toml::to_string_pretty(&config) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not serialize default config: {}", e);
            return (
                config,
                ConfigLoadStatus::Error(format!("Serialization error: {}", e)),
            );
        }
    };

    match fs::write(config_path, &toml_content) {
        Ok(()) => {
            info!("Created default config at {:?}", config_path);
            (config, ConfigLoadStatus::Created)
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(
                "Permission denied creating config at {:?}. Continuing without file.",
                config_path
            );
            (
                config,
                ConfigLoadStatus::Error("Permission denied creating config".to_string()),
            )
        }
        Err(e) => {
            warn!(
                "Could not write default config to {:?}: {}. Continuing without file.",
                config_path, e
            );
            (
                config,
                ConfigLoadStatus::Error(format!("Write error: {}", e)),
            )
        }
    }
}

/// Apply environment variable overrides to config
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |name| env::var(name).ok())
}

/// Apply overrides from the given variable lookup.
fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()) {
        debug!("Overriding api.key from ANTHROPIC_API_KEY");
        config.api.key = Some(key);
    }

    if let Some(url) = lookup("GOLDEN_BASE_URL") {
        debug!("Overriding api.base_url from GOLDEN_BASE_URL");
        config.api.base_url = url;
    }

    if let Some(model) = lookup("GOLDEN_MODEL") {
        debug!("Overriding api.model from GOLDEN_MODEL");
        config.api.model = model;
    }

    if let Some(level) = lookup("GOLDEN_LOG") {
        debug!("Overriding logging.level from GOLDEN_LOG");
        config.logging.level = level;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://api.anthropic.com/v1");
        assert_eq!(config.api.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.api.max_tokens, 2000);
        assert_eq!(config.api.timeout_secs, 60);
        assert!(config.api.key.is_none());
        assert_eq!(config.defaults.tone, Tone::Professional);
        assert_eq!(config.defaults.detail, DetailLevel::Balanced);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[api]
base_url = "http://localhost:8080/v1"
model = "claude-test"
max_tokens = 1500
timeout_secs = 30

[defaults]
tone = "academic"
detail = "detailed"

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.api.model, "claude-test");
        assert_eq!(config.api.max_tokens, 1500);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.defaults.tone, Tone::Academic);
        assert_eq!(config.defaults.detail, DetailLevel::Detailed);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
[defaults]
tone = "creative"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.defaults.tone, Tone::Creative);
        assert_eq!(config.defaults.detail, DetailLevel::Balanced);
        assert_eq!(config.api.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let toml_str = r#"
[api]
model = "claude-test"
unknown_key = "should be ignored"

[unknown_section]
foo = "bar"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.model, "claude-test");
    }

    #[test]
    fn test_invalid_tone_rejected() {
        let toml_str = r#"
[defaults]
tone = "sarcastic"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_normalize_zero_limits() {
        let mut config: Config = toml::from_str(
            r#"
[api]
max_tokens = 0
timeout_secs = 0
"#,
        )
        .unwrap();
        config.normalize();
        assert_eq!(config.api.max_tokens, 2000);
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn test_api_key_blank_is_none() {
        let mut config = Config::default();
        config.api.key = Some("   ".to_string());
        assert!(config.api_key().is_none());

        config.api.key = Some(" sk-test \n".to_string());
        assert_eq!(config.api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_default_config_omits_key_when_serialized() {
        let toml_content = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(!toml_content.contains("key ="));
        assert!(toml_content.contains("max_tokens = 2000"));
        assert!(toml_content.contains(r#"tone = "professional""#));
    }

    #[test]
    fn test_exchange_settings_from_config() {
        let settings = Config::default().exchange_settings();
        assert_eq!(settings.model, "claude-3-5-sonnet-20241022");
        assert_eq!(settings.max_tokens, 2000);
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ANTHROPIC_API_KEY", "sk-env"),
            ("GOLDEN_MODEL", "claude-env"),
            ("GOLDEN_BASE_URL", "http://proxy/v1"),
            ("GOLDEN_LOG", "trace"),
        ]);
        let mut config = Config::default();
        config.api.key = Some("sk-file".to_string());

        let config = apply_overrides(config, |name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.api_key().as_deref(), Some("sk-env"));
        assert_eq!(config.api.model, "claude-env");
        assert_eq!(config.api.base_url, "http://proxy/v1");
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_apply_overrides_blank_env_key_keeps_file_key() {
        let mut config = Config::default();
        config.api.key = Some("sk-file".to_string());

        let config = apply_overrides(config, |name| {
            (name == "ANTHROPIC_API_KEY").then(String::new)
        });
        assert_eq!(config.api_key().as_deref(), Some("sk-file"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let (config, status) = load_or_create_config(&path);
        assert_eq!(status, ConfigLoadStatus::Created);
        assert_eq!(config.api.max_tokens, 2000);
        assert!(path.exists());

        let (_, status) = load_or_create_config(&path);
        assert_eq!(status, ConfigLoadStatus::Loaded);
    }

    #[test]
    fn test_load_malformed_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api\nmodel = ").unwrap();

        let (config, status) = load_or_create_config(&path);
        assert!(matches!(status, ConfigLoadStatus::Error(ref e) if e.starts_with("Malformed TOML")));
        assert_eq!(config.api.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_load_existing_file_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\ntimeout_secs = 0\n").unwrap();

        let (config, status) = load_or_create_config(&path);
        assert_eq!(status, ConfigLoadStatus::Loaded);
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn test_status_summary() {
        assert_eq!(ConfigLoadStatus::Loaded.summary(), "loaded");
        assert_eq!(
            ConfigLoadStatus::Error("bad".to_string()).summary(),
            "defaults (bad)"
        );
    }
}
