//! Application configuration management.
//!
//! Two layers live here:
//!
//! - `Config`, the persisted file at `<config dir>/config.json` holding the
//!   API URL, default organization, output format and debug flag;
//! - `Settings`, the value each invocation actually runs with, resolved once
//!   from command-line flags, the environment and `Config` (in that order of
//!   precedence) and then passed down unchanged.
//!
//! `<config dir>` is `~/.config/codeclarity` on Linux unless
//! `CODECLARITY_CONFIG_DIR` points elsewhere.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Application name used for the config directory path
pub const APP_NAME: &str = "codeclarity";

/// Config file name
pub const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_URL: &str = "https://localhost/api";

pub const DEFAULT_OUTPUT_FORMAT: &str = "table";

/// Bearer token override; takes precedence over stored credentials.
pub const ENV_API_KEY: &str = "CODECLARITY_API_KEY";
pub const ENV_API_URL: &str = "CODECLARITY_API_URL";
/// Set to `true` to skip TLS certificate verification.
pub const ENV_ALLOW_INSECURE: &str = "CODECLARITY_ALLOW_INSECURE";
pub const ENV_CONFIG_DIR: &str = "CODECLARITY_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown config key '{0}' (valid keys: api_base_url, default_org_id, output_format, debug)")]
    UnknownKey(String),

    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("Failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiBaseUrl,
    DefaultOrgId,
    OutputFormat,
    Debug,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::ApiBaseUrl,
        ConfigKey::DefaultOrgId,
        ConfigKey::OutputFormat,
        ConfigKey::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl => "api_base_url",
            ConfigKey::DefaultOrgId => "default_org_id",
            ConfigKey::OutputFormat => "output_format",
            ConfigKey::Debug => "debug",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "api_base_url" | "api-url" | "url" => Ok(ConfigKey::ApiBaseUrl),
            "default_org_id" | "org" | "org_id" => Ok(ConfigKey::DefaultOrgId),
            "output_format" | "output" | "format" => Ok(ConfigKey::OutputFormat),
            "debug" => Ok(ConfigKey::Debug),
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_org_id: Option<String>,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_url(),
            default_org_id: None,
            output_format: default_output_format(),
            debug: false,
        }
    }
}

impl Config {
    /// Load `config.json` from `dir`. A missing or empty file yields defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(io_err)?;
        let contents = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, contents).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        Ok(self.value(key.parse()?))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<ConfigKey, ConfigError> {
        let key: ConfigKey = key.parse()?;
        match key {
            ConfigKey::ApiBaseUrl => self.api_base_url = value.to_string(),
            ConfigKey::DefaultOrgId => {
                self.default_org_id = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            ConfigKey::OutputFormat => self.output_format = value.to_string(),
            ConfigKey::Debug => self.debug = parse_bool(value),
        }
        Ok(key)
    }

    pub fn value(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::ApiBaseUrl => self.api_base_url.clone(),
            ConfigKey::DefaultOrgId => self.default_org_id.clone().unwrap_or_default(),
            ConfigKey::OutputFormat => self.output_format.clone(),
            ConfigKey::Debug => self.debug.to_string(),
        }
    }

    /// Every key with its current value, in display order.
    pub fn entries(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::ALL
            .iter()
            .map(|key| (*key, self.value(*key)))
            .collect()
    }
}

/// The configuration directory, honoring `CODECLARITY_CONFIG_DIR`.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = non_empty_var(ENV_CONFIG_DIR) {
        return Ok(PathBuf::from(dir));
    }
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APP_NAME))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub org_id: Option<String>,
    pub output_format: Option<String>,
    pub debug: bool,
}

/// Values read from the process environment.
#[derive(Clone, Default)]
pub struct Environment {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub allow_insecure: bool,
}

impl Environment {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_var(ENV_API_KEY),
            api_url: non_empty_var(ENV_API_URL),
            allow_insecure: non_empty_var(ENV_ALLOW_INSECURE)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("allow_insecure", &self.allow_insecure)
            .finish()
    }
}

/// Resolved per-invocation settings. Built once, never mutated.
#[derive(Clone)]
pub struct Settings {
    pub base_url: String,
    pub org_id: Option<String>,
    pub output_format: String,
    pub debug: bool,
    pub api_key: Option<String>,
    pub allow_insecure: bool,
    pub config_dir: PathBuf,
}

impl Settings {
    /// Combine the layers: flag > environment > config file > default.
    pub fn resolve(flags: &Overrides, env: &Environment, config: &Config, config_dir: PathBuf) -> Self {
        fn pick(layers: &[Option<&str>]) -> Option<String> {
            layers
                .iter()
                .flatten()
                .find(|v| !v.is_empty())
                .map(|v| v.to_string())
        }

        let base_url = pick(&[
            flags.api_url.as_deref(),
            env.api_url.as_deref(),
            Some(config.api_base_url.as_str()),
        ])
        .unwrap_or_else(default_api_url);

        let org_id = pick(&[flags.org_id.as_deref(), config.default_org_id.as_deref()]);

        let output_format = pick(&[
            flags.output_format.as_deref(),
            Some(config.output_format.as_str()),
        ])
        .unwrap_or_else(default_output_format);

        Self {
            base_url,
            org_id,
            output_format,
            debug: flags.debug || config.debug,
            api_key: env.api_key.clone().filter(|k| !k.is_empty()),
            allow_insecure: env.allow_insecure,
            config_dir,
        }
    }

    /// Resolve against the real environment and the config file on disk.
    pub fn load(flags: &Overrides) -> Result<Self, ConfigError> {
        let dir = config_dir()?;
        let config = Config::load(&dir)?;
        Ok(Self::resolve(flags, &Environment::from_env(), &config, dir))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("org_id", &self.org_id)
            .field("output_format", &self.output_format)
            .field("debug", &self.debug)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("allow_insecure", &self.allow_insecure)
            .field("config_dir", &self.config_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_base_url, "https://localhost/api");
        assert_eq!(config.output_format, "table");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.default_org_id = Some("org-1".to_string());
        config.debug = true;
        config.save(dir.path()).unwrap();

        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        Config::default().save(dir.path()).unwrap();
        let mode = std::fs::metadata(dir.path().join(CONFIG_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"default_org_id":"org-9"}"#).unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_org_id.as_deref(), Some("org-9"));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_key_aliases() {
        let mut config = Config::default();
        for alias in ["api_base_url", "api-url", "url"] {
            config.set(alias, "https://cc.example.com/api").unwrap();
            assert_eq!(config.get("api_base_url").unwrap(), "https://cc.example.com/api");
        }
        for alias in ["default_org_id", "org", "org_id"] {
            assert_eq!(config.set(alias, "org-2").unwrap(), ConfigKey::DefaultOrgId);
        }
        assert_eq!(config.get("org").unwrap(), "org-2");

        config.set("format", "json").unwrap();
        assert_eq!(config.get("output").unwrap(), "json");

        config.set("debug", "1").unwrap();
        assert!(config.debug);
        config.set("debug", "no").unwrap();
        assert!(!config.debug);
        config.set("debug", "TRUE").unwrap();
        assert_eq!(config.get("debug").unwrap(), "true");
    }

    #[test]
    fn test_unknown_key() {
        let mut config = Config::default();
        assert!(matches!(config.get("colour"), Err(ConfigError::UnknownKey(k)) if k == "colour"));
        assert!(matches!(config.set("colour", "x"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn test_clearing_org() {
        let mut config = Config::default();
        config.set("org", "org-1").unwrap();
        config.set("org", "").unwrap();
        assert_eq!(config.default_org_id, None);
    }

    #[test]
    fn test_settings_precedence() {
        let config = Config {
            api_base_url: "https://file.example.com/api".to_string(),
            default_org_id: Some("org-file".to_string()),
            output_format: "json".to_string(),
            debug: false,
        };
        let env = Environment {
            api_key: Some("env-key".to_string()),
            api_url: Some("https://env.example.com/api".to_string()),
            allow_insecure: true,
        };

        let settings = Settings::resolve(&Overrides::default(), &env, &config, PathBuf::from("/tmp/cc"));
        assert_eq!(settings.base_url, "https://env.example.com/api");
        assert_eq!(settings.org_id.as_deref(), Some("org-file"));
        assert_eq!(settings.output_format, "json");
        assert_eq!(settings.api_key.as_deref(), Some("env-key"));
        assert!(settings.allow_insecure);
        assert!(!settings.debug);

        let flags = Overrides {
            api_url: Some("https://flag.example.com/api".to_string()),
            org_id: Some("org-flag".to_string()),
            output_format: Some("table".to_string()),
            debug: true,
        };
        let settings = Settings::resolve(&flags, &env, &config, PathBuf::from("/tmp/cc"));
        assert_eq!(settings.base_url, "https://flag.example.com/api");
        assert_eq!(settings.org_id.as_deref(), Some("org-flag"));
        assert_eq!(settings.output_format, "table");
        assert!(settings.debug);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::resolve(
            &Overrides::default(),
            &Environment::default(),
            &Config::default(),
            PathBuf::from("/tmp/cc"),
        );
        assert_eq!(settings.base_url, DEFAULT_API_URL);
        assert_eq!(settings.org_id, None);
        assert_eq!(settings.output_format, DEFAULT_OUTPUT_FORMAT);
        assert_eq!(settings.api_key, None);
        assert!(!settings.allow_insecure);
    }

    #[test]
    fn test_settings_debug_redacts_api_key() {
        let env = Environment {
            api_key: Some("secret-key".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(&Overrides::default(), &env, &Config::default(), PathBuf::new());
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }
}
