//! Deployment configuration for Chart Notes
//!
//! Layers built-in defaults, an optional YAML/TOML/JSON file and
//! `CHARTNOTES_*` environment variables, and decides once at startup which
//! storage backend to use.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix, e.g. `CHARTNOTES_SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "CHARTNOTES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file backing the local embedded store
    pub data_file: PathBuf,
}

/// Remote relational store reached over its REST interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_points_table")]
    pub points_table: String,
    #[serde(default = "default_settings_table")]
    pub settings_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Quiescence window before a settings change is persisted
    pub debounce_ms: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_points_table() -> String {
    "data_points".to_string()
}

fn default_settings_table() -> String {
    "chart_settings".to_string()
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
            points_table: default_points_table(),
            settings_table: default_settings_table(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
            },
            storage: StorageConfig {
                data_file: PathBuf::from("data.json"),
            },
            remote: None,
            settings: SettingsConfig { debounce_ms: 500 },
        }
    }
}

/// Storage backend chosen for this deployment
#[derive(Debug, Clone, PartialEq)]
pub enum BackendKind {
    Local { data_file: PathBuf },
    Remote(RemoteConfig),
}

impl AppConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.apply_remote_env(
            std::env::var("SUPABASE_URL").ok(),
            std::env::var("SUPABASE_ANON_KEY").ok(),
        );
        Ok(config)
    }

    /// Fill the remote section from the conventional `SUPABASE_*` variables
    /// unless it is already configured.
    pub fn apply_remote_env(&mut self, url: Option<String>, api_key: Option<String>) {
        if self.remote.as_ref().is_some_and(RemoteConfig::is_complete) {
            return;
        }
        if let (Some(url), Some(api_key)) = (url, api_key) {
            self.remote = Some(RemoteConfig::new(url, api_key));
        }
    }

    /// Remote when fully configured, local otherwise. Decided once; failures
    /// of the chosen backend never fall back to the other.
    pub fn backend_kind(&self) -> BackendKind {
        match &self.remote {
            Some(remote) if remote.is_complete() => BackendKind::Remote(remote.clone()),
            Some(_) => {
                log::warn!("remote store configuration is incomplete, using the local store");
                self.local_kind()
            }
            None => self.local_kind(),
        }
    }

    fn local_kind(&self) -> BackendKind {
        BackendKind::Local {
            data_file: self.storage.data_file.clone(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_select_local_backend() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
        assert_eq!(config.settings.debounce_ms, 500);
        assert_eq!(
            config.backend_kind(),
            BackendKind::Local {
                data_file: PathBuf::from("data.json")
            }
        );
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "server:\n  port: 8088\nremote:\n  url: https://db.example.com\n  api_key: secret\n"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        match config.backend_kind() {
            BackendKind::Remote(remote) => {
                assert_eq!(remote.url, "https://db.example.com");
                assert_eq!(remote.points_table, "data_points");
                assert_eq!(remote.timeout_secs, 10);
            }
            other => panic!("expected remote backend, got {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_remote_falls_back_to_local_at_startup() {
        let mut config = AppConfig::default();
        config.remote = Some(RemoteConfig::new("https://db.example.com", " "));
        assert!(matches!(config.backend_kind(), BackendKind::Local { .. }));
    }

    #[test]
    fn test_remote_env() {
        let mut config = AppConfig::default();
        config.apply_remote_env(Some("https://x.supabase.co".into()), None);
        assert!(config.remote.is_none());

        config.apply_remote_env(Some("https://x.supabase.co".into()), Some("anon".into()));
        assert_eq!(
            config.remote,
            Some(RemoteConfig::new("https://x.supabase.co", "anon"))
        );
    }

    #[test]
    fn test_round_trips_through_yaml() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
