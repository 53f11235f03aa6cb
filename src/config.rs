use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub odpt_token: Option<String>,
    pub odpt_base_url: String,
    pub odpt_operator: String,
    pub westjr_base_url: String,
    pub westjr_area: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub fare_cache_ttl_secs: u64,
    pub bind: String,
    /// Guild id to the webhook that receives delay notifications.
    pub delay_channels: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odpt_token: None,
            odpt_base_url: "https://api.odpt.org/api/v4".to_owned(),
            odpt_operator: "odpt.Operator:TokyoMetro".to_owned(),
            westjr_base_url: "https://www.train-guide.westjr.co.jp".to_owned(),
            westjr_area: "area_kinki_master".to_owned(),
            request_timeout_secs: 30,
            poll_interval_secs: 60,
            fare_cache_ttl_secs: 3600,
            bind: "0.0.0.0:8080".to_owned(),
            delay_channels: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("metro-bot");
        path.push("config.json");
        path
    }

    /// Reads the file at `path`, falling back to defaults when it doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config found at {path:?}, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Applies `ODPT_TOKEN` and `METRO_BOT_BIND` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("ODPT_TOKEN") {
            self.odpt_token = Some(token);
        }
        if let Ok(bind) = std::env::var("METRO_BOT_BIND") {
            self.bind = bind;
        }
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_owned(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Points delay notifications for `guild` at `webhook` and persists the change.
    pub fn set_delay_channel<P: AsRef<Path>>(
        &mut self,
        path: P,
        guild: &str,
        webhook: &str,
    ) -> Result<(), ConfigError> {
        self.delay_channels
            .insert(guild.to_owned(), webhook.to_owned());
        self.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("metro-bot-test-{}-{name}", std::process::id()));
        path.push("config.json");
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(scratch_path("missing")).unwrap();
        assert_eq!(config.poll_interval_secs, 60);
        assert!(config.delay_channels.is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = scratch_path("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"odpt_token": "abc", "poll_interval_secs": 120}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.odpt_token.as_deref(), Some("abc"));
        assert_eq!(config.poll_interval_secs, 120);
        assert_eq!(config.odpt_operator, "odpt.Operator:TokyoMetro");

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn delay_channel_is_persisted() {
        let path = scratch_path("channel");
        let mut config = Config::default();
        config
            .set_delay_channel(&path, "1234", "https://example.invalid/hook")
            .unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(
            reloaded.delay_channels.get("1234").map(String::as_str),
            Some("https://example.invalid/hook")
        );

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn invalid_file_is_an_error() {
        let path = scratch_path("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
