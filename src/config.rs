use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sitedesk::cache::DataSource;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Back-office API. Required unless `data_source` is `offline`.
  pub api: Option<ApiConfig>,
  #[serde(default)]
  pub data_source: DataSource,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a fetched collection is served without asking the API again
  #[serde(default = "default_freshness_secs")]
  pub freshness_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      freshness_secs: default_freshness_secs(),
    }
  }
}

impl CacheConfig {
  pub fn freshness(&self) -> Duration {
    Duration::from_secs(self.freshness_secs)
  }
}

fn default_freshness_secs() -> u64 {
  300
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  /// SQLite file; defaults to $XDG_DATA_HOME/sitedesk/store.db
  pub path: Option<PathBuf>,
  /// Largest single value the store accepts, in bytes
  pub quota_bytes: Option<usize>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sitedesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sitedesk/config.yaml
  ///
  /// With no file anywhere, runs offline on defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config {
        data_source: DataSource::Offline,
        ..Config::default()
      },
    };
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sitedesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sitedesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    if self.data_source != DataSource::Offline && self.api.is_none() {
      return Err(eyre!(
        "data_source '{:?}' needs an `api.url`; set one or use `data_source: offline`",
        self.data_source
      ));
    }
    Ok(())
  }

  /// Session cookie for the API, from SITEDESK_SESSION_ID.
  pub fn session_id() -> Option<String> {
    std::env::var("SITEDESK_SESSION_ID")
      .ok()
      .filter(|id| !id.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_full_config() {
    let config = Config::parse(
      r#"
api:
  url: https://erp.example.ci
  timeout_secs: 10
data_source: remote_with_local
cache:
  freshness_secs: 60
store:
  path: /tmp/sitedesk.db
  quota_bytes: 5242880
"#,
    )
    .unwrap();

    let api = config.api.as_ref().unwrap();
    assert_eq!(api.url, "https://erp.example.ci");
    assert_eq!(api.timeout(), Duration::from_secs(10));
    assert_eq!(config.data_source, DataSource::RemoteWithLocal);
    assert_eq!(config.cache.freshness(), Duration::from_secs(60));
    assert_eq!(config.store.quota_bytes, Some(5_242_880));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_defaults() {
    let config = Config::parse("api:\n  url: http://localhost:8000\n").unwrap();
    assert_eq!(config.data_source, DataSource::Remote);
    assert_eq!(config.api.unwrap().timeout_secs, 30);
    assert_eq!(config.cache.freshness_secs, 300);
    assert!(config.store.path.is_none());
  }

  #[test]
  fn test_remote_without_api_is_rejected() {
    let config = Config::parse("data_source: remote\n").unwrap();
    assert!(config.validate().is_err());

    let offline = Config::parse("data_source: offline\n").unwrap();
    assert!(offline.validate().is_ok());
  }

  #[test]
  fn test_missing_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sitedesk.yaml");
    std::fs::write(&path, "data_source: offline\ncache:\n  freshness_secs: 5\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.data_source, DataSource::Offline);
    assert_eq!(config.cache.freshness_secs, 5);
  }
}
