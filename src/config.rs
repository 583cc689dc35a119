use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  /// Process-local cache, gone when the process exits
  Memory,
  /// SQLite database file
  #[default]
  Sqlite,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  #[serde(default)]
  pub backend: Backend,
  /// Database file (defaults to $XDG_DATA_HOME/apicache/cache.db)
  pub path: Option<PathBuf>,
}

impl StoreConfig {
  /// Database path, falling back to the platform data directory.
  pub fn resolved_path(&self) -> Result<PathBuf> {
    match &self.path {
      Some(path) => Ok(path.clone()),
      None => Ok(data_dir()?.join("cache.db")),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive, e.g. "info" or "apicache=debug" (RUST_LOG wins if set)
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for log files (defaults to $XDG_DATA_HOME/apicache/logs)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

impl LogConfig {
  pub fn resolved_dir(&self) -> Result<PathBuf> {
    match &self.dir {
      Some(dir) => Ok(dir.clone()),
      None => Ok(data_dir()?.join("logs")),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

/// Per-user data directory for this tool.
fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("apicache"))
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./apicache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/apicache/config.yaml
  ///
  /// With no file found the defaults are used.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("apicache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("apicache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.store.backend, Backend::Sqlite);
    assert!(config.store.path.is_none());
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_full_config() {
    let config = Config::parse(
      "store:\n  backend: memory\n  path: /tmp/x.db\nlog:\n  level: debug\n  dir: /tmp/logs\n",
    )
    .unwrap();
    assert_eq!(config.store.backend, Backend::Memory);
    assert_eq!(config.store.resolved_path().unwrap(), PathBuf::from("/tmp/x.db"));
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.resolved_dir().unwrap(), PathBuf::from("/tmp/logs"));
  }

  #[test]
  fn test_partial_log_section() {
    let config = Config::parse("log:\n  dir: /var/log/apicache\n").unwrap();
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_unknown_backend_rejected() {
    assert!(Config::parse("store:\n  backend: redis\n").is_err());
  }

  #[test]
  fn test_explicit_missing_file() {
    assert!(Config::load(Some(Path::new("/nonexistent/apicache.yaml"))).is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("apicache.yaml");
    std::fs::write(&path, "store:\n  backend: memory\n").unwrap();
    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.store.backend, Backend::Memory);
  }
}
