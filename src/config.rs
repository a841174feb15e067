use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::branches::types::{DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};

const DEFAULT_BASE_URL: &str = "https://fyle-challenge-backend.herokuapp.com/api";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub listing: ListingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Root of the branch API; `/branches` is appended to it
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Per-request timeout. Unset means the transport default.
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// In-process only, gone when the app exits
  #[default]
  Memory,
  /// SQLite file in the data directory
  Sqlite,
  /// No caching at all
  None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: CacheBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Choices offered by the city picker (lowercase values are sent as `q`)
  #[serde(default = "default_cities")]
  pub cities: Vec<String>,
}

impl Default for ListingConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      cities: default_cities(),
    }
  }
}

fn default_page_size() -> u32 {
  DEFAULT_PAGE_SIZE
}

fn default_cities() -> Vec<String> {
  ["alwar", "jaipur", "mumbai", "delhi", "kolkata"]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./branches.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/branches-tui/config.yaml
  ///
  /// Falls back to defaults when no file exists. `BRANCHES_API_URL`
  /// overrides the API base URL either way.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        tracing::debug!("no config file found, using defaults");
        Config::default()
      }
    };

    if let Ok(url) = std::env::var("BRANCHES_API_URL") {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("branches.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("branches-tui").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if !PAGE_SIZE_OPTIONS.contains(&self.listing.page_size) {
      return Err(eyre!(
        "listing.page_size must be one of {:?}, got {}",
        PAGE_SIZE_OPTIONS,
        self.listing.page_size
      ));
    }
    if self.api.timeout_secs == Some(0) {
      return Err(eyre!("api.timeout_secs must be positive"));
    }
    Ok(())
  }
}
