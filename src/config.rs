// Configuration loading.
// Merges defaults, an optional TOML file, environment and command-line overrides.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache;
use crate::error::{Result, StatError};
use crate::github::Affiliation;

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GitHub login whose statistics are collected.
    #[serde(default)]
    pub login: Option<String>,

    /// Date the age line counts from.
    #[serde(default)]
    pub birthday: Option<NaiveDate>,

    /// Number of annotation lines at the top of the cache file.
    #[serde(default = "default_comment_size")]
    pub comment_size: usize,

    /// Directory holding the cache files.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// SVG templates rewritten in place.
    #[serde(default = "default_templates")]
    pub templates: Vec<PathBuf>,

    /// Affiliations whose repositories count toward lines of code.
    #[serde(default = "default_loc_affiliations")]
    pub loc_affiliations: Vec<Affiliation>,

    /// GraphQL endpoint override (GitHub Enterprise).
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_comment_size() -> usize {
    7
}

fn default_templates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("dark_mode.svg"),
        PathBuf::from("light_mode.svg"),
    ]
}

fn default_loc_affiliations() -> Vec<Affiliation> {
    Affiliation::ALL.to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login: None,
            birthday: None,
            comment_size: default_comment_size(),
            cache_dir: None,
            templates: default_templates(),
            loc_affiliations: default_loc_affiliations(),
            api_url: None,
        }
    }
}

/// Default config file location (~/.config/ghtally/config.toml on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ghtally").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StatError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else the default location if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from: {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// The login, which must be set by some layer.
    pub fn login(&self) -> Result<&str> {
        self.login
            .as_deref()
            .filter(|login| !login.trim().is_empty())
            .ok_or_else(|| {
                StatError::Config("no GitHub login (set --login, USER_NAME or `login`)".to_string())
            })
    }

    /// Cache directory, falling back to the platform cache dir and then `./cache`.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(cache::cache_dir)
            .unwrap_or_else(|| PathBuf::from("cache"))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.login()?;
        if self.loc_affiliations.is_empty() {
            return Err(StatError::Config(
                "loc_affiliations must name at least one affiliation".to_string(),
            ));
        }
        Ok(())
    }
}
