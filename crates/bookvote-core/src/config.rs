//! bookvote.toml configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, the `PORT`
//! and `ADMIN_PASSWORD` environment variables, then whatever the caller
//! applies on top (CLI flags).

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cookie::{DEFAULT_MAX_AGE_DAYS, VOTE_COOKIE};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ADMIN_PASSWORD: &str = "mypassword";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ENV_PORT: &str = "PORT";
pub const ENV_ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookvoteConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub storage: StorageConfig,
    pub voting: VotingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Upper bound on any request body, spreadsheet uploads included.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub covers_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            uploads_dir: PathBuf::from("uploads"),
            covers_dir: PathBuf::from("covers"),
            public_dir: PathBuf::from("public"),
        }
    }
}

impl StorageConfig {
    /// Path of the database file inside the data dir.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bookvote.redb")
    }

    /// Every directory that must exist before serving.
    pub fn directories(&self) -> [&Path; 4] {
        [
            &self.data_dir,
            &self.uploads_dir,
            &self.covers_dir,
            &self.public_dir,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    pub cookie_name: String,
    pub cookie_max_age_days: u64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            cookie_name: VOTE_COOKIE.to_string(),
            cookie_max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl BookvoteConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BookvoteConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise, then apply the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                info!(path = ?p, "loading config file");
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from environment lookups. Invalid values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PORT) {
            match raw.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!(value = %raw, error = %e, "invalid {ENV_PORT}, keeping {}", self.server.port),
            }
        }
        if let Some(password) = lookup(ENV_ADMIN_PASSWORD) {
            self.admin.password = password;
        }
    }

    pub fn uses_default_password(&self) -> bool {
        self.admin.password == DEFAULT_ADMIN_PASSWORD
    }
}
