use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Create the `user1`..`user15` demo accounts on startup. Default: false.
    #[serde(default)]
    pub seed_dev_users: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens. Default: 168 (7 days).
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    168
}

/// Where uploaded bytes live and how large they may be.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory. Attachments and profile images get their own subdirectories.
    pub upload_path: PathBuf,
    /// Maximum attachment size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_attachment_size")]
    pub max_attachment_size: u64,
    /// Maximum decoded profile image size in bytes. Default: 2 MiB.
    #[serde(default = "default_max_profile_image_size")]
    pub max_profile_image_size: u64,
}

fn default_max_attachment_size() -> u64 {
    10 * 1024 * 1024
}
fn default_max_profile_image_size() -> u64 {
    2 * 1024 * 1024
}

impl StorageConfig {
    pub fn attachments_path(&self) -> PathBuf {
        self.upload_path.join("attachments")
    }

    pub fn profile_images_path(&self) -> PathBuf {
        self.upload_path.join("profile")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_path: PathBuf::from("./uploads"),
            max_attachment_size: default_max_attachment_size(),
            max_profile_image_size: default_max_profile_image_size(),
        }
    }
}

/// Orphaned attachment reclamation.
///
/// Disabled unless explicitly turned on; there is no implied cadence.
#[derive(Debug, Deserialize, Clone)]
pub struct ReclaimConfig {
    /// Whether the background sweep runs. Default: false.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps. Default: 3600.
    #[serde(default = "default_reclaim_interval_secs")]
    pub interval_secs: u64,
    /// Minimum age in seconds of an unbound attachment before it is removed. Default: 3600.
    #[serde(default = "default_reclaim_retention_secs")]
    pub retention_secs: u64,
}

fn default_reclaim_interval_secs() -> u64 {
    3600
}
fn default_reclaim_retention_secs() -> u64 {
    3600
}

impl ReclaimConfig {
    /// Longest accepted retention window, roughly a century.
    pub const MAX_RETENTION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Message(
                "reclaim.interval_secs must be at least 1".into(),
            ));
        }
        if self.retention_secs > Self::MAX_RETENTION_SECS {
            return Err(ConfigError::Message(format!(
                "reclaim.retention_secs must not exceed {}",
                Self::MAX_RETENTION_SECS
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_secs.min(Self::MAX_RETENTION_SECS) as i64)
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_reclaim_interval_secs(),
            retention_secs: default_reclaim_retention_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reclaim: ReclaimConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.upload_path", "./uploads")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FORUM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("FORUM").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.reclaim.validate()?;
        Ok(config)
    }
}
