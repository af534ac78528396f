//! Configuration management for ytclip

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub tools: ToolsConfig,
    pub media: MediaConfig,
    /// Remote storage relay; absent disables the uploading stage
    pub relay: Option<RelayConfig>,
    /// Metadata catalog; absent disables the saving stage
    pub catalog: Option<CatalogConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Host used when building public download links (falls back to the
    /// request's Host header, then to localhost)
    pub public_host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp binary (auto-detected if not set)
    pub yt_dlp: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory where extracted artifacts are written
    pub dir: PathBuf,
    /// Seconds a finished or failed job stays queryable before eviction
    pub retention_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Storage service base URL
    pub url: String,
    /// Service key used for both the apikey and bearer headers
    pub key: String,
    /// Target bucket name
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Row API base URL
    pub url: String,
    /// Service key
    pub key: String,
    /// Table holding recording records
    #[serde(default = "default_catalog_table")]
    pub table: String,
}

fn default_catalog_table() -> String {
    "recordings".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9899,
                public_host: None,
            },
            tools: ToolsConfig { yt_dlp: None },
            media: MediaConfig {
                dir: PathBuf::from("media"),
                retention_secs: 300,
            },
            relay: None,
            catalog: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(config_dir) = dirs::config_dir() {
            let default_config = config_dir.join("ytclip/config.toml");
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment, e.g. YTCLIP_SERVER__PORT=8080
        figment = figment.merge(Env::prefixed("YTCLIP_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Get yt-dlp path, auto-detecting if not configured
    pub fn yt_dlp_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.tools.yt_dlp {
            Ok(path.clone())
        } else {
            which::which("yt-dlp")
                .map_err(|_| ConfigError::InvalidValue("yt-dlp not found in PATH".to_string()))
        }
    }

    /// How long terminal jobs stay queryable before eviction
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.media.retention_secs)
    }
}
