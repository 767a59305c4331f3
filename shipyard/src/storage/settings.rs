//! Settings file management
//!
//! Settings come from a JSON file with every field optional. A handful of
//! `SHIPYARD_*` environment variables override the file so secrets can stay
//! out of it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::app::options::{
    AppOptions, AuthOptions, IngestOptions, LifecycleOptions, ServerOptions, StoreOptions,
    WebhookOptions,
};
use crate::errors::ShipyardError;
use crate::filesys::file::File;
use crate::logs::{LogLevel, LogOptions};
use crate::streams::StreamOptions;

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/shipyard/settings.json";

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Shared store configuration
    #[serde(default)]
    pub store: StoreSettings,

    /// Base directory for filesystem submissions
    #[serde(default = "default_ingest_dir")]
    pub ingest_dir: PathBuf,

    /// Shared API key
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    /// CI webhook configuration
    #[serde(default)]
    pub webhook: WebhookSettings,

    /// Log tail tuning
    #[serde(default)]
    pub stream: StreamSettings,

    /// Seconds to wait for a graceful shutdown
    #[serde(default = "default_shutdown_delay")]
    pub max_shutdown_delay_secs: u64,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(non_empty_secret))
}

fn non_empty_secret(value: String) -> Option<SecretString> {
    Some(value)
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

fn default_ingest_dir() -> PathBuf {
    IngestOptions::default().base_dir
}

fn default_shutdown_delay() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            ingest_dir: default_ingest_dir(),
            api_key: None,
            webhook: WebhookSettings::default(),
            stream: StreamSettings::default(),
            max_shutdown_delay_secs: default_shutdown_delay(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Shared store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: default_redis_url(),
        }
    }
}

/// CI webhook settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookSettings {
    /// HMAC secret for signed deliveries
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub secret: Option<SecretString>,

    /// Allowed clock skew in seconds; unset accepts any timestamp
    #[serde(default)]
    pub max_skew_secs: Option<u64>,
}

/// Log tail settings
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
}

fn default_heartbeat() -> u64 {
    30
}

fn default_block_ms() -> u64 {
    2000
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat(),
            block_ms: default_block_ms(),
        }
    }
}

impl Settings {
    /// Read settings from `path`, falling back to defaults when it is absent
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ShipyardError> {
        let file = File::new(path.as_ref());
        if !file.exists().await {
            info!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json().await
    }

    /// Apply `SHIPYARD_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ShipyardError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ShipyardError> {
        if let Some(level) = var("SHIPYARD_LOG_LEVEL") {
            self.log_level = level.parse().map_err(ShipyardError::ConfigError)?;
        }
        if let Some(port) = var("SHIPYARD_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ShipyardError::ConfigError(format!("Invalid port: {}", port)))?;
        }
        if let Some(url) = var("SHIPYARD_REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Some(dir) = var("SHIPYARD_INGEST_DIR") {
            self.ingest_dir = PathBuf::from(dir);
        }
        // An empty value clears the secret rather than setting an empty one
        if let Some(key) = var("SHIPYARD_API_KEY") {
            self.api_key = non_empty_secret(key);
        }
        if let Some(secret) = var("SHIPYARD_WEBHOOK_SECRET") {
            self.webhook.secret = non_empty_secret(secret);
        }
        Ok(())
    }

    /// Logging configuration
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            json_format: self.log_json,
            ..Default::default()
        }
    }

    /// Runtime options for [`crate::app::run::run`]
    pub fn to_options(&self) -> AppOptions {
        let store = match self.store.backend {
            StoreBackend::Redis => StoreOptions::Redis {
                url: self.store.redis_url.clone(),
            },
            StoreBackend::Memory => StoreOptions::Memory,
        };

        AppOptions {
            lifecycle: LifecycleOptions {
                max_shutdown_delay: Duration::from_secs(self.max_shutdown_delay_secs),
            },
            server: ServerOptions {
                host: self.server.host.clone(),
                port: self.server.port,
            },
            store,
            ingest: IngestOptions {
                base_dir: self.ingest_dir.clone(),
            },
            auth: AuthOptions {
                api_key: self.api_key.clone(),
            },
            webhook: WebhookOptions {
                secret: self.webhook.secret.clone(),
                max_skew: self.webhook.max_skew_secs.map(Duration::from_secs),
            },
            // Zero would mean no heartbeat at all, or a read that never times out
            stream: StreamOptions {
                heartbeat: Duration::from_secs(self.stream.heartbeat_secs.max(1)),
                block: Duration::from_millis(self.stream.block_ms.max(1)),
                ..Default::default()
            },
        }
    }
}
