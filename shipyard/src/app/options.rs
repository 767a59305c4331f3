//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::streams::StreamOptions;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Shared store configuration
    pub store: StoreOptions,

    /// Where filesystem submissions are looked up
    pub ingest: IngestOptions,

    /// API credentials
    pub auth: AuthOptions,

    /// CI webhook verification
    pub webhook: WebhookOptions,

    /// Log stream reads
    pub stream: StreamOptions,
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Which store backs queues, registries and logs
#[derive(Debug, Clone)]
pub enum StoreOptions {
    /// Redis / Valkey shared with the workers
    Redis { url: String },

    /// Process-local, for single-node runs
    Memory,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions::Redis {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Ingest directory options
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Base directory that submitted ingest paths are relative to
    pub base_dir: PathBuf,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/srv/shipyard/ingest"),
        }
    }
}

/// API authentication options
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Shared key accepted in the `x-api-key` header
    pub api_key: Option<SecretString>,
}

/// CI webhook options
#[derive(Debug, Clone, Default)]
pub struct WebhookOptions {
    /// HMAC secret; without one, webhooks use the normal API credentials
    pub secret: Option<SecretString>,

    /// Reject signatures whose timestamp is further than this from now
    pub max_skew: Option<Duration>,
}
