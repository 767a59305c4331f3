//! Application state management

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::info;

use crate::app::options::{AppOptions, StoreOptions};
use crate::authn::Authenticator;
use crate::errors::ShipyardError;
use crate::filesys::dir::Dir;
use crate::intake::Gateway;
use crate::queue::ledger::WorkerLedger;
use crate::queue::QueueStore;
use crate::registry::Registry;
use crate::store::{MemoryStore, RedisStore, Store};
use crate::streams::LogStreams;
use crate::webhooks::{WebhookIntake, WebhookVerifier};

/// Main application state
///
/// Every component is a thin handle over the shared store, so cloning them
/// is cheap and they carry no state of their own.
pub struct AppState {
    /// Shared store
    pub store: Arc<dyn Store>,

    /// Lifecycle queues
    pub queues: QueueStore,

    /// Channel and webhook mapping registries
    pub registry: Registry,

    /// Filesystem job intake
    pub gateway: Gateway,

    /// CI webhook intake
    pub webhooks: WebhookIntake,

    /// Signature check for CI webhooks, when a secret is configured
    pub verifier: Option<WebhookVerifier>,

    /// Job log streams
    pub streams: LogStreams,

    /// Worker-side transitions, for in-process workers
    pub ledger: WorkerLedger,

    /// API credential check
    pub auth: Authenticator,
}

impl AppState {
    /// Connect the configured store and build the components on it
    pub async fn init(options: &AppOptions) -> Result<Self, ShipyardError> {
        info!("Initializing application state...");

        let store: Arc<dyn Store> = match &options.store {
            StoreOptions::Redis { url } => Arc::new(RedisStore::connect(url).await?),
            StoreOptions::Memory => {
                info!("Using in-process store; state is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(store, options))
    }

    /// Build the components on an existing store
    pub fn with_store(store: Arc<dyn Store>, options: &AppOptions) -> Self {
        let queues = QueueStore::new(store.clone());
        let registry = Registry::new(store.clone());
        let gateway = Gateway::new(
            registry.clone(),
            queues.clone(),
            Dir::new(options.ingest.base_dir.clone()),
        );
        let webhooks = WebhookIntake::new(registry.clone(), gateway.clone());
        let verifier = options
            .webhook
            .secret
            .clone()
            .filter(|secret| !secret.expose_secret().is_empty())
            .map(|secret| WebhookVerifier::new(secret, options.webhook.max_skew));

        Self {
            queues,
            registry,
            gateway,
            webhooks,
            verifier,
            streams: LogStreams::new(store.clone(), options.stream.clone()),
            ledger: WorkerLedger::new(store.clone()),
            auth: Authenticator::new(store.clone(), options.auth.api_key.clone()),
            store,
        }
    }

    /// Shutdown application state
    ///
    /// Ends open log tails so the HTTP server can drain its connections.
    pub async fn shutdown(&self) -> Result<(), ShipyardError> {
        info!("Shutting down application state...");
        self.streams.close();
        Ok(())
    }
}
