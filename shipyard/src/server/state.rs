//! Server state

use crate::app::state::AppState;
use crate::authn::Authenticator;
use crate::intake::Gateway;
use crate::queue::QueueStore;
use crate::registry::Registry;
use crate::streams::LogStreams;
use crate::webhooks::{WebhookIntake, WebhookVerifier};

/// Server state shared across handlers
pub struct ServerState {
    pub queues: QueueStore,
    pub registry: Registry,
    pub gateway: Gateway,
    pub webhooks: WebhookIntake,
    pub verifier: Option<WebhookVerifier>,
    pub streams: LogStreams,
    pub auth: Authenticator,
}

impl ServerState {
    pub fn new(app_state: &AppState) -> Self {
        Self {
            queues: app_state.queues.clone(),
            registry: app_state.registry.clone(),
            gateway: app_state.gateway.clone(),
            webhooks: app_state.webhooks.clone(),
            verifier: app_state.verifier.clone(),
            streams: app_state.streams.clone(),
            auth: app_state.auth.clone(),
        }
    }
}
