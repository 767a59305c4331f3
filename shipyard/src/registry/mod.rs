//! Channel and webhook mapping registries

use std::sync::Arc;

use tracing::debug;

use crate::errors::ShipyardError;
use crate::models::channel::{CdnChannel, Destinations, Record, SteamChannel};
use crate::models::mapping::WebhookMapping;
use crate::store::{keys, Store};

pub mod collection;

pub use collection::Collection;

/// A record type with a collection in the [`Registry`]
pub trait Registered: Record + 'static {
    fn collection(registry: &Registry) -> &Collection<Self>;
}

impl Registered for SteamChannel {
    fn collection(registry: &Registry) -> &Collection<Self> {
        &registry.steam
    }
}

impl Registered for CdnChannel {
    fn collection(registry: &Registry) -> &Collection<Self> {
        &registry.cdn
    }
}

impl Registered for WebhookMapping {
    fn collection(registry: &Registry) -> &Collection<Self> {
        &registry.mappings
    }
}

/// The three registry collections
#[derive(Clone)]
pub struct Registry {
    pub steam: Collection<SteamChannel>,
    pub cdn: Collection<CdnChannel>,
    pub mappings: Collection<WebhookMapping>,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            steam: Collection::new(store.clone(), keys::STEAM_CHANNELS),
            cdn: Collection::new(store.clone(), keys::CDN_CHANNELS),
            mappings: Collection::new(store, keys::WEBHOOK_MAPPINGS),
        }
    }

    /// Snapshot the channels named by the given labels
    ///
    /// Labels match exactly. Every unknown label produces one message, and
    /// any unknown label fails the whole resolution with a validation error.
    pub async fn resolve(
        &self,
        steam_labels: &[String],
        cdn_labels: &[String],
    ) -> Result<Destinations, ShipyardError> {
        let mut errors = Vec::new();

        let steam_channels = if steam_labels.is_empty() {
            Vec::new()
        } else {
            let all = self.steam.list().await?;
            pick(&all, steam_labels, |c| &c.label, "Steam", &mut errors)
        };

        let cdn_channels = if cdn_labels.is_empty() {
            Vec::new()
        } else {
            let all = self.cdn.list().await?;
            pick(&all, cdn_labels, |c| &c.label, "CDN", &mut errors)
        };

        if !errors.is_empty() {
            debug!("Channel resolution failed: {:?}", errors);
            return Err(ShipyardError::Validation(errors));
        }

        Ok(Destinations {
            steam_channels,
            cdn_channels,
        })
    }
}

fn pick<C: Clone>(
    all: &[C],
    labels: &[String],
    label_of: impl Fn(&C) -> &String,
    kind: &str,
    errors: &mut Vec<String>,
) -> Vec<C> {
    let mut picked = Vec::with_capacity(labels.len());
    for label in labels {
        match all.iter().find(|c| label_of(c) == label) {
            Some(channel) => picked.push(channel.clone()),
            None => errors.push(format!("{} channel with label \"{}\" not found", kind, label)),
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cdn(label: &str) -> CdnChannel {
        serde_json::from_value(serde_json::json!({
            "label": label,
            "bucketName": "builds",
            "region": "eu-west-1",
            "accessKeyId": "AKIA",
            "secretAccessKey": "shh"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_reports_every_unknown_label() {
        let registry = Registry::new(Arc::new(MemoryStore::new()));
        registry.cdn.create(cdn("Builds")).await.unwrap();

        let err = registry
            .resolve(&["Beta".to_string()], &["Builds".to_string(), "Nightly".to_string()])
            .await
            .unwrap_err();
        let ShipyardError::Validation(errors) = err else {
            panic!("unexpected error: {}", err);
        };
        assert_eq!(
            errors,
            vec![
                "Steam channel with label \"Beta\" not found".to_string(),
                "CDN channel with label \"Nightly\" not found".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_snapshots_in_label_order() {
        let registry = Registry::new(Arc::new(MemoryStore::new()));
        registry.cdn.create(cdn("A")).await.unwrap();
        registry.cdn.create(cdn("B")).await.unwrap();

        let destinations = registry
            .resolve(&[], &["B".to_string(), "A".to_string()])
            .await
            .unwrap();
        let labels: Vec<_> = destinations.cdn_channels.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(destinations.cdn_channels[0].secret_access_key, "shh");
    }
}
