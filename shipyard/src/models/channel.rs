//! Upload destination channels

use serde::{Deserialize, Serialize};

use crate::models::string_or_number;

/// A registry record addressed by id, unique by a human-chosen key
pub trait Record: Serialize + serde::de::DeserializeOwned + Clone + Send + Sync {
    /// Human name of the record type, used in messages
    const KIND: &'static str;

    /// Human name of the unique key, used in messages
    const KEY_NAME: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// The externally addressable unique key
    fn key(&self) -> &str;

    /// Every violated field rule
    fn validate(&self) -> Vec<String>;
}

/// A Steam depot and the build-relative path uploaded into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depot {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub path: String,
}

/// Storefront (Steam) destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteamChannel {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub app_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default)]
    pub depots: Vec<Depot>,
}

impl Record for SteamChannel {
    const KIND: &'static str = "Steam channel";
    const KEY_NAME: &'static str = "label";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn key(&self) -> &str {
        &self.label
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.label.trim().is_empty() {
            errors.push("Label is required".to_string());
        }
        if self.app_id.trim().is_empty() {
            errors.push("App ID is required".to_string());
        }
        if self.depots.is_empty() {
            errors.push("At least one depot is required".to_string());
        }
        for (i, depot) in self.depots.iter().enumerate() {
            if depot.id.trim().is_empty() {
                errors.push(format!("Depot {} is missing an ID", i + 1));
            }
            if depot.path.trim().is_empty() {
                errors.push(format!("Depot {} is missing a path", i + 1));
            }
        }
        errors
    }
}

fn default_filename_format() -> String {
    "{project}-{platform}-{date}".to_string()
}

/// Object storage / CDN destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnChannel {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub bucket_name: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    /// Custom S3-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Key prefix inside the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default = "default_filename_format")]
    pub filename_format: String,

    #[serde(default)]
    pub is_public: bool,
}

impl Record for CdnChannel {
    const KIND: &'static str = "CDN channel";
    const KEY_NAME: &'static str = "label";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn key(&self) -> &str {
        &self.label
    }

    fn validate(&self) -> Vec<String> {
        let required = [
            ("Label", &self.label),
            ("Bucket name", &self.bucket_name),
            ("Region", &self.region),
            ("Access key ID", &self.access_key_id),
            ("Secret access key", &self.secret_access_key),
            ("Filename format", &self.filename_format),
        ];
        required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| format!("{} is required", name))
            .collect()
    }
}

/// Channels resolved for a job, fixed at creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    #[serde(default)]
    pub steam_channels: Vec<SteamChannel>,

    #[serde(default)]
    pub cdn_channels: Vec<CdnChannel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steam_channel_accepts_numeric_ids() {
        let channel: SteamChannel = serde_json::from_value(serde_json::json!({
            "label": "Beta",
            "appId": 480,
            "branch": "beta",
            "depots": [{ "id": 481, "path": "." }]
        }))
        .unwrap();
        assert_eq!(channel.app_id, "480");
        assert_eq!(channel.depots[0].id, "481");
        assert!(channel.validate().is_empty());
    }

    #[test]
    fn test_steam_channel_validation_lists_every_problem() {
        let channel = SteamChannel {
            id: String::new(),
            label: " ".to_string(),
            app_id: String::new(),
            branch: None,
            depots: vec![],
        };
        assert_eq!(channel.validate().len(), 3);
    }

    #[test]
    fn test_cdn_channel_wire_names() {
        let channel: CdnChannel = serde_json::from_value(serde_json::json!({
            "label": "Builds",
            "bucketName": "builds",
            "region": "eu-west-1",
            "accessKeyId": "AKIA",
            "secretAccessKey": "shh",
            "isPublic": true
        }))
        .unwrap();
        assert!(channel.is_public);
        assert_eq!(channel.filename_format, "{project}-{platform}-{date}");
        assert!(channel.validate().is_empty());

        let json = serde_json::to_value(&channel).unwrap();
        assert_eq!(json["bucketName"], "builds");
        assert!(json.get("endpoint").is_none());
    }

    #[test]
    fn test_cdn_channel_requires_credentials() {
        let channel: CdnChannel =
            serde_json::from_value(serde_json::json!({ "label": "Builds" })).unwrap();
        let errors = channel.validate();
        assert!(errors.contains(&"Access key ID is required".to_string()));
        assert!(errors.contains(&"Secret access key is required".to_string()));
    }
}
