//! Webhook routing table entries

use serde::{Deserialize, Serialize};

use crate::models::channel::Record;

/// Routes a CI build target to a project and its upload channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMapping {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub build_target_name: String,

    #[serde(default)]
    pub project: String,

    /// `{field}` placeholders are filled from the webhook payload
    #[serde(default)]
    pub description_template: String,

    /// Falls back to the payload's `platform`, then the build target name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, rename = "steam_channel_labels")]
    pub steam_channel_labels: Vec<String>,

    #[serde(default, rename = "cdn_channel_labels")]
    pub cdn_channel_labels: Vec<String>,
}

impl Record for WebhookMapping {
    const KIND: &'static str = "Webhook mapping";
    const KEY_NAME: &'static str = "build target name";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn key(&self) -> &str {
        &self.build_target_name
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.build_target_name.trim().is_empty() {
            errors.push("Build target name is required".to_string());
        }
        if self.project.trim().is_empty() {
            errors.push("Project is required".to_string());
        }
        if self.steam_channel_labels.is_empty() && self.cdn_channel_labels.is_empty() {
            errors.push("At least one Steam or CDN channel is required".to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_wire_names() {
        let mapping: WebhookMapping = serde_json::from_value(serde_json::json!({
            "buildTargetName": "android-release",
            "project": "Demo",
            "descriptionTemplate": "Build #{buildNumber}",
            "cdn_channel_labels": ["Builds"]
        }))
        .unwrap();
        assert_eq!(mapping.key(), "android-release");
        assert!(mapping.validate().is_empty());
    }

    #[test]
    fn test_mapping_requires_a_channel() {
        let mapping: WebhookMapping = serde_json::from_value(serde_json::json!({
            "buildTargetName": "ios",
            "project": "Demo"
        }))
        .unwrap();
        assert_eq!(
            mapping.validate(),
            vec!["At least one Steam or CDN channel is required".to_string()]
        );
    }
}
