//! CI build notifications turned into jobs

use serde_json::Value;
use tracing::info;

use crate::errors::ShipyardError;
use crate::intake::Gateway;
use crate::models::job::{Job, JobSource, NewJob};
use crate::models::mapping::WebhookMapping;
use crate::registry::Registry;

/// Routes a verified webhook payload through its mapping into the queue
#[derive(Clone)]
pub struct WebhookIntake {
    registry: Registry,
    gateway: Gateway,
}

impl WebhookIntake {
    pub fn new(registry: Registry, gateway: Gateway) -> Self {
        Self { registry, gateway }
    }

    /// Enqueue a job for the build target named in `payload`
    pub async fn accept(&self, payload: Value) -> Result<Job, ShipyardError> {
        let target = payload
            .get("buildTargetName")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ShipyardError::invalid("Missing buildTargetName in webhook payload"))?
            .to_string();

        let mapping = self
            .registry
            .mappings
            .find_by_key(&target)
            .await?
            .ok_or_else(|| {
                ShipyardError::NotFound(format!("No webhook mapping for build target \"{}\"", target))
            })?;

        info!("Webhook for build target {} matched mapping {}", target, mapping.id);
        let new = job_from_mapping(&mapping, &target, payload);
        self.gateway.enqueue(JobSource::CiWebhook, new).await
    }
}

fn job_from_mapping(mapping: &WebhookMapping, target: &str, payload: Value) -> NewJob {
    let description = Some(render_template(&mapping.description_template, &payload))
        .filter(|d| !d.trim().is_empty());
    let platform = mapping
        .platform
        .clone()
        .filter(|p| !p.trim().is_empty())
        .or_else(|| {
            payload
                .get("platform")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| target.to_string());

    NewJob {
        project: mapping.project.clone(),
        description,
        platform,
        ingest_path: None,
        absolute_ingest_path: None,
        steam_channel_labels: mapping.steam_channel_labels.clone(),
        cdn_channel_labels: mapping.cdn_channel_labels.clone(),
        metadata: payload,
    }
}

/// Replace `{field}` with the payload's top-level scalar of that name
///
/// Unknown fields and non-scalar values leave the placeholder as written.
pub fn render_template(template: &str, payload: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let field = &after[..close];
        match payload.get(field).and_then(scalar) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_template() {
        let payload = json!({
            "buildNumber": 42,
            "buildTargetName": "iOS",
            "links": { "self": "x" }
        });
        assert_eq!(
            render_template("{buildTargetName} build #{buildNumber}", &payload),
            "iOS build #42"
        );
        assert_eq!(render_template("{links} {missing}", &payload), "{links} {missing}");
        assert_eq!(render_template("open { brace", &payload), "open { brace");
        assert_eq!(render_template("", &payload), "");
    }

    #[test]
    fn test_platform_fallbacks() {
        let mapping: WebhookMapping = serde_json::from_value(json!({
            "buildTargetName": "iOS",
            "project": "Demo",
            "cdn_channel_labels": ["Builds"]
        }))
        .unwrap();

        let new = job_from_mapping(&mapping, "iOS", json!({ "platform": "ios" }));
        assert_eq!(new.platform, "ios");
        assert!(new.description.is_none());

        let new = job_from_mapping(&mapping, "iOS", json!({}));
        assert_eq!(new.platform, "iOS");
        assert_eq!(new.metadata, json!({}));
        assert!(new.ingest_path.is_none());
    }
}
