//! Model Catalogue Builder: synthesizes the model list from configuration,
//! no upstream call involved.

use serde::Serialize;

use crate::config::GatewaySettings;

const CREATED_TIMESTAMP: i64 = 1_686_935_002;

#[derive(Debug, Serialize, PartialEq)]
pub struct ModelEntry {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelEntry>,
}

/// `provider_type → owned_by`; anything unlisted maps to itself.
fn owned_by_for(provider_type: &str) -> String {
    match provider_type {
        "openai" => "openai",
        "azure" => "openai-internal",
        "qwen" => "alibaba",
        "moonshot" => "moonshot",
        "claude" => "anthropic",
        "gemini" => "google",
        other => return other.to_string(),
    }
    .to_string()
}

/// Iterate `model_mapping`, skipping the wildcard key `"*"`, prefix-pattern keys
/// (a `"*"` suffix), and entries whose mapped value is empty.
pub fn build_catalogue(settings: &GatewaySettings) -> ModelList {
    let owned_by = owned_by_for(&settings.provider.provider_type);
    let mut data: Vec<ModelEntry> = settings
        .provider
        .model_mapping
        .iter()
        .filter(|(key, value)| *key != "*" && !key.ends_with('*') && !value.is_empty())
        .map(|(key, _)| ModelEntry {
            id: key.clone(),
            object: "model",
            created: CREATED_TIMESTAMP,
            owned_by: owned_by.clone(),
        })
        .collect();
    data.sort_by(|a, b| a.id.cmp(&b.id));
    ModelList {
        object: "list",
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn skips_wildcard_prefix_and_empty_entries() {
        let mut settings = GatewaySettings::default();
        settings.provider.provider_type = "qwen".to_string();
        settings.provider.model_mapping = HashMap::from([
            ("gpt-4".to_string(), "qwen-max".to_string()),
            ("gpt-4-*".to_string(), "qwen-max".to_string()),
            ("*".to_string(), "qwen-turbo".to_string()),
            ("dead".to_string(), String::new()),
        ]);

        let catalogue = build_catalogue(&settings);
        assert_eq!(catalogue.object, "list");
        assert_eq!(
            catalogue.data,
            vec![ModelEntry {
                id: "gpt-4".to_string(),
                object: "model",
                created: CREATED_TIMESTAMP,
                owned_by: "alibaba".to_string(),
            }]
        );
    }

    #[test]
    fn data_is_empty_array_never_null_when_nothing_survives() {
        let mut settings = GatewaySettings::default();
        settings.provider.model_mapping =
            HashMap::from([("*".to_string(), "qwen-turbo".to_string())]);
        let catalogue = build_catalogue(&settings);
        assert!(catalogue.data.is_empty());
    }

    #[test]
    fn owned_by_falls_back_to_provider_type_string() {
        assert_eq!(owned_by_for("openai"), "openai");
        assert_eq!(owned_by_for("azure"), "openai-internal");
        assert_eq!(owned_by_for("mystery-vendor"), "mystery-vendor");
    }
}
