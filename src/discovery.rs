use serde_json::Value;

use crate::adapter::{AdapterKind, DomainPolicy, make_adapter};
use crate::capability::{Capability, capabilities_of};
use crate::config::Config;
use crate::error::Result;
use crate::hub::{EntityState, HubClient, is_truthy};

/// Per-entity override attributes, checked before the hub's own fields.
pub const HIDDEN_OVERRIDE: &str = "alexa_hidden";
pub const NAME_OVERRIDE: &str = "alexa_name";
pub const DESCRIPTION_OVERRIDE: &str = "alexa_description";
pub const DISPLAY_CATEGORIES_OVERRIDE: &str = "alexa_display_categories";

/// One discoverable device, independent of the wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub entity_id: String,
    pub domain: String,
    pub friendly_name: String,
    pub description: String,
    pub kind: AdapterKind,
    pub capabilities: Vec<Capability>,
    pub display_categories: Option<Vec<String>>,
}

/// Never fails: a hub error yields an empty list and a log line.
pub async fn discover(hub: &HubClient, config: &Config) -> Vec<Descriptor> {
    match try_discover(hub, config).await {
        Ok(descriptors) => {
            tracing::info!(count = descriptors.len(), "discovery finished");
            descriptors
        }
        Err(error) => {
            tracing::error!(%error, "discovery failed, reporting no devices");
            Vec::new()
        }
    }
}

pub async fn try_discover(hub: &HubClient, config: &Config) -> Result<Vec<Descriptor>> {
    let states = hub.states().await?;
    Ok(states
        .iter()
        .filter_map(|state| describe(hub, config, state))
        .collect())
}

pub fn describe(hub: &HubClient, config: &Config, state: &EntityState) -> Option<Descriptor> {
    let domain = state.domain();
    if !config.is_domain_exposed(domain) {
        return None;
    }
    if is_hidden(state) {
        tracing::debug!(entity_id = %state.entity_id, "hidden from discovery");
        return None;
    }

    let adapter = match make_adapter(
        hub,
        &state.entity_id,
        state.supported_features(),
        DomainPolicy::Strict,
    ) {
        Ok(adapter) => adapter,
        Err(error) => {
            tracing::debug!(entity_id = %state.entity_id, %error, "skipping entity");
            return None;
        }
    };

    let capabilities = capabilities_of(&adapter);
    if capabilities.is_empty() {
        return None;
    }

    Some(Descriptor {
        entity_id: state.entity_id.clone(),
        domain: domain.to_string(),
        friendly_name: display_name(config, state),
        description: description(state),
        kind: adapter.kind(),
        capabilities,
        display_categories: display_categories(state),
    })
}

/// The device-specific override wins over the hub's own `hidden` flag.
pub fn is_hidden(state: &EntityState) -> bool {
    match state.attribute(HIDDEN_OVERRIDE) {
        Some(value) => is_truthy(value),
        None => state.attribute("hidden").map(is_truthy).unwrap_or(false),
    }
}

pub fn display_name(config: &Config, state: &EntityState) -> String {
    if let Some(name) = state.attribute_str(NAME_OVERRIDE) {
        return name.to_string();
    }

    let base = state.friendly_name().map(str::to_string).unwrap_or_else(|| {
        let object_id = state
            .entity_id
            .split_once('.')
            .map(|(_, id)| id)
            .unwrap_or(&state.entity_id);
        object_id.replace('_', " ")
    });

    match config.suffix_for(state.domain()) {
        Some(suffix) => format!("{} {}", base, suffix),
        None => base,
    }
}

pub fn description(state: &EntityState) -> String {
    if let Some(description) = state.attribute_str(DESCRIPTION_OVERRIDE) {
        return description.to_string();
    }
    format!("Home Assistant {}", title_case(state.domain()))
}

fn display_categories(state: &EntityState) -> Option<Vec<String>> {
    let categories: Vec<String> = match state.attribute(DISPLAY_CATEGORIES_OVERRIDE)? {
        Value::String(s) => s
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!categories.is_empty()).then_some(categories)
}

fn title_case(domain: &str) -> String {
    domain
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(entity_id: &str, attributes: Value) -> EntityState {
        serde_json::from_value(json!({
            "entity_id": entity_id,
            "state": "on",
            "attributes": attributes,
        }))
        .unwrap()
    }

    fn config(exposed: &[&str]) -> Config {
        let exposed: Vec<String> = exposed.iter().map(|d| d.to_string()).collect();
        format!(
            r#"{{"url": "http://127.0.0.1:9", "exposed_domains": {}}}"#,
            serde_json::to_string(&exposed).unwrap()
        )
        .parse()
        .unwrap()
    }

    #[test]
    fn hide_override_takes_precedence() {
        assert!(is_hidden(&state("light.a", json!({ "alexa_hidden": true }))));
        assert!(is_hidden(&state("light.a", json!({ "hidden": "true" }))));
        assert!(!is_hidden(&state(
            "light.a",
            json!({ "alexa_hidden": false, "hidden": true })
        )));
        assert!(!is_hidden(&state("light.a", json!({}))));
    }

    #[test]
    fn names_and_descriptions() {
        let config = config(&["scene", "light"]);

        let scene = state("scene.movie_night", json!({ "friendly_name": "Movie Night" }));
        assert_eq!(display_name(&config, &scene), "Movie Night Scene");
        assert_eq!(description(&scene), "Home Assistant Scene");

        let light = state("light.porch_lamp", json!({}));
        assert_eq!(display_name(&config, &light), "porch lamp");

        let renamed = state(
            "light.x",
            json!({ "alexa_name": "Reading Lamp", "alexa_description": "by the sofa" }),
        );
        assert_eq!(display_name(&config, &renamed), "Reading Lamp");
        assert_eq!(description(&renamed), "by the sofa");

        assert_eq!(title_case("media_player"), "Media Player");
    }

    #[test]
    fn describe_filters_by_domain_and_flags() {
        let config = config(&["light", "lock"]);
        let hub = HubClient::new(&config).unwrap();

        assert!(describe(&hub, &config, &state("switch.outlet", json!({}))).is_none());
        assert!(describe(&hub, &config, &state("sensor.temp", json!({}))).is_none());
        assert!(
            describe(&hub, &config, &state("lock.back", json!({ "alexa_hidden": "yes" })))
                .is_none()
        );

        let lock = describe(&hub, &config, &state("lock.front_door", json!({}))).unwrap();
        assert_eq!(lock.kind, AdapterKind::Lock);
        assert_eq!(lock.capabilities, vec![Capability::Lock]);

        let light = describe(
            &hub,
            &config,
            &state(
                "light.kitchen",
                json!({ "supported_features": 16, "alexa_display_categories": "LIGHT, OTHER" }),
            ),
        )
        .unwrap();
        assert!(light.capabilities.contains(&Capability::Color));
        assert_eq!(
            light.display_categories,
            Some(vec!["LIGHT".to_string(), "OTHER".to_string()])
        );
    }
}
