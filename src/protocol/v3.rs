//! `Alexa.<Capability>Controller` directive/endpoint generation.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use super::{
    Header, Operation, Protocol, Reply, hsb_at, new_message_id, number_at, str_at, thermostat_mode,
};
use crate::adapter::{
    AdapterKind, COLOR_TEMPERATURE_STEP, DomainPolicy, LockState, StateSnapshot,
};
use crate::capability::Capability;
use crate::convert::{Hsb, Temperature, TemperatureUnit};
use crate::discovery::Descriptor;
use crate::error::{Error, Result};

pub const PAYLOAD_VERSION: &str = "3";
const MANUFACTURER: &str = "Home Assistant";
const UNCERTAINTY_MS: u64 = 500;

pub struct V3Protocol;

pub static V3: V3Protocol = V3Protocol;

/// `light.kitchen` becomes `light#kitchen`; `.` is not allowed in endpoint ids.
pub fn endpoint_id(entity_id: &str) -> String {
    entity_id.replacen('.', "#", 1)
}

pub fn entity_id_from_endpoint(endpoint_id: &str) -> String {
    endpoint_id.replacen('#', ".", 1)
}

impl Protocol for V3Protocol {
    fn version(&self) -> &'static str {
        PAYLOAD_VERSION
    }

    fn domain_policy(&self) -> DomainPolicy {
        DomainPolicy::Strict
    }

    fn header(&self, raw: &Value) -> Header {
        let endpoint_id = str_at(raw, "/directive/endpoint/endpointId");
        let entity_id = str_at(raw, "/directive/endpoint/cookie/entity_id")
            .or_else(|| endpoint_id.as_deref().map(entity_id_from_endpoint));

        Header {
            namespace: str_at(raw, "/directive/header/namespace").unwrap_or_default(),
            name: str_at(raw, "/directive/header/name").unwrap_or_default(),
            message_id: str_at(raw, "/directive/header/messageId"),
            correlation_token: str_at(raw, "/directive/header/correlationToken"),
            endpoint_id,
            entity_id,
        }
    }

    fn operation(&self, header: &Header, raw: &Value) -> Result<Operation> {
        let operation = match (header.namespace.as_str(), header.name.as_str()) {
            ("Alexa.Discovery", "Discover") => Operation::Discover,
            ("Alexa.Authorization", "AcceptGrant") => Operation::AcceptGrant,
            ("Alexa", "ReportState") => Operation::ReportState,
            ("Alexa.PowerController", "TurnOn") => Operation::TurnOn,
            ("Alexa.PowerController", "TurnOff") => Operation::TurnOff,
            ("Alexa.BrightnessController", "SetBrightness") => {
                Operation::SetPercentage(number_at(raw, "/directive/payload/brightness")?)
            }
            ("Alexa.BrightnessController", "AdjustBrightness") => {
                Operation::AdjustPercentage(number_at(raw, "/directive/payload/brightnessDelta")?)
            }
            ("Alexa.PercentageController", "SetPercentage") => {
                Operation::SetPercentage(number_at(raw, "/directive/payload/percentage")?)
            }
            ("Alexa.PercentageController", "AdjustPercentage") => {
                Operation::AdjustPercentage(number_at(raw, "/directive/payload/percentageDelta")?)
            }
            ("Alexa.ColorController", "SetColor") => {
                Operation::SetColor(hsb_at(raw, "/directive/payload/color")?)
            }
            ("Alexa.ColorTemperatureController", "SetColorTemperature") => {
                Operation::SetColorTemperature(number_at(
                    raw,
                    "/directive/payload/colorTemperatureInKelvin",
                )?)
            }
            ("Alexa.ColorTemperatureController", "IncreaseColorTemperature") => {
                Operation::AdjustColorTemperature(COLOR_TEMPERATURE_STEP)
            }
            ("Alexa.ColorTemperatureController", "DecreaseColorTemperature") => {
                Operation::AdjustColorTemperature(-COLOR_TEMPERATURE_STEP)
            }
            ("Alexa.LockController", "Lock") => Operation::SetLockState(LockState::Locked),
            ("Alexa.LockController", "Unlock") => Operation::SetLockState(LockState::Unlocked),
            ("Alexa.ThermostatController", "SetTargetTemperature") => {
                Operation::SetTargetTemperature(temperature_at(
                    raw,
                    "/directive/payload/targetSetpoint",
                    false,
                )?)
            }
            ("Alexa.ThermostatController", "AdjustTargetTemperature") => {
                Operation::AdjustTargetTemperature(temperature_at(
                    raw,
                    "/directive/payload/targetSetpointDelta",
                    true,
                )?)
            }
            (namespace, name) => {
                return Err(Error::invalid_directive(format!(
                    "unsupported directive {}.{}",
                    namespace, name
                )));
            }
        };
        Ok(operation)
    }

    fn respond(&self, header: &Header, reply: Reply) -> Value {
        match reply {
            Reply::Discovery(descriptors) => {
                let endpoints: Vec<Value> = descriptors.iter().map(endpoint).collect();
                json!({
                    "event": {
                        "header": event_header(header, "Alexa.Discovery", "Discover.Response"),
                        "payload": { "endpoints": endpoints }
                    }
                })
            }
            Reply::Ack if header.namespace == "Alexa.Authorization" => json!({
                "event": {
                    "header": event_header(header, "Alexa.Authorization", "AcceptGrant.Response"),
                    "payload": {}
                }
            }),
            Reply::State(snapshot) => {
                let properties = snapshot_properties(&snapshot);
                json!({
                    "event": response_event(header, "Alexa", "StateReport"),
                    "context": { "properties": properties }
                })
            }
            reply => {
                let properties = reply_properties(header, &reply);
                json!({
                    "event": response_event(header, "Alexa", "Response"),
                    "context": { "properties": properties }
                })
            }
        }
    }

    fn error(&self, header: &Header, error: &Error) -> Value {
        let (kind, message, valid_range) = match error {
            Error::ValueOutOfRange { min, max } => (
                "VALUE_OUT_OF_RANGE",
                format!("value must be between {} and {}", min, max),
                Some(json!({ "minimumValue": min, "maximumValue": max })),
            ),
            Error::TemperatureOutOfRange { min, max } => (
                "TEMPERATURE_VALUE_OUT_OF_RANGE",
                format!("temperature must be between {} and {}", min, max),
                Some(json!({
                    "minimumValue": temperature_value(*min),
                    "maximumValue": temperature_value(*max),
                })),
            ),
            Error::UnsupportedOperation { .. } | Error::InvalidDirective(_) => {
                ("INVALID_DIRECTIVE", error.to_string(), None)
            }
            Error::UnknownDomain(_) => ("NO_SUCH_ENDPOINT", error.to_string(), None),
            e if e.is_missing_entity() => (
                "NO_SUCH_ENDPOINT",
                "entity does not exist in Home Assistant".to_string(),
                None,
            ),
            _ => (
                "INTERNAL_ERROR",
                "internal error while handling the directive".to_string(),
                None,
            ),
        };

        let mut payload = json!({ "type": kind, "message": message });
        if let Some(range) = valid_range {
            payload["validRange"] = range;
        }

        let mut event = response_event(header, "Alexa", "ErrorResponse");
        event["payload"] = payload;
        json!({ "event": event })
    }
}

// =============================================================================
// Envelope pieces
// =============================================================================

fn event_header(header: &Header, namespace: &str, name: &str) -> Value {
    let mut out = json!({
        "namespace": namespace,
        "name": name,
        "payloadVersion": PAYLOAD_VERSION,
        "messageId": new_message_id(),
    });
    if let Some(token) = &header.correlation_token {
        out["correlationToken"] = json!(token);
    }
    out
}

fn response_event(header: &Header, namespace: &str, name: &str) -> Value {
    let mut event = json!({
        "header": event_header(header, namespace, name),
        "payload": {}
    });
    if let Some(endpoint_id) = &header.endpoint_id {
        event["endpoint"] = json!({ "endpointId": endpoint_id });
    }
    event
}

fn property(namespace: &str, name: &str, value: Value) -> Value {
    json!({
        "namespace": namespace,
        "name": name,
        "value": value,
        "timeOfSample": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "uncertaintyInMilliseconds": UNCERTAINTY_MS,
    })
}

fn temperature_value(temperature: Temperature) -> Value {
    json!({ "value": temperature.value, "scale": temperature.scale.as_ref() })
}

fn percent_value(percent: f64) -> Value {
    json!(percent.round() as i64)
}

fn power_value(on: bool) -> Value {
    json!(if on { "ON" } else { "OFF" })
}

/// The properties a controller directive reports back after it ran.
fn reply_properties(header: &Header, reply: &Reply) -> Vec<Value> {
    let value = match reply {
        Reply::Power(on) => property("Alexa.PowerController", "powerState", power_value(*on)),
        Reply::Percentage(percent) if header.namespace == "Alexa.BrightnessController" => {
            property("Alexa.BrightnessController", "brightness", percent_value(*percent))
        }
        Reply::Percentage(percent) => {
            property("Alexa.PercentageController", "percentage", percent_value(*percent))
        }
        Reply::Lock(state) => property("Alexa.LockController", "lockState", json!(state.as_ref())),
        Reply::Color(color) => property("Alexa.ColorController", "color", color_value(*color)),
        Reply::ColorTemperature(kelvin) => property(
            "Alexa.ColorTemperatureController",
            "colorTemperatureInKelvin",
            json!(kelvin),
        ),
        Reply::Thermostat(change) => {
            return thermostat_properties(change.target, &change.mode);
        }
        Reply::TargetTemperature { target, mode } => {
            return thermostat_properties(*target, mode);
        }
        Reply::TemperatureReading(reading) => property(
            "Alexa.TemperatureSensor",
            "temperature",
            temperature_value(*reading),
        ),
        _ => return Vec::new(),
    };
    vec![value]
}

fn thermostat_properties(target: Temperature, mode: &str) -> Vec<Value> {
    let mut properties = vec![property(
        "Alexa.ThermostatController",
        "targetSetpoint",
        temperature_value(target),
    )];
    if let Some(mode) = thermostat_mode(mode) {
        properties.push(property("Alexa.ThermostatController", "thermostatMode", json!(mode)));
    }
    properties
}

fn color_value(color: Hsb) -> Value {
    json!({
        "hue": color.hue,
        "saturation": color.saturation,
        "brightness": color.brightness,
    })
}

fn snapshot_properties(snapshot: &StateSnapshot) -> Vec<Value> {
    let mut properties = Vec::new();
    if let Some(on) = snapshot.power {
        properties.push(property("Alexa.PowerController", "powerState", power_value(on)));
    }
    if let Some(percent) = snapshot.percentage {
        properties.push(property(
            "Alexa.PercentageController",
            "percentage",
            percent_value(percent),
        ));
    }
    if let Some(lock) = snapshot.lock {
        properties.push(property("Alexa.LockController", "lockState", json!(lock.as_ref())));
    }
    if let Some(reading) = snapshot.current_temperature {
        properties.push(property(
            "Alexa.TemperatureSensor",
            "temperature",
            temperature_value(reading),
        ));
    }
    if let Some(target) = snapshot.target_temperature {
        properties.push(property(
            "Alexa.ThermostatController",
            "targetSetpoint",
            temperature_value(target),
        ));
    }
    if let Some(kelvin) = snapshot.color_temperature {
        properties.push(property(
            "Alexa.ColorTemperatureController",
            "colorTemperatureInKelvin",
            json!(kelvin),
        ));
    }
    let connectivity = if snapshot.reachable { "OK" } else { "UNREACHABLE" };
    properties.push(property(
        "Alexa.EndpointHealth",
        "connectivity",
        json!({ "value": connectivity }),
    ));
    properties
}

// =============================================================================
// Discovery
// =============================================================================

fn interface(name: &str, supported: &[&str]) -> Value {
    let mut capability = json!({
        "type": "AlexaInterface",
        "interface": name,
        "version": PAYLOAD_VERSION,
    });
    if !supported.is_empty() {
        let supported: Vec<Value> = supported.iter().map(|n| json!({ "name": n })).collect();
        capability["properties"] = json!({
            "supported": supported,
            "proactivelyReported": false,
            "retrievable": true,
        });
    }
    capability
}

fn capability_interface(capability: Capability) -> Value {
    match capability {
        Capability::Power => interface("Alexa.PowerController", &["powerState"]),
        Capability::Percentage => interface("Alexa.PercentageController", &["percentage"]),
        Capability::Brightness => interface("Alexa.BrightnessController", &["brightness"]),
        Capability::Lock => interface("Alexa.LockController", &["lockState"]),
        Capability::TemperatureSensor => interface("Alexa.TemperatureSensor", &["temperature"]),
        Capability::Thermostat => interface("Alexa.ThermostatController", &["targetSetpoint"]),
        Capability::Color => interface("Alexa.ColorController", &["color"]),
        Capability::ColorTemperature => {
            interface("Alexa.ColorTemperatureController", &["colorTemperatureInKelvin"])
        }
    }
}

pub fn display_category(kind: AdapterKind, domain: &str) -> &'static str {
    match kind {
        AdapterKind::Toggle if domain == "switch" || domain == "input_boolean" => "SWITCH",
        AdapterKind::Toggle => "OTHER",
        AdapterKind::Light => "LIGHT",
        AdapterKind::Lock => "SMARTLOCK",
        AdapterKind::MediaPlayer => "TV",
        AdapterKind::Cover => "DOOR",
        AdapterKind::GarageDoor => "GARAGE_DOOR",
        AdapterKind::Script => "ACTIVITY_TRIGGER",
        AdapterKind::Scene => "SCENE_TRIGGER",
        AdapterKind::Climate => "THERMOSTAT",
        AdapterKind::Fan => "FAN",
        AdapterKind::InputSlider => "OTHER",
    }
}

fn endpoint(descriptor: &Descriptor) -> Value {
    let mut capabilities = vec![interface("Alexa", &[])];
    capabilities.extend(descriptor.capabilities.iter().copied().map(capability_interface));
    capabilities.push(interface("Alexa.EndpointHealth", &["connectivity"]));

    let categories = descriptor.display_categories.clone().unwrap_or_else(|| {
        vec![display_category(descriptor.kind, &descriptor.domain).to_string()]
    });

    let mut cookie = Map::new();
    cookie.insert("entity_id".into(), json!(descriptor.entity_id));

    json!({
        "endpointId": endpoint_id(&descriptor.entity_id),
        "friendlyName": descriptor.friendly_name,
        "description": descriptor.description,
        "manufacturerName": MANUFACTURER,
        "displayCategories": categories,
        "cookie": cookie,
        "capabilities": capabilities,
    })
}

// =============================================================================
// Payload parsing
// =============================================================================

/// Reads `{value, scale}`; Kelvin is folded into Celsius at the boundary.
fn temperature_at(raw: &Value, pointer: &str, is_delta: bool) -> Result<Temperature> {
    let value = number_at(raw, &format!("{}/value", pointer))?;
    let scale = str_at(raw, &format!("{}/scale", pointer)).unwrap_or_else(|| "CELSIUS".into());
    match scale.as_str() {
        "KELVIN" if is_delta => Ok(Temperature::celsius(value)),
        "KELVIN" => Ok(Temperature::celsius(value - 273.15)),
        other => other
            .parse::<TemperatureUnit>()
            .map(|unit| Temperature::new(value, unit))
            .map_err(|_| Error::invalid_directive(format!("unknown temperature scale {}", other))),
    }
}
