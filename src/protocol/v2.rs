//! `Alexa.ConnectedHome.*` appliance messages.
//!
//! Requests name the operation `<Verb>Request`; control requests are answered
//! with `<Verb>Confirmation`, everything else with `<Verb>Response`. The hub
//! entity travels in `additionalApplianceDetails.entity_id`.

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use super::{
    Header, Operation, Protocol, Reply, hsb_at, new_message_id, number_at, str_at, thermostat_mode,
};
use crate::adapter::{COLOR_TEMPERATURE_STEP, DomainPolicy, LockState};
use crate::capability::Capability;
use crate::convert::{Hsb, Temperature, TemperatureUnit, convert_optional_temperature};
use crate::discovery::Descriptor;
use crate::error::{Error, Result};

pub const PAYLOAD_VERSION: &str = "2";

const CONTROL: &str = "Alexa.ConnectedHome.Control";
const QUERY: &str = "Alexa.ConnectedHome.Query";
const DISCOVERY: &str = "Alexa.ConnectedHome.Discovery";
const SYSTEM: &str = "Alexa.ConnectedHome.System";

const MANUFACTURER: &str = "Home Assistant";

pub struct V2Protocol;

pub static V2: V2Protocol = V2Protocol;

/// Stable, opaque appliance id for an entity.
pub fn appliance_id(entity_id: &str) -> String {
    hex::encode(Sha256::digest(entity_id.as_bytes()))
}

impl Protocol for V2Protocol {
    fn version(&self) -> &'static str {
        PAYLOAD_VERSION
    }

    fn domain_policy(&self) -> DomainPolicy {
        DomainPolicy::Permissive
    }

    fn header(&self, raw: &Value) -> Header {
        Header {
            namespace: str_at(raw, "/header/namespace").unwrap_or_default(),
            name: str_at(raw, "/header/name").unwrap_or_default(),
            message_id: str_at(raw, "/header/messageId"),
            correlation_token: None,
            endpoint_id: str_at(raw, "/payload/appliance/applianceId"),
            entity_id: str_at(raw, "/payload/appliance/additionalApplianceDetails/entity_id"),
        }
    }

    fn operation(&self, header: &Header, raw: &Value) -> Result<Operation> {
        let operation = match (header.namespace.as_str(), header.name.as_str()) {
            (DISCOVERY, "DiscoverAppliancesRequest") => Operation::Discover,
            (SYSTEM, "HealthCheckRequest") => Operation::HealthCheck,
            (CONTROL, "TurnOnRequest") => Operation::TurnOn,
            (CONTROL, "TurnOffRequest") => Operation::TurnOff,
            (CONTROL, "SetPercentageRequest") => {
                Operation::SetPercentage(number_at(raw, "/payload/percentageState/value")?)
            }
            (CONTROL, "IncrementPercentageRequest") => {
                Operation::AdjustPercentage(number_at(raw, "/payload/deltaPercentage/value")?)
            }
            (CONTROL, "DecrementPercentageRequest") => {
                Operation::AdjustPercentage(-number_at(raw, "/payload/deltaPercentage/value")?)
            }
            (CONTROL, "SetTargetTemperatureRequest") => Operation::SetTargetTemperature(
                Temperature::celsius(number_at(raw, "/payload/targetTemperature/value")?),
            ),
            (CONTROL, "IncrementTargetTemperatureRequest") => Operation::AdjustTargetTemperature(
                Temperature::celsius(number_at(raw, "/payload/deltaTemperature/value")?),
            ),
            (CONTROL, "DecrementTargetTemperatureRequest") => Operation::AdjustTargetTemperature(
                Temperature::celsius(-number_at(raw, "/payload/deltaTemperature/value")?),
            ),
            (CONTROL, "SetLockStateRequest") => {
                let requested = str_at(raw, "/payload/lockState").unwrap_or_default();
                match requested.parse::<LockState>() {
                    Ok(state @ (LockState::Locked | LockState::Unlocked)) => {
                        Operation::SetLockState(state)
                    }
                    _ => {
                        return Err(Error::invalid_directive(format!(
                            "unknown lock state '{}'",
                            requested
                        )));
                    }
                }
            }
            (CONTROL, "SetColorRequest") => Operation::SetColor(hsb_at(raw, "/payload/color")?),
            (CONTROL, "SetColorTemperatureRequest") => Operation::SetColorTemperature(
                number_at(raw, "/payload/colorTemperature/value")?,
            ),
            (CONTROL, "IncrementColorTemperatureRequest") => {
                Operation::AdjustColorTemperature(COLOR_TEMPERATURE_STEP)
            }
            (CONTROL, "DecrementColorTemperatureRequest") => {
                Operation::AdjustColorTemperature(-COLOR_TEMPERATURE_STEP)
            }
            (QUERY, "GetLockStateRequest") => Operation::GetLockState,
            (QUERY, "GetTargetTemperatureRequest") => Operation::GetTargetTemperature,
            (QUERY, "GetTemperatureReadingRequest") => Operation::GetTemperatureReading,
            (namespace, name) => {
                return Err(Error::invalid_directive(format!(
                    "unsupported request {}.{}",
                    namespace, name
                )));
            }
        };
        Ok(operation)
    }

    fn respond(&self, header: &Header, reply: Reply) -> Value {
        let payload = match reply {
            Reply::Discovery(descriptors) => {
                let appliances: Vec<Value> = descriptors.iter().map(appliance).collect();
                json!({ "discoveredAppliances": appliances })
            }
            Reply::Health {
                healthy,
                description,
            } => json!({ "isHealthy": healthy, "description": description }),
            Reply::Lock(state) => json!({ "lockState": state.as_ref() }),
            Reply::Color(color) => json!({ "achievedState": { "color": color_value(color) } }),
            Reply::ColorTemperature(kelvin) => {
                json!({ "achievedState": { "colorTemperature": { "value": kelvin } } })
            }
            Reply::Thermostat(change) => {
                let mut payload = json!({
                    "targetTemperature": celsius_value(change.target),
                    "temperatureMode": { "value": temperature_mode(&change.mode) },
                });
                // the previous setpoint is in the entity's unit, like the target
                let previous = convert_optional_temperature(
                    change.previous.map(|t| t.value),
                    change.target.scale,
                    TemperatureUnit::Celsius,
                );
                if let Some(previous) = previous {
                    payload["previousState"] = json!({
                        "targetTemperature": { "value": previous },
                        "mode": { "value": temperature_mode(&change.mode) },
                    });
                }
                payload
            }
            Reply::TargetTemperature { target, mode } => json!({
                "targetTemperature": celsius_value(target),
                "temperatureMode": { "value": temperature_mode(&mode) },
            }),
            Reply::TemperatureReading(reading) => {
                json!({ "temperatureReading": celsius_value(reading) })
            }
            Reply::Ack
            | Reply::Power(_)
            | Reply::Percentage(_)
            | Reply::State(_) => json!({ "success": true }),
        };

        json!({
            "header": response_header(&header.namespace, &response_name(header)),
            "payload": payload,
        })
    }

    fn error(&self, _header: &Header, error: &Error) -> Value {
        let (name, payload) = match error {
            Error::ValueOutOfRange { min, max } => (
                "ValueOutOfRangeError",
                json!({ "minimumValue": min, "maximumValue": max }),
            ),
            Error::TemperatureOutOfRange { min, max } => (
                "ValueOutOfRangeError",
                json!({
                    "minimumValue": min.to(TemperatureUnit::Celsius).value,
                    "maximumValue": max.to(TemperatureUnit::Celsius).value,
                }),
            ),
            Error::UnsupportedOperation { .. } | Error::InvalidDirective(_) => {
                ("UnsupportedOperationError", json!({}))
            }
            Error::UnknownDomain(_) => ("UnsupportedTargetError", json!({})),
            e if e.is_missing_entity() => ("NoSuchTargetError", json!({})),
            _ => ("DriverInternalError", json!({})),
        };

        json!({
            "header": response_header(CONTROL, name),
            "payload": payload,
        })
    }
}

fn response_header(namespace: &str, name: &str) -> Value {
    json!({
        "namespace": namespace,
        "name": name,
        "payloadVersion": PAYLOAD_VERSION,
        "messageId": new_message_id(),
    })
}

/// `TurnOnRequest` becomes `TurnOnConfirmation` on the control namespace and
/// `...Response` everywhere else.
fn response_name(header: &Header) -> String {
    let verb = header
        .name
        .strip_suffix("Request")
        .unwrap_or(&header.name);
    if header.namespace == CONTROL {
        format!("{}Confirmation", verb)
    } else {
        format!("{}Response", verb)
    }
}

fn celsius_value(temperature: Temperature) -> Value {
    json!({ "value": temperature.to(TemperatureUnit::Celsius).value })
}

fn temperature_mode(state: &str) -> &'static str {
    thermostat_mode(state).unwrap_or("CUSTOM")
}

fn color_value(color: Hsb) -> Value {
    json!({
        "hue": color.hue,
        "saturation": color.saturation,
        "brightness": color.brightness,
    })
}

fn actions(capabilities: &[Capability]) -> Vec<&'static str> {
    let mut actions = Vec::new();
    for capability in capabilities {
        let names: &[&'static str] = match capability {
            Capability::Power => &["turnOn", "turnOff"],
            Capability::Percentage => &["setPercentage", "incrementPercentage", "decrementPercentage"],
            Capability::Brightness => &[],
            Capability::Lock => &["setLockState", "getLockState"],
            Capability::TemperatureSensor => &["getTemperatureReading"],
            Capability::Thermostat => &[
                "setTargetTemperature",
                "incrementTargetTemperature",
                "decrementTargetTemperature",
                "getTargetTemperature",
            ],
            Capability::Color => &["setColor"],
            Capability::ColorTemperature => &[
                "setColorTemperature",
                "incrementColorTemperature",
                "decrementColorTemperature",
            ],
        };
        actions.extend_from_slice(names);
    }
    actions
}

fn appliance(descriptor: &Descriptor) -> Value {
    let appliance_types = descriptor.display_categories.clone().unwrap_or_else(|| {
        vec![super::v3::display_category(descriptor.kind, &descriptor.domain).to_string()]
    });

    json!({
        "applianceId": appliance_id(&descriptor.entity_id),
        "manufacturerName": MANUFACTURER,
        "modelName": descriptor.domain,
        "version": "1",
        "friendlyName": descriptor.friendly_name,
        "friendlyDescription": descriptor.description,
        "isReachable": true,
        "actions": actions(&descriptor.capabilities),
        "applianceTypes": appliance_types,
        "additionalApplianceDetails": { "entity_id": descriptor.entity_id },
    })
}
