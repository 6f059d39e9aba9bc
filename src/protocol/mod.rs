//! Version-neutral directive model.
//!
//! Each wire generation implements [`Protocol`]: it reads a [`Header`] and an
//! [`Operation`] out of the raw directive, and renders a [`Reply`] or an
//! [`Error`] back into its own envelope. Everything between those two steps
//! (adapters, conversions, discovery) is shared.

pub mod v2;
pub mod v3;

use serde_json::Value;

use crate::adapter::{DomainPolicy, LockState, StateSnapshot, ThermostatChange};
use crate::convert::{Hsb, Temperature};
use crate::discovery::Descriptor;
use crate::error::{Error, Result};

pub use v2::V2;
pub use v3::V3;

/// Routing and correlation data from an inbound directive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub namespace: String,
    pub name: String,
    pub message_id: Option<String>,
    pub correlation_token: Option<String>,
    /// The assistant's identifier for the target, echoed back in responses.
    pub endpoint_id: Option<String>,
    /// The hub entity the directive targets.
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Discover,
    HealthCheck,
    AcceptGrant,
    ReportState,
    TurnOn,
    TurnOff,
    SetPercentage(f64),
    AdjustPercentage(f64),
    SetColor(Hsb),
    SetColorTemperature(f64),
    AdjustColorTemperature(f64),
    SetLockState(LockState),
    GetLockState,
    SetTargetTemperature(Temperature),
    AdjustTargetTemperature(Temperature),
    GetTargetTemperature,
    GetTemperatureReading,
}

impl Operation {
    /// Colour operations need the light's feature bits before dispatch.
    pub fn needs_features(&self) -> bool {
        matches!(
            self,
            Operation::SetColor(_)
                | Operation::SetColorTemperature(_)
                | Operation::AdjustColorTemperature(_)
                | Operation::ReportState
        )
    }
}

/// What a handler produced, before it is wrapped in an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ack,
    Power(bool),
    Percentage(f64),
    Lock(LockState),
    Color(Hsb),
    ColorTemperature(u32),
    Thermostat(ThermostatChange),
    TargetTemperature { target: Temperature, mode: String },
    TemperatureReading(Temperature),
    State(StateSnapshot),
    Discovery(Vec<Descriptor>),
    Health { healthy: bool, description: String },
}

pub trait Protocol: Send + Sync {
    fn version(&self) -> &'static str;

    /// How the adapter factory treats domains it does not know.
    fn domain_policy(&self) -> DomainPolicy;

    /// Never fails; missing fields are left empty.
    fn header(&self, raw: &Value) -> Header;

    fn operation(&self, header: &Header, raw: &Value) -> Result<Operation>;

    fn respond(&self, header: &Header, reply: Reply) -> Value;

    fn error(&self, header: &Header, error: &Error) -> Value;
}

/// Picks the wire generation from the directive's shape.
pub fn detect(raw: &Value) -> Option<&'static dyn Protocol> {
    if raw.get("directive").is_some() {
        return Some(&V3);
    }
    match raw.pointer("/header/payloadVersion").and_then(Value::as_str) {
        Some("2") => Some(&V2),
        Some("3") => Some(&V3),
        _ => None,
    }
}

pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Payload helpers
// =============================================================================

pub(crate) fn str_at(raw: &Value, pointer: &str) -> Option<String> {
    raw.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn number_at(raw: &Value, pointer: &str) -> Result<f64> {
    raw.pointer(pointer)
        .and_then(crate::hub::value_as_f64)
        .ok_or_else(|| Error::invalid_directive(format!("missing numeric field {}", pointer)))
}

pub(crate) fn hsb_at(raw: &Value, pointer: &str) -> Result<Hsb> {
    let hue = number_at(raw, &format!("{}/hue", pointer))?;
    let saturation = number_at(raw, &format!("{}/saturation", pointer))?;
    let brightness = number_at(raw, &format!("{}/brightness", pointer))?;
    Ok(Hsb::normalized(hue, saturation, brightness))
}

/// Maps an HVAC state onto the assistant's thermostat mode names.
pub(crate) fn thermostat_mode(state: &str) -> Option<&'static str> {
    match state {
        "heat" => Some("HEAT"),
        "cool" => Some("COOL"),
        "auto" | "heat_cool" => Some("AUTO"),
        "eco" => Some("ECO"),
        "off" => Some("OFF"),
        _ => None,
    }
}
