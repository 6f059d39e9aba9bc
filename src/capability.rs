//! Static capability table.
//!
//! Each adapter kind implements a fixed subset of [`Action`]s. Light colour
//! actions are further gated by the entity's `supported_features` bits; every
//! other action is a property of the kind alone.

use strum_macros::{AsRefStr, Display, IntoStaticStr};

use crate::adapter::{AdapterKind, EntityAdapter, LIGHT_SUPPORT_COLOR, LIGHT_SUPPORT_COLOR_TEMP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    TurnOn,
    TurnOff,
    GetPercentage,
    SetPercentage,
    GetLockState,
    SetLockState,
    GetCurrentTemperature,
    GetTemperature,
    SetTemperature,
    GetColorTemperature,
    SetColorTemperature,
    SetColor,
}

/// Assistant-facing interfaces, independent of protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Capability {
    Power,
    Percentage,
    Brightness,
    Lock,
    TemperatureSensor,
    Thermostat,
    Color,
    ColorTemperature,
}

const TOGGLE: &[Action] = &[Action::TurnOn, Action::TurnOff];

const DIMMABLE: &[Action] = &[
    Action::TurnOn,
    Action::TurnOff,
    Action::GetPercentage,
    Action::SetPercentage,
];

const LIGHT: &[Action] = &[
    Action::TurnOn,
    Action::TurnOff,
    Action::GetPercentage,
    Action::SetPercentage,
    Action::GetColorTemperature,
    Action::SetColorTemperature,
    Action::SetColor,
];

const LOCK: &[Action] = &[Action::GetLockState, Action::SetLockState];

const CLIMATE: &[Action] = &[
    Action::GetCurrentTemperature,
    Action::GetTemperature,
    Action::SetTemperature,
];

const SLIDER: &[Action] = &[Action::GetPercentage, Action::SetPercentage];

/// Every action the kind can implement, before feature gating.
pub fn actions_of(kind: AdapterKind) -> &'static [Action] {
    match kind {
        AdapterKind::Toggle
        | AdapterKind::Cover
        | AdapterKind::GarageDoor
        | AdapterKind::Script
        | AdapterKind::Scene => TOGGLE,
        AdapterKind::Lock => LOCK,
        AdapterKind::Light => LIGHT,
        AdapterKind::MediaPlayer | AdapterKind::Fan => DIMMABLE,
        AdapterKind::Climate => CLIMATE,
        AdapterKind::InputSlider => SLIDER,
    }
}

pub fn supports(kind: AdapterKind, features: u32, action: Action) -> bool {
    if !actions_of(kind).contains(&action) {
        return false;
    }
    match (kind, action) {
        (AdapterKind::Light, Action::SetColor) => features & LIGHT_SUPPORT_COLOR != 0,
        (AdapterKind::Light, Action::GetColorTemperature | Action::SetColorTemperature) => {
            features & LIGHT_SUPPORT_COLOR_TEMP != 0
        }
        _ => true,
    }
}

/// The capabilities advertised for an adapter at discovery time.
pub fn capabilities_of(adapter: &EntityAdapter<'_>) -> Vec<Capability> {
    capabilities_for(adapter.kind(), adapter.features())
}

pub fn capabilities_for(kind: AdapterKind, features: u32) -> Vec<Capability> {
    let has = |action| supports(kind, features, action);
    let mut capabilities = Vec::new();

    if has(Action::TurnOn) || has(Action::TurnOff) {
        capabilities.push(Capability::Power);
    }
    if kind == AdapterKind::Light && has(Action::SetPercentage) {
        capabilities.push(Capability::Brightness);
    }
    if has(Action::GetPercentage) || has(Action::SetPercentage) {
        capabilities.push(Capability::Percentage);
    }
    if has(Action::GetLockState) || has(Action::SetLockState) {
        capabilities.push(Capability::Lock);
    }
    if has(Action::GetCurrentTemperature) {
        capabilities.push(Capability::TemperatureSensor);
    }
    if has(Action::GetTemperature) || has(Action::SetTemperature) {
        capabilities.push(Capability::Thermostat);
    }
    if has(Action::SetColor) {
        capabilities.push(Capability::Color);
    }
    if has(Action::GetColorTemperature) || has(Action::SetColorTemperature) {
        capabilities.push(Capability::ColorTemperature);
    }
    capabilities
}
