//! Per-domain entity adapters.
//!
//! An [`EntityAdapter`] wraps one entity id for the duration of a single
//! directive. Which operations it accepts is fixed by its [`AdapterKind`]
//! (see [`crate::capability`]); every operation re-reads state from the hub
//! and writes through service calls, nothing is cached.

use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::capability::{self, Action};
use crate::convert::{
    self, FanSpeed, Hsb, Temperature, TemperatureUnit, apply_relative, ensure_in_range,
};
use crate::error::{Error, Result};
use crate::hub::{EntityState, HubClient, PostOutcome, domain_of};

/// Light `supported_features` bit for colour temperature.
pub const LIGHT_SUPPORT_COLOR_TEMP: u32 = 2;
/// Light `supported_features` bit for RGB/HS colour.
pub const LIGHT_SUPPORT_COLOR: u32 = 16;

/// Fixed Kelvin step for relative colour-temperature directives.
pub const COLOR_TEMPERATURE_STEP: f64 = 500.0;

// =============================================================================
// Domains and adapter kinds
// =============================================================================

/// Domains with an adapter, in their Home Assistant spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Alert,
    Automation,
    Climate,
    Cover,
    Fan,
    GarageDoor,
    Group,
    InputBoolean,
    InputNumber,
    InputSlider,
    Light,
    Lock,
    MediaPlayer,
    Scene,
    Script,
    Switch,
}

impl Domain {
    pub fn kind(self) -> AdapterKind {
        match self {
            Domain::Alert
            | Domain::Automation
            | Domain::Group
            | Domain::InputBoolean
            | Domain::Switch => AdapterKind::Toggle,
            Domain::Climate => AdapterKind::Climate,
            Domain::Cover => AdapterKind::Cover,
            Domain::Fan => AdapterKind::Fan,
            Domain::GarageDoor => AdapterKind::GarageDoor,
            Domain::InputNumber | Domain::InputSlider => AdapterKind::InputSlider,
            Domain::Light => AdapterKind::Light,
            Domain::Lock => AdapterKind::Lock,
            Domain::MediaPlayer => AdapterKind::MediaPlayer,
            Domain::Scene => AdapterKind::Scene,
            Domain::Script => AdapterKind::Script,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum AdapterKind {
    Toggle,
    Lock,
    Light,
    MediaPlayer,
    Cover,
    GarageDoor,
    Script,
    Scene,
    Climate,
    Fan,
    InputSlider,
}

/// What the factory does with a domain that has no adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainPolicy {
    /// Reject with [`Error::UnknownDomain`].
    Strict,
    /// Fall back to a toggle through the `homeassistant` service domain.
    Permissive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LockState {
    Locked,
    Unlocked,
    Jammed,
}

impl LockState {
    fn from_hass(state: &str) -> Self {
        match state {
            "locked" => LockState::Locked,
            "unlocked" => LockState::Unlocked,
            _ => LockState::Jammed,
        }
    }
}

/// Outcome of a thermostat write, in the entity's own unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermostatChange {
    pub target: Temperature,
    pub previous: Option<Temperature>,
    pub mode: String,
    pub outcome: PostOutcome,
}

/// Everything readable about an entity from a single state fetch.
///
/// A field is `None` when the adapter does not implement the matching getter
/// or the hub did not report the attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub power: Option<bool>,
    pub percentage: Option<f64>,
    pub lock: Option<LockState>,
    pub current_temperature: Option<Temperature>,
    pub target_temperature: Option<Temperature>,
    pub color_temperature: Option<u32>,
    pub reachable: bool,
}

// =============================================================================
// Factory
// =============================================================================

pub fn make_adapter<'a>(
    hub: &'a HubClient,
    entity_id: &str,
    features: u32,
    policy: DomainPolicy,
) -> Result<EntityAdapter<'a>> {
    let domain_name = domain_of(entity_id);
    let domain = match (domain_name.parse::<Domain>(), policy) {
        (Ok(domain), _) => Some(domain),
        (Err(_), DomainPolicy::Permissive) => None,
        (Err(_), DomainPolicy::Strict) => return Err(Error::UnknownDomain(domain_name.into())),
    };

    Ok(EntityAdapter {
        hub,
        entity_id: entity_id.to_string(),
        domain,
        kind: domain.map(Domain::kind).unwrap_or(AdapterKind::Toggle),
        features,
    })
}

// =============================================================================
// Adapter
// =============================================================================

pub struct EntityAdapter<'a> {
    hub: &'a HubClient,
    entity_id: String,
    domain: Option<Domain>,
    kind: AdapterKind,
    features: u32,
}

impl<'a> EntityAdapter<'a> {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn domain_name(&self) -> &str {
        domain_of(&self.entity_id)
    }

    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn features(&self) -> u32 {
        self.features
    }

    pub fn supports(&self, action: Action) -> bool {
        capability::supports(self.kind, self.features, action)
    }

    fn require(&self, action: Action) -> Result<()> {
        if self.supports(action) {
            Ok(())
        } else {
            Err(Error::unsupported(&self.entity_id, action.into()))
        }
    }

    async fn fetch(&self) -> Result<EntityState> {
        self.hub.state(&self.entity_id).await
    }

    async fn call(&self, domain: &str, service: &str, data: Value) -> Result<PostOutcome> {
        tracing::debug!(entity_id = %self.entity_id, domain, service, "calling service");
        self.hub
            .call_service(domain, service, &self.entity_id, data)
            .await
    }

    /// Service domain for plain on/off calls.
    fn toggle_domain(&self) -> &str {
        match self.domain {
            None | Some(Domain::Group) => "homeassistant",
            Some(_) => self.domain_name(),
        }
    }

    // -------------------------------------------------------------------------
    // Power
    // -------------------------------------------------------------------------

    pub async fn turn_on(&self) -> Result<PostOutcome> {
        self.require(Action::TurnOn)?;
        match self.kind {
            AdapterKind::Cover => self.call("cover", "open_cover", json!({})).await,
            AdapterKind::GarageDoor => self.call("garage_door", "open", json!({})).await,
            AdapterKind::Scene => self.call("scene", "turn_on", json!({})).await,
            _ => self.call(self.toggle_domain(), "turn_on", json!({})).await,
        }
    }

    pub async fn turn_off(&self) -> Result<PostOutcome> {
        self.require(Action::TurnOff)?;
        match self.kind {
            AdapterKind::Cover => self.call("cover", "close_cover", json!({})).await,
            AdapterKind::GarageDoor => self.call("garage_door", "close", json!({})).await,
            // scenes have no off state; re-applying the scene is the closest match
            AdapterKind::Scene => self.call("scene", "turn_on", json!({})).await,
            _ => self.call(self.toggle_domain(), "turn_off", json!({})).await,
        }
    }

    // -------------------------------------------------------------------------
    // Percentage
    // -------------------------------------------------------------------------

    pub async fn get_percentage(&self) -> Result<f64> {
        self.require(Action::GetPercentage)?;
        let state = self.fetch().await?;
        percentage_of(self.kind, &state)
    }

    pub async fn set_percentage(&self, percent: f64) -> Result<PostOutcome> {
        self.require(Action::SetPercentage)?;
        let percent = ensure_in_range(percent, 0.0, 100.0)?;
        match self.kind {
            AdapterKind::Light => {
                let brightness = convert::percent_to_brightness(percent);
                self.call("light", "turn_on", json!({ "brightness": brightness }))
                    .await
            }
            AdapterKind::MediaPlayer => {
                let volume = convert::percent_to_volume(percent);
                self.call("media_player", "volume_set", json!({ "volume_level": volume }))
                    .await
            }
            AdapterKind::Fan => {
                let speed = FanSpeed::from_percent(percent);
                self.call("fan", "set_speed", json!({ "speed": speed.as_ref() }))
                    .await
            }
            AdapterKind::InputSlider => {
                let state = self.fetch().await?;
                let min = state.attribute_f64("min").unwrap_or(0.0);
                let max = state.attribute_f64("max").unwrap_or(100.0);
                let value = convert::percent_to_slider(percent, min, max);
                let service = match self.domain {
                    Some(Domain::InputNumber) => "set_value",
                    _ => "select_value",
                };
                self.call(self.domain_name(), service, json!({ "value": value }))
                    .await
            }
            _ => Err(Error::unsupported(&self.entity_id, Action::SetPercentage.into())),
        }
    }

    /// Returns the new percentage after the relative-adjustment policy.
    pub async fn adjust_percentage(&self, delta: f64) -> Result<(f64, PostOutcome)> {
        self.require(Action::SetPercentage)?;
        let current = self.get_percentage().await?;
        let new = apply_relative(current, delta, 0.0, 100.0)?;
        let outcome = self.set_percentage(new).await?;
        Ok((new, outcome))
    }

    // -------------------------------------------------------------------------
    // Lock
    // -------------------------------------------------------------------------

    pub async fn get_lock_state(&self) -> Result<LockState> {
        self.require(Action::GetLockState)?;
        let state = self.fetch().await?;
        Ok(LockState::from_hass(&state.state))
    }

    pub async fn set_lock_state(&self, lock_state: LockState) -> Result<PostOutcome> {
        self.require(Action::SetLockState)?;
        let service = match lock_state {
            LockState::Locked => "lock",
            LockState::Unlocked => "unlock",
            LockState::Jammed => {
                return Err(Error::invalid_directive("cannot request a jammed lock state"));
            }
        };
        self.call("lock", service, json!({})).await
    }

    // -------------------------------------------------------------------------
    // Climate
    // -------------------------------------------------------------------------

    pub async fn get_current_temperature(&self) -> Result<Temperature> {
        self.require(Action::GetCurrentTemperature)?;
        let state = self.fetch().await?;
        let value = state.require_f64("current_temperature")?;
        Ok(Temperature::new(value, unit_of(&state)))
    }

    pub async fn get_temperature(&self) -> Result<(Temperature, String)> {
        self.require(Action::GetTemperature)?;
        let state = self.fetch().await?;
        let value = state.require_f64("temperature")?;
        Ok((Temperature::new(value, unit_of(&state)), state.state.clone()))
    }

    /// Sets an absolute target; `target` may be in any unit.
    pub async fn set_temperature(&self, target: Temperature) -> Result<ThermostatChange> {
        self.require(Action::SetTemperature)?;
        let state = self.fetch().await?;
        let unit = unit_of(&state);
        let (lo, hi) = temperature_bounds(&state, unit);
        let value = target.to(unit).value;

        if !(lo..=hi).contains(&value) {
            return Err(Error::TemperatureOutOfRange {
                min: Temperature::new(lo, unit),
                max: Temperature::new(hi, unit),
            });
        }
        self.write_temperature(&state, unit, value).await
    }

    /// Applies a relative change; `delta` may be in any unit.
    pub async fn adjust_temperature(&self, delta: Temperature) -> Result<ThermostatChange> {
        self.require(Action::SetTemperature)?;
        let state = self.fetch().await?;
        let unit = unit_of(&state);
        let (lo, hi) = temperature_bounds(&state, unit);
        let current = state.require_f64("temperature")?;
        let delta = convert::convert_temperature_delta(delta.value, delta.scale, unit);

        let value = apply_relative(current, delta, lo, hi).map_err(|e| match e {
            Error::ValueOutOfRange { min, max } => Error::TemperatureOutOfRange {
                min: Temperature::new(min, unit),
                max: Temperature::new(max, unit),
            },
            other => other,
        })?;
        self.write_temperature(&state, unit, value).await
    }

    async fn write_temperature(
        &self,
        state: &EntityState,
        unit: TemperatureUnit,
        value: f64,
    ) -> Result<ThermostatChange> {
        let previous = state
            .attribute_f64("temperature")
            .map(|t| Temperature::new(t, unit));
        let outcome = self
            .call("climate", "set_temperature", json!({ "temperature": value }))
            .await?;

        Ok(ThermostatChange {
            target: Temperature::new(value, unit),
            previous,
            mode: state.state.clone(),
            outcome,
        })
    }

    // -------------------------------------------------------------------------
    // Colour
    // -------------------------------------------------------------------------

    pub async fn get_color_temperature(&self) -> Result<u32> {
        self.require(Action::GetColorTemperature)?;
        let state = self.fetch().await?;
        let mireds = state.require_f64("color_temp")?;
        Ok(convert::mireds_to_kelvin(mireds).round() as u32)
    }

    pub async fn set_color_temperature(&self, kelvin: f64) -> Result<PostOutcome> {
        self.require(Action::SetColorTemperature)?;
        let state = self.fetch().await?;
        let (lo, hi) = kelvin_bounds(&state);
        let kelvin = ensure_in_range(kelvin, lo, hi)?;
        let mireds = convert::kelvin_to_mireds(kelvin).round() as u32;
        self.call("light", "turn_on", json!({ "color_temp": mireds }))
            .await
    }

    /// Returns the new Kelvin value after the relative-adjustment policy.
    pub async fn adjust_color_temperature(&self, delta: f64) -> Result<(u32, PostOutcome)> {
        self.require(Action::SetColorTemperature)?;
        let state = self.fetch().await?;
        let (lo, hi) = kelvin_bounds(&state);
        let current = state
            .attribute_f64("color_temp")
            .map(convert::mireds_to_kelvin)
            .unwrap_or(lo);
        let kelvin = apply_relative(current, delta, lo, hi)?;
        let mireds = convert::kelvin_to_mireds(kelvin).round() as u32;
        let outcome = self
            .call("light", "turn_on", json!({ "color_temp": mireds }))
            .await?;
        Ok((kelvin.round() as u32, outcome))
    }

    pub async fn set_color(&self, color: Hsb) -> Result<PostOutcome> {
        self.require(Action::SetColor)?;
        let rgb = color.to_rgb();
        self.call("light", "turn_on", json!({ "rgb_color": rgb }))
            .await
    }

    // -------------------------------------------------------------------------
    // State report
    // -------------------------------------------------------------------------

    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        let state = self.fetch().await?;
        Ok(snapshot_of(self.kind, self.features, &state))
    }
}

fn snapshot_of(kind: AdapterKind, features: u32, state: &EntityState) -> StateSnapshot {
    let has = |action| capability::supports(kind, features, action);
    let unit = unit_of(state);

    StateSnapshot {
        power: has(Action::TurnOn)
            .then(|| !matches!(state.state.as_str(), "off" | "closed" | "unavailable")),
        percentage: if has(Action::GetPercentage) {
            percentage_of(kind, state).ok()
        } else {
            None
        },
        lock: has(Action::GetLockState).then(|| LockState::from_hass(&state.state)),
        current_temperature: has(Action::GetCurrentTemperature)
            .then(|| state.attribute_f64("current_temperature"))
            .flatten()
            .map(|t| Temperature::new(t, unit)),
        target_temperature: has(Action::GetTemperature)
            .then(|| state.attribute_f64("temperature"))
            .flatten()
            .map(|t| Temperature::new(t, unit)),
        color_temperature: has(Action::GetColorTemperature)
            .then(|| state.attribute_f64("color_temp"))
            .flatten()
            .map(|m| convert::mireds_to_kelvin(m).round() as u32),
        reachable: state.state != "unavailable",
    }
}

// =============================================================================
// State readers
// =============================================================================

fn percentage_of(kind: AdapterKind, state: &EntityState) -> Result<f64> {
    let percent = match kind {
        AdapterKind::Light => {
            if state.state == "off" {
                0.0
            } else {
                convert::brightness_to_percent(state.attribute_f64("brightness").unwrap_or(0.0))
            }
        }
        AdapterKind::MediaPlayer => {
            convert::volume_to_percent(state.attribute_f64("volume_level").unwrap_or(0.0))
        }
        AdapterKind::Fan => {
            if state.state == "off" {
                0.0
            } else {
                state
                    .attribute_str("speed")
                    .and_then(|s| s.parse::<FanSpeed>().ok())
                    .unwrap_or(FanSpeed::Off)
                    .percent()
            }
        }
        AdapterKind::InputSlider => {
            let value = state.state_f64().ok_or_else(|| {
                Error::HubResponse(format!("{} has a non-numeric state", state.entity_id))
            })?;
            let min = state.attribute_f64("min").unwrap_or(0.0);
            let max = state.attribute_f64("max").unwrap_or(100.0);
            convert::slider_to_percent(value, min, max)
        }
        _ => {
            return Err(Error::unsupported(
                &state.entity_id,
                Action::GetPercentage.into(),
            ));
        }
    };
    Ok(percent)
}

/// Climate entities without a unit are assumed to report Celsius.
fn unit_of(state: &EntityState) -> TemperatureUnit {
    state
        .attribute_str("unit_of_measurement")
        .and_then(TemperatureUnit::from_hass)
        .unwrap_or(TemperatureUnit::Celsius)
}

fn temperature_bounds(state: &EntityState, unit: TemperatureUnit) -> (f64, f64) {
    let (default_lo, default_hi) = match unit {
        TemperatureUnit::Celsius => (7.0, 35.0),
        TemperatureUnit::Fahrenheit => (45.0, 95.0),
    };
    (
        state.attribute_f64("min_temp").unwrap_or(default_lo),
        state.attribute_f64("max_temp").unwrap_or(default_hi),
    )
}

/// Larger mireds means warmer light, so `max_mireds` gives the Kelvin floor.
fn kelvin_bounds(state: &EntityState) -> (f64, f64) {
    let lo = state
        .attribute_f64("max_mireds")
        .map(convert::mireds_to_kelvin)
        .unwrap_or(2000.0);
    let hi = state
        .attribute_f64("min_mireds")
        .map(convert::mireds_to_kelvin)
        .unwrap_or(6500.0);
    (lo.round(), hi.round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn hub() -> HubClient {
        HubClient::new(&Config::new("http://127.0.0.1:9", "").unwrap()).unwrap()
    }

    fn state(entity_id: &str, state: &str, attributes: Value) -> EntityState {
        serde_json::from_value(json!({
            "entity_id": entity_id,
            "state": state,
            "attributes": attributes,
        }))
        .unwrap()
    }

    #[test]
    fn factory_selects_kind_by_domain() {
        let hub = hub();
        let cases = [
            ("switch.a", AdapterKind::Toggle),
            ("group.all", AdapterKind::Toggle),
            ("lock.front_door", AdapterKind::Lock),
            ("light.kitchen", AdapterKind::Light),
            ("garage_door.main", AdapterKind::GarageDoor),
            ("input_number.level", AdapterKind::InputSlider),
            ("climate.hall", AdapterKind::Climate),
        ];
        for (entity_id, kind) in cases {
            let adapter = make_adapter(&hub, entity_id, 0, DomainPolicy::Strict).unwrap();
            assert_eq!(adapter.kind(), kind, "{entity_id}");
        }
    }

    #[test]
    fn unknown_domain_depends_on_policy() {
        let hub = hub();
        assert!(matches!(
            make_adapter(&hub, "sensor.outside", 0, DomainPolicy::Strict),
            Err(Error::UnknownDomain(domain)) if domain == "sensor"
        ));

        let fallback = make_adapter(&hub, "sensor.outside", 0, DomainPolicy::Permissive).unwrap();
        assert_eq!(fallback.kind(), AdapterKind::Toggle);
        assert_eq!(fallback.domain(), None);
        assert_eq!(fallback.toggle_domain(), "homeassistant");
        assert!(fallback.supports(Action::TurnOn));
        assert!(!fallback.supports(Action::SetPercentage));
    }

    #[test]
    fn group_toggles_through_homeassistant() {
        let hub = hub();
        let group = make_adapter(&hub, "group.downstairs", 0, DomainPolicy::Strict).unwrap();
        assert_eq!(group.toggle_domain(), "homeassistant");
        let switch = make_adapter(&hub, "switch.fan", 0, DomainPolicy::Strict).unwrap();
        assert_eq!(switch.toggle_domain(), "switch");
    }

    #[tokio::test]
    async fn lock_rejects_power_before_touching_the_hub() {
        // port 9 is never answered; reaching the hub would be a transport error instead
        let hub = hub();
        let lock = make_adapter(&hub, "lock.front_door", 0, DomainPolicy::Strict).unwrap();
        assert!(matches!(
            lock.turn_off().await,
            Err(Error::UnsupportedOperation { operation: "turn_off", .. })
        ));
        assert!(matches!(
            lock.turn_on().await,
            Err(Error::UnsupportedOperation { operation: "turn_on", .. })
        ));
    }

    #[tokio::test]
    async fn out_of_range_percentage_is_rejected_locally() {
        let hub = hub();
        let light = make_adapter(&hub, "light.kitchen", 0, DomainPolicy::Strict).unwrap();
        assert!(matches!(
            light.set_percentage(120.0).await,
            Err(Error::ValueOutOfRange { min, max }) if min == 0.0 && max == 100.0
        ));
    }

    #[test]
    fn percentage_readers() {
        let light = state("light.kitchen", "on", json!({ "brightness": 128 }));
        let p = percentage_of(AdapterKind::Light, &light).unwrap();
        assert!((p - 50.196).abs() < 0.01);

        let off = state("light.kitchen", "off", json!({}));
        assert_eq!(percentage_of(AdapterKind::Light, &off).unwrap(), 0.0);

        let player = state("media_player.den", "playing", json!({ "volume_level": 0.25 }));
        assert_eq!(percentage_of(AdapterKind::MediaPlayer, &player).unwrap(), 25.0);

        let fan = state("fan.ceiling", "on", json!({ "speed": "medium" }));
        assert_eq!(percentage_of(AdapterKind::Fan, &fan).unwrap(), 66.0);

        let slider = state("input_slider.level", "15", json!({ "min": 10, "max": 20 }));
        assert_eq!(percentage_of(AdapterKind::InputSlider, &slider).unwrap(), 50.0);

        let switch = state("switch.a", "on", json!({}));
        assert!(percentage_of(AdapterKind::Toggle, &switch).is_err());
    }

    #[test]
    fn lock_states() {
        assert_eq!(LockState::from_hass("locked"), LockState::Locked);
        assert_eq!(LockState::from_hass("unlocked"), LockState::Unlocked);
        assert_eq!(LockState::from_hass("unavailable"), LockState::Jammed);
        assert_eq!(LockState::Locked.as_ref(), "LOCKED");
    }

    #[test]
    fn climate_bounds_and_units() {
        let climate = state(
            "climate.hall",
            "heat",
            json!({ "min_temp": 50, "max_temp": 80, "unit_of_measurement": "°F" }),
        );
        let unit = unit_of(&climate);
        assert_eq!(unit, TemperatureUnit::Fahrenheit);
        assert_eq!(temperature_bounds(&climate, unit), (50.0, 80.0));

        let bare = state("climate.attic", "cool", json!({}));
        assert_eq!(unit_of(&bare), TemperatureUnit::Celsius);
        assert_eq!(temperature_bounds(&bare, TemperatureUnit::Celsius), (7.0, 35.0));
    }

    #[test]
    fn snapshot_reads_only_implemented_getters() {
        let light = state(
            "light.desk",
            "on",
            json!({ "brightness": 255, "color_temp": 250 }),
        );
        let snapshot = snapshot_of(AdapterKind::Light, LIGHT_SUPPORT_COLOR_TEMP, &light);
        assert_eq!(snapshot.power, Some(true));
        assert_eq!(snapshot.percentage, Some(100.0));
        assert_eq!(snapshot.color_temperature, Some(4000));
        assert_eq!(snapshot.lock, None);
        assert!(snapshot.reachable);

        let lock = state("lock.front_door", "locked", json!({}));
        let snapshot = snapshot_of(AdapterKind::Lock, 0, &lock);
        assert_eq!(snapshot.power, None);
        assert_eq!(snapshot.lock, Some(LockState::Locked));

        let climate = state(
            "climate.hall",
            "heat",
            json!({ "current_temperature": 19.5, "temperature": 21 }),
        );
        let snapshot = snapshot_of(AdapterKind::Climate, 0, &climate);
        assert_eq!(snapshot.current_temperature, Some(Temperature::celsius(19.5)));
        assert_eq!(snapshot.target_temperature, Some(Temperature::celsius(21.0)));
    }

    #[test]
    fn kelvin_bounds_follow_mireds() {
        let light = state(
            "light.desk",
            "on",
            json!({ "min_mireds": 153, "max_mireds": 500 }),
        );
        assert_eq!(kelvin_bounds(&light), (2000.0, 6536.0));
    }
}
