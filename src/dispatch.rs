//! Directive dispatch.
//!
//! [`Dispatcher::handle`] is the single entry point for every front end: it
//! picks the wire generation, runs the operation against a fresh adapter and
//! always answers with an envelope, success or error.

use serde_json::Value;

use crate::adapter::make_adapter;
use crate::config::Config;
use crate::discovery;
use crate::error::{Error, Result};
use crate::hub::{HubClient, PostOutcome};
use crate::protocol::{self, Header, Operation, Protocol, Reply, V3};

/// Hub endpoint that accepts raw directives when running as a proxy.
pub const PROXY_ENDPOINT: &str = "alexa/smart_home";

const HEALTHY: &str = "The system is currently healthy";
const UNHEALTHY: &str = "Home Assistant is not reachable";

pub struct Dispatcher {
    hub: HubClient,
    config: Config,
}

impl Dispatcher {
    pub fn new(config: Config) -> Result<Self> {
        let hub = HubClient::new(&config)?;
        Ok(Self { hub, config })
    }

    pub fn hub(&self) -> &HubClient {
        &self.hub
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Never fails; every problem is rendered as the protocol's error envelope.
    pub async fn handle(&self, raw: &Value) -> Value {
        if self.config.proxy {
            return self.forward(raw).await;
        }

        let Some(protocol) = protocol::detect(raw) else {
            tracing::warn!("directive has no recognisable header");
            return V3.error(
                &Header::default(),
                &Error::invalid_directive("unrecognised directive shape"),
            );
        };

        let header = protocol.header(raw);
        tracing::info!(
            version = protocol.version(),
            namespace = %header.namespace,
            name = %header.name,
            entity_id = header.entity_id.as_deref().unwrap_or("-"),
            "handling directive"
        );

        match self.execute(protocol, &header, raw).await {
            Ok(reply) => protocol.respond(&header, reply),
            Err(error) => {
                log_failure(&header, &error);
                protocol.error(&header, &error)
            }
        }
    }

    async fn execute(
        &self,
        protocol: &'static dyn Protocol,
        header: &Header,
        raw: &Value,
    ) -> Result<Reply> {
        let operation = protocol.operation(header, raw)?;
        match operation {
            Operation::Discover => Ok(Reply::Discovery(
                discovery::discover(&self.hub, &self.config).await,
            )),
            Operation::HealthCheck => {
                let healthy = self.is_healthy().await;
                let description = if healthy { HEALTHY } else { UNHEALTHY };
                Ok(Reply::Health {
                    healthy,
                    description: description.to_string(),
                })
            }
            Operation::AcceptGrant => Ok(Reply::Ack),
            operation => self.control(protocol, header, operation).await,
        }
    }

    async fn control(
        &self,
        protocol: &'static dyn Protocol,
        header: &Header,
        operation: Operation,
    ) -> Result<Reply> {
        let entity_id = header
            .entity_id
            .as_deref()
            .ok_or_else(|| Error::invalid_directive("directive does not name an entity"))?;

        let features = if operation.needs_features() {
            self.hub.state(entity_id).await?.supported_features()
        } else {
            0
        };
        let adapter = make_adapter(&self.hub, entity_id, features, protocol.domain_policy())?;

        let reply = match operation {
            Operation::TurnOn => {
                adapter.turn_on().await?;
                Reply::Power(true)
            }
            Operation::TurnOff => {
                adapter.turn_off().await?;
                Reply::Power(false)
            }
            Operation::SetPercentage(percent) => {
                adapter.set_percentage(percent).await?;
                Reply::Percentage(percent)
            }
            Operation::AdjustPercentage(delta) => {
                let (percent, _) = adapter.adjust_percentage(delta).await?;
                Reply::Percentage(percent)
            }
            Operation::SetColor(color) => {
                adapter.set_color(color).await?;
                Reply::Color(color)
            }
            Operation::SetColorTemperature(kelvin) => {
                adapter.set_color_temperature(kelvin).await?;
                Reply::ColorTemperature(kelvin.round() as u32)
            }
            Operation::AdjustColorTemperature(delta) => {
                let (kelvin, _) = adapter.adjust_color_temperature(delta).await?;
                Reply::ColorTemperature(kelvin)
            }
            Operation::SetLockState(state) => {
                adapter.set_lock_state(state).await?;
                Reply::Lock(state)
            }
            Operation::GetLockState => Reply::Lock(adapter.get_lock_state().await?),
            Operation::SetTargetTemperature(target) => {
                Reply::Thermostat(adapter.set_temperature(target).await?)
            }
            Operation::AdjustTargetTemperature(delta) => {
                Reply::Thermostat(adapter.adjust_temperature(delta).await?)
            }
            Operation::GetTargetTemperature => {
                let (target, mode) = adapter.get_temperature().await?;
                Reply::TargetTemperature { target, mode }
            }
            Operation::GetTemperatureReading => {
                Reply::TemperatureReading(adapter.get_current_temperature().await?)
            }
            Operation::ReportState => Reply::State(adapter.snapshot().await?),
            other => {
                return Err(Error::invalid_directive(format!(
                    "{:?} does not target an entity",
                    other
                )));
            }
        };
        Ok(reply)
    }

    /// True when the hub answers the state listing.
    pub async fn is_healthy(&self) -> bool {
        match self.hub.states().await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(%error, "health check failed");
                false
            }
        }
    }

    /// Hands the raw directive to the hub's own smart home endpoint.
    pub async fn proxy(&self, raw: &Value) -> Result<Value> {
        match self.hub.post(PROXY_ENDPOINT, raw, true).await? {
            PostOutcome::Acknowledged(body) => Ok(body),
            PostOutcome::SentUnconfirmed => Err(Error::HubResponse(
                "proxied directive was not answered".into(),
            )),
        }
    }

    async fn forward(&self, raw: &Value) -> Value {
        match self.proxy(raw).await {
            Ok(body) => body,
            Err(error) => {
                tracing::error!(error = ?error, "proxying directive failed");
                let protocol = protocol::detect(raw).unwrap_or(&V3);
                protocol.error(&protocol.header(raw), &error)
            }
        }
    }
}

/// Rejections are expected traffic; everything else is logged with full detail.
fn log_failure(header: &Header, error: &Error) {
    let rejected = matches!(
        error,
        Error::ValueOutOfRange { .. }
            | Error::TemperatureOutOfRange { .. }
            | Error::UnsupportedOperation { .. }
            | Error::UnknownDomain(_)
            | Error::InvalidDirective(_)
    ) || error.is_missing_entity();

    if rejected {
        tracing::warn!(
            namespace = %header.namespace,
            name = %header.name,
            entity_id = header.entity_id.as_deref().unwrap_or("-"),
            %error,
            "directive rejected"
        );
    } else {
        tracing::error!(
            namespace = %header.namespace,
            name = %header.name,
            entity_id = header.entity_id.as_deref().unwrap_or("-"),
            error = ?error,
            "directive failed"
        );
    }
}
