use thiserror::Error;

use crate::convert::Temperature;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong while turning a directive into hub calls.
///
/// The dispatcher is the only place these are turned into wire payloads; the
/// `Display` text is for logs and is never copied into an enum-valued field.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot reach Home Assistant at {url}: {source}")]
    HubUnreachable {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Home Assistant returned HTTP {status} for {endpoint}: {body}")]
    HubHttp {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("unexpected response from Home Assistant: {0}")]
    HubResponse(String),

    #[error("value out of range [{min}, {max}]")]
    ValueOutOfRange { min: f64, max: f64 },

    #[error("temperature out of range [{min}, {max}]")]
    TemperatureOutOfRange { min: Temperature, max: Temperature },

    #[error("{entity_id} does not support {operation}")]
    UnsupportedOperation {
        entity_id: String,
        operation: &'static str,
    },

    #[error("no adapter for domain '{0}'")]
    UnknownDomain(String),

    #[error("invalid directive: {0}")]
    InvalidDirective(String),

    /// Reading the configuration file or binding the listener.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn unsupported(entity_id: impl Into<String>, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            entity_id: entity_id.into(),
            operation,
        }
    }

    pub fn invalid_directive(message: impl Into<String>) -> Self {
        Self::InvalidDirective(message.into())
    }

    /// True when the hub answered 404 for a single entity lookup.
    pub fn is_missing_entity(&self) -> bool {
        matches!(self, Self::HubHttp { status: 404, endpoint, .. } if endpoint.starts_with("states/"))
    }
}
