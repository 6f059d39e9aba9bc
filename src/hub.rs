use std::task::Poll;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Body, Certificate, Client, Identity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tokio_util::task::TaskTracker;

use crate::config::{Config, Credential, TlsVerify};
use crate::error::{Error, Result};

// =============================================================================
// Entity state records
// =============================================================================

/// One record of `GET /api/states`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attribute(key).and_then(value_as_f64)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(|v| v.as_str())
    }

    /// Looks up a numeric attribute the adapter cannot work without.
    pub fn require_f64(&self, key: &str) -> Result<f64> {
        self.attribute_f64(key).ok_or_else(|| {
            Error::HubResponse(format!("{} has no numeric '{}' attribute", self.entity_id, key))
        })
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.attribute_str("friendly_name")
    }

    pub fn supported_features(&self) -> u32 {
        self.attribute_f64("supported_features")
            .map(|f| f as u32)
            .unwrap_or(0)
    }

    pub fn state_f64(&self) -> Option<f64> {
        parse_finite(&self.state)
    }
}

/// The domain is everything before the first `.`.
pub fn domain_of(entity_id: &str) -> &str {
    entity_id.split('.').next().unwrap_or(entity_id)
}

/// Home Assistant sometimes reports numbers as strings. `"NaN"` and `"inf"`
/// parse as floats but are not numbers here.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_finite(s),
        _ => None,
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Attribute flags may be booleans, numbers or strings like `"true"`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        _ => false,
    }
}

// =============================================================================
// Home Assistant REST client
// =============================================================================

/// Result of a write that may not wait for the hub's answer.
///
/// A transport or HTTP failure is the `Err` side of the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    /// The hub answered with a 2xx status.
    Acknowledged(Value),
    /// The request went out but the answer was not awaited.
    SentUnconfirmed,
}

#[derive(Clone)]
pub struct HubClient {
    base_url: String,
    http_client: Client,
    fire_and_forget_timeout: Duration,
    connect_timeout: Duration,
    /// Writes still running after they were reported `SentUnconfirmed`.
    pending: TaskTracker,
}

impl HubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        match &config.credential {
            Credential::Bearer(token) => {
                headers.insert(header::AUTHORIZATION, sensitive(&format!("Bearer {}", token))?);
            }
            Credential::Password(password) => {
                headers.insert("x-ha-access", sensitive(password)?);
            }
            Credential::None => {}
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(Self::user_agent())
            .connect_timeout(config.connect_timeout);

        match &config.tls_verify {
            TlsVerify::Enabled(true) => {}
            TlsVerify::Enabled(false) => {
                tracing::warn!("TLS certificate verification is disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerify::CaBundle(path) => {
                let pem = read_pem(path)?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    Error::Configuration(format!("invalid CA bundle {}: {}", path.display(), e))
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }

        if let Some((cert_path, key_path)) = &config.client_cert {
            let mut pem = read_pem(cert_path)?;
            if key_path != cert_path {
                pem.push(b'\n');
                pem.extend(read_pem(key_path)?);
            }
            let identity = Identity::from_pem(&pem).map_err(|e| {
                Error::Configuration(format!(
                    "invalid client certificate {}: {}",
                    cert_path.display(),
                    e
                ))
            })?;
            builder = builder.identity(identity);
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.clone(),
            http_client,
            fire_and_forget_timeout: config.fire_and_forget_timeout,
            connect_timeout: config.connect_timeout,
            pending: TaskTracker::new(),
        })
    }

    pub fn user_agent() -> String {
        let region = std::env::var("AWS_DEFAULT_REGION").unwrap_or_default();
        format!(
            "Home Assistant Alexa Smart Home Skill - {} - alexa-hass/{}",
            region,
            env!("CARGO_PKG_VERSION")
        )
    }

    pub fn build_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        tracing::debug!(endpoint, "GET");
        let response = self
            .http_client
            .get(self.build_url(endpoint))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::read_json(endpoint, response).await
    }

    /// Posts `body`; with `wait == false` the answer is only awaited for the
    /// configured fire-and-forget window.
    ///
    /// The window starts once the request has been written. Connecting, the
    /// TLS handshake and the write itself are bounded by the connect timeout
    /// and their failures are errors, never `SentUnconfirmed`.
    pub async fn post(&self, endpoint: &str, body: &Value, wait: bool) -> Result<PostOutcome> {
        tracing::debug!(endpoint, %body, wait, "POST");
        let url = self.build_url(endpoint);

        if wait {
            let response = self
                .http_client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            return Self::read_json(endpoint, response)
                .await
                .map(PostOutcome::Acknowledged);
        }

        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::HubResponse(format!("cannot encode body for {}: {}", endpoint, e)))?;
        let (written_tx, written_rx) = oneshot::channel();
        let request = self
            .http_client
            .post(url)
            .body(signalling_body(bytes, written_tx));

        let client = self.clone();
        let owned_endpoint = endpoint.to_string();
        let mut task = self.pending.spawn(async move {
            let response = request
                .send()
                .await
                .map_err(|e| client.transport_error(e))?;
            Self::read_json(&owned_endpoint, response).await
        });

        let written = tokio::select! {
            joined = &mut task => {
                return Self::joined(endpoint, joined).map(PostOutcome::Acknowledged);
            }
            written = written_rx => written.is_ok(),
            _ = tokio::time::sleep(self.connect_timeout) => {
                task.abort();
                return Err(Error::HubUnreachable {
                    url: self.base_url.clone(),
                    source: format!(
                        "request to {} was not sent within {:?}",
                        endpoint, self.connect_timeout
                    )
                    .into(),
                });
            }
        };
        if !written {
            // body dropped unsent; the task reports why
            return Self::joined(endpoint, task.await).map(PostOutcome::Acknowledged);
        }

        match tokio::time::timeout(self.fire_and_forget_timeout, &mut task).await {
            Ok(joined) => Self::joined(endpoint, joined).map(PostOutcome::Acknowledged),
            Err(_) => {
                tracing::debug!(endpoint, "request sent without waiting for response");
                let endpoint = endpoint.to_string();
                self.pending.spawn(async move {
                    match task.await {
                        Ok(Ok(_)) => tracing::debug!(%endpoint, "late response acknowledged"),
                        Ok(Err(error)) => {
                            tracing::warn!(%endpoint, %error, "unconfirmed request failed")
                        }
                        Err(error) => tracing::warn!(%endpoint, %error, "request task aborted"),
                    }
                });
                Ok(PostOutcome::SentUnconfirmed)
            }
        }
    }

    /// Waits for unconfirmed writes to settle, for at most the connect timeout.
    /// Front ends call this before the runtime shuts down.
    pub async fn flush(&self) {
        self.pending.close();
        if tokio::time::timeout(self.connect_timeout, self.pending.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                pending = self.pending.len(),
                "unconfirmed requests still running at exit"
            );
        }
        self.pending.reopen();
    }

    pub async fn states(&self) -> Result<Vec<EntityState>> {
        let value = self.get("states").await?;
        serde_json::from_value(value)
            .map_err(|e| Error::HubResponse(format!("cannot parse states: {}", e)))
    }

    pub async fn state(&self, entity_id: &str) -> Result<EntityState> {
        let value = self.get(&format!("states/{}", entity_id)).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::HubResponse(format!("cannot parse state of {}: {}", entity_id, e)))
    }

    /// `POST /api/services/<domain>/<service>` with `entity_id` merged into `data`.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        data: Value,
    ) -> Result<PostOutcome> {
        let mut body = json!({ "entity_id": entity_id });
        if let Value::Object(fields) = data {
            for (key, value) in fields {
                body[key] = value;
            }
        }
        self.post(&format!("services/{}/{}", domain, service), &body, false)
            .await
    }

    fn transport_error(&self, error: reqwest::Error) -> Error {
        Error::HubUnreachable {
            url: self.base_url.clone(),
            source: error.into(),
        }
    }

    fn joined(endpoint: &str, joined: std::result::Result<Result<Value>, JoinError>) -> Result<Value> {
        joined.map_err(|e| Error::HubResponse(format!("request task for {} failed: {}", endpoint, e)))?
    }

    async fn read_json(endpoint: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::HubHttp {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::HubResponse(format!("cannot read body of {}: {}", endpoint, e)))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::HubResponse(format!("invalid JSON from {}: {}", endpoint, e)))
    }
}

/// A single-chunk body that fires `written` once hyper has taken the chunk,
/// which only happens on an established connection.
fn signalling_body(bytes: Vec<u8>, written: oneshot::Sender<()>) -> Body {
    let mut written = Some(written);
    let chunk = stream::iter([Ok::<_, std::io::Error>(bytes)]);
    let done = stream::poll_fn(move |_| -> Poll<Option<std::io::Result<Vec<u8>>>> {
        if let Some(tx) = written.take() {
            let _ = tx.send(());
        }
        Poll::Ready(None)
    });
    Body::wrap_stream(chunk.chain(done))
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| Error::Configuration("credential contains invalid characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

fn read_pem(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Configuration(format!("cannot read {}: {}", path.display(), e)))
}
