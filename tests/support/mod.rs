//! In-process stand-in for the Home Assistant REST API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alexa_hass::{Config, Dispatcher};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub body: Value,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct HubState {
    entities: Mutex<Vec<Value>>,
    calls: Mutex<Vec<ServiceCall>>,
    service_delay: Duration,
}

/// Shuts the server down when dropped.
pub struct FakeHub {
    pub addr: SocketAddr,
    state: Arc<HubState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl FakeHub {
    pub async fn start(entities: Vec<Value>) -> Self {
        Self::start_with_delay(entities, Duration::ZERO).await
    }

    /// Service calls are recorded immediately but answered after `delay`.
    pub async fn start_with_delay(entities: Vec<Value>, delay: Duration) -> Self {
        let state = Arc::new(HubState {
            entities: Mutex::new(entities),
            calls: Mutex::new(Vec::new()),
            service_delay: delay,
        });

        let router = Router::new()
            .route("/api/states", get(list_states))
            .route("/api/states/{entity_id}", get(get_state))
            .route("/api/services/{domain}/{service}", post(call_service))
            .route("/api/alexa/smart_home", post(smart_home))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> Config {
        Config::new(&self.base_url(), "test-token").unwrap()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.config()).unwrap()
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Polls until at least `count` service calls arrived.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<ServiceCall> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.calls()
    }
}

impl Drop for FakeHub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn list_states(State(state): State<Arc<HubState>>) -> Json<Value> {
    Json(Value::Array(state.entities.lock().unwrap().clone()))
}

async fn get_state(
    State(state): State<Arc<HubState>>,
    Path(entity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .entities
        .lock()
        .unwrap()
        .iter()
        .find(|e| e["entity_id"] == entity_id.as_str())
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Entity not found." })),
            )
        })
}

async fn call_service(
    State(state): State<Arc<HubState>>,
    Path((domain, service)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.calls.lock().unwrap().push(ServiceCall {
        domain,
        service,
        body,
        authorization,
    });
    if !state.service_delay.is_zero() {
        tokio::time::sleep(state.service_delay).await;
    }
    Json(json!([]))
}

async fn smart_home(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "proxied": body }))
}

// =============================================================================
// Entity fixtures
// =============================================================================

pub fn entity(entity_id: &str, state: &str, attributes: Value) -> Value {
    json!({
        "entity_id": entity_id,
        "state": state,
        "attributes": attributes,
    })
}

/// A small house: one of each commonly exposed domain plus a few that must
/// never be discovered.
pub fn house() -> Vec<Value> {
    vec![
        entity(
            "light.kitchen",
            "on",
            json!({
                "friendly_name": "Kitchen",
                "brightness": 242,
                "supported_features": 16,
            }),
        ),
        entity(
            "light.desk",
            "on",
            json!({
                "friendly_name": "Desk Lamp",
                "brightness": 255,
                "color_temp": 250,
                "min_mireds": 153,
                "max_mireds": 500,
                "supported_features": 2,
            }),
        ),
        entity("lock.front_door", "locked", json!({ "friendly_name": "Front Door" })),
        entity(
            "climate.hall",
            "heat",
            json!({
                "friendly_name": "Hall",
                "current_temperature": 19.5,
                "temperature": 21,
                "min_temp": 7,
                "max_temp": 35,
                "unit_of_measurement": "°C",
            }),
        ),
        entity("switch.outlet", "off", json!({ "friendly_name": "Outlet" })),
        entity("scene.movie_night", "scening", json!({ "friendly_name": "Movie Night" })),
        entity("switch.hidden", "off", json!({ "friendly_name": "Hidden", "alexa_hidden": true })),
        entity("sensor.outside", "12", json!({ "friendly_name": "Outside" })),
    ]
}

pub fn v3_directive(namespace: &str, name: &str, entity_id: Option<&str>, payload: Value) -> Value {
    let mut directive = json!({
        "directive": {
            "header": {
                "namespace": namespace,
                "name": name,
                "payloadVersion": "3",
                "messageId": "1bd5d003-31b9-476f-ad03-71d471922820",
                "correlationToken": "dFMb0z+PgpgdDmluhJ1LddFvSqZ/jCc8ptlAKulUj90jSqg=="
            },
            "payload": payload
        }
    });
    if let Some(entity_id) = entity_id {
        directive["directive"]["endpoint"] = json!({
            "endpointId": entity_id.replacen('.', "#", 1),
            "cookie": { "entity_id": entity_id }
        });
    }
    directive
}

pub fn v2_request(namespace: &str, name: &str, entity_id: Option<&str>, payload: Value) -> Value {
    let mut payload = payload;
    payload["accessToken"] = json!("");
    if let Some(entity_id) = entity_id {
        payload["appliance"] = json!({
            "applianceId": alexa_hass::protocol::v2::appliance_id(entity_id),
            "additionalApplianceDetails": { "entity_id": entity_id }
        });
    }
    json!({
        "header": {
            "messageId": "01ebf625-0b89-4c4d-b3aa-32340e894688",
            "name": name,
            "namespace": namespace,
            "payloadVersion": "2"
        },
        "payload": payload
    })
}

/// A local address that refuses connections.
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn unreachable_dispatcher(url: &str) -> Dispatcher {
    Dispatcher::new(Config::new(url, "test-token").unwrap()).unwrap()
}

/// Accepts connections and never answers. Returns the address and every byte
/// received so far.
pub async fn silent_listener() -> (SocketAddr, Arc<Mutex<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let sink = sink.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    if socket.readable().await.is_err() {
                        break;
                    }
                    match socket.try_read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => sink.lock().unwrap().extend_from_slice(&buf[..n]),
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                        Err(_) => break,
                    }
                }
            });
        }
    });

    (addr, received)
}
