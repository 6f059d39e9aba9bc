//! Alexa smart home directives on top of the Home Assistant REST API.
//!
//! A [`Dispatcher`] takes a raw directive (v2 `Alexa.ConnectedHome.*` or v3
//! `Alexa.*Controller`), resolves the target entity to an adapter, performs
//! the matching service calls and renders the response envelope.

pub mod adapter;
pub mod capability;
pub mod config;
pub mod convert;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod server;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use hub::HubClient;
