use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use strum::IntoEnumIterator;
use url::Url;

use crate::adapter::Domain;
use crate::error::{Error, Result};

// =============================================================================
// Raw file representation
// =============================================================================

/// `ssl_verify` is either a flag or the path to a CA bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TlsVerify {
    Enabled(bool),
    CaBundle(PathBuf),
}

impl Default for TlsVerify {
    fn default() -> Self {
        TlsVerify::Enabled(true)
    }
}

/// `ssl_client` is a combined PEM, a `[cert, key]` pair, or empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClientCert {
    Combined(String),
    Pair(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default, alias = "ha_url")]
    url: Option<String>,
    #[serde(default, alias = "token")]
    bearer_token: Option<String>,
    #[serde(default, alias = "ha_passwd")]
    password: Option<String>,
    #[serde(default, alias = "ha_cert")]
    ssl_verify: Option<TlsVerify>,
    #[serde(default)]
    ssl_client: Option<ClientCert>,
    #[serde(default)]
    debug: bool,
    #[serde(default, alias = "ha_allowed_entities")]
    exposed_domains: Option<Vec<String>>,
    #[serde(default)]
    expose_by_default: bool,
    #[serde(default, alias = "ha_entity_suffixes")]
    entity_suffixes: Option<HashMap<String, String>>,
    #[serde(default)]
    proxy: bool,
    #[serde(default)]
    fire_and_forget_ms: Option<u64>,
    #[serde(default)]
    connect_timeout_ms: Option<u64>,
}

// =============================================================================
// Validated configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    Bearer(String),
    /// Legacy `x-ha-access` header.
    Password(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL without the `/api` suffix or trailing slash.
    pub url: String,
    pub credential: Credential,
    pub tls_verify: TlsVerify,
    /// Paths to the client certificate and key (the same path twice for a combined PEM).
    pub client_cert: Option<(PathBuf, PathBuf)>,
    pub debug: bool,
    pub exposed_domains: Vec<String>,
    pub expose_by_default: bool,
    pub entity_suffixes: HashMap<String, String>,
    pub proxy: bool,
    pub fire_and_forget_timeout: Duration,
    /// Bound on connecting, the TLS handshake and writing a request.
    pub connect_timeout: Duration,
}

pub const DEFAULT_FIRE_AND_FORGET_MS: u64 = 250;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

impl Config {
    /// Reads a JSON or YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    /// Builds a configuration from just a URL and token, as given on the command line.
    pub fn new(url: &str, token: &str) -> Result<Self> {
        Self::from_raw(RawConfig {
            url: Some(url.to_string()),
            bearer_token: Some(token.to_string()),
            ..Default::default()
        })
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let url = normalize_url(raw.url.as_deref().unwrap_or_default())?;

        let credential = match (raw.bearer_token, raw.password) {
            (Some(token), _) if !token.is_empty() => Credential::Bearer(token),
            (_, Some(password)) if !password.is_empty() => Credential::Password(password),
            _ => Credential::None,
        };

        let client_cert = match raw.ssl_client {
            Some(ClientCert::Combined(path)) if !path.is_empty() => {
                Some((PathBuf::from(&path), PathBuf::from(path)))
            }
            Some(ClientCert::Pair(paths)) => match paths.as_slice() {
                [] => None,
                [combined] => Some((PathBuf::from(combined), PathBuf::from(combined))),
                [cert, key] => Some((PathBuf::from(cert), PathBuf::from(key))),
                _ => {
                    return Err(Error::Configuration(
                        "ssl_client must be a path or a [cert, key] pair".into(),
                    ));
                }
            },
            _ => None,
        };

        let exposed_domains = raw.exposed_domains.unwrap_or_else(|| {
            Domain::iter()
                .map(|d| d.as_ref().to_string())
                .collect()
        });

        let entity_suffixes = raw.entity_suffixes.unwrap_or_else(|| {
            HashMap::from([
                ("group".to_string(), "Group".to_string()),
                ("scene".to_string(), "Scene".to_string()),
            ])
        });

        Ok(Self {
            url,
            credential,
            tls_verify: raw.ssl_verify.unwrap_or_default(),
            client_cert,
            debug: raw.debug,
            exposed_domains,
            expose_by_default: raw.expose_by_default,
            entity_suffixes,
            proxy: raw.proxy,
            fire_and_forget_timeout: Duration::from_millis(
                raw.fire_and_forget_ms.unwrap_or(DEFAULT_FIRE_AND_FORGET_MS),
            ),
            connect_timeout: Duration::from_millis(
                raw.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
        })
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.credential = Credential::Bearer(token.to_string());
        self
    }

    /// A domain is exposed when it has an adapter and the policy lets it through.
    pub fn is_domain_exposed(&self, domain: &str) -> bool {
        if domain.parse::<Domain>().is_err() {
            return false;
        }
        self.expose_by_default || self.exposed_domains.iter().any(|d| d == domain)
    }

    pub fn suffix_for(&self, domain: &str) -> Option<&str> {
        self.entity_suffixes
            .get(domain)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(text)
            .map_err(|e| Error::Configuration(format!("invalid configuration: {}", e)))?;
        Self::from_raw(raw)
    }
}

/// Strips trailing slashes and a trailing `/api`, since every request path
/// appends `/api/...` itself.
pub fn normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');

    if trimmed.is_empty() {
        return Err(Error::Configuration(
            "property \"url\" is missing in config".into(),
        ));
    }

    Url::parse(trimmed)
        .map_err(|e| Error::Configuration(format!("invalid url '{}': {}", trimmed, e)))?;

    Ok(trimmed.to_string())
}
