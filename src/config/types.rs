use crate::core::network::types::Leg;
use crate::core::network::url::{build_target_url, format_authority};
use serde::Serialize;

/// Configuration errors, raised before any request is attempted
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
    #[error("invalid proxy URI {uri}: {reason}")]
    InvalidProxyUri { uri: String, reason: String },
    #[error("invalid target URL for {leg}: {reason}")]
    InvalidTarget { leg: Leg, reason: String },
    #[error("failed to render configuration: {0}")]
    Render(String),
}

/// Fully resolved harness configuration
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    pub proxy: ProxyEndpoint,
    pub credential: Credential,
    pub trust: TrustPolicy,
    pub targets: Targets,
    pub timeouts: Timeouts,
    pub checks: Checks,
}

/// Forward proxy address; the proxy link itself is always plain HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Proxy URI handed to the HTTP client, e.g. `http://127.0.0.1:8080`
    pub fn uri(&self) -> String {
        format!("http://{}", format_authority(&self.host, self.port))
    }
}

/// Username/password answered to the proxy's authentication challenge
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub username: String,
    #[serde(skip_serializing)]
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// TLS trust decision for this client instance only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrustPolicy {
    /// Accept any certificate chain and host name on TLS destinations
    pub skip_certificate_validation: bool,
}

impl TrustPolicy {
    pub fn trust_all() -> Self {
        Self {
            skip_certificate_validation: true,
        }
    }

    pub fn verify() -> Self {
        Self {
            skip_certificate_validation: false,
        }
    }
}

/// Backend endpoints requested through the proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Targets {
    pub host: String,
    pub http_port: u16,
    pub https_port: u16,
    pub path: String,
    /// Requested body size in bytes (`size` query parameter)
    pub size: usize,
}

impl Targets {
    pub fn port_for(&self, leg: Leg) -> u16 {
        match leg {
            Leg::HttpOverHttp => self.http_port,
            Leg::HttpsOverHttpTunnel => self.https_port,
        }
    }

    /// Fully-qualified URL requested by the given leg
    pub fn url_for(&self, leg: Leg) -> Result<String, ConfigError> {
        build_target_url(
            leg.scheme(),
            &self.host,
            self.port_for(leg),
            &self.path,
            self.size,
        )
        .map_err(|e| ConfigError::InvalidTarget {
            leg,
            reason: e.to_string(),
        })
    }
}

/// Transport timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeouts {
    /// Whole request, including tunnel setup and body transfer
    pub total_ms: u64,
    pub connect_ms: u64,
}

/// Optional response checks and output behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checks {
    /// Fail a leg whose body size differs from the requested size
    pub strict_body_size: bool,
    /// Write the TLS leg body to the output sink
    pub echo_body: bool,
}
