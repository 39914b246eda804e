// Core types for proxy verification
use crate::config::ConfigError;
use std::time::Duration;

/// The two proxy paths a run verifies, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// Plain request relayed by the proxy in absolute form
    HttpOverHttp,
    /// TLS request carried through a CONNECT tunnel on the plain proxy link
    HttpsOverHttpTunnel,
}

impl Leg {
    /// URL scheme of the target this leg requests
    pub fn scheme(&self) -> &'static str {
        match self {
            Leg::HttpOverHttp => "http",
            Leg::HttpsOverHttpTunnel => "https",
        }
    }

    /// Short identifier used in log fields
    pub fn key(&self) -> &'static str {
        match self {
            Leg::HttpOverHttp => "http",
            Leg::HttpsOverHttpTunnel => "https_tunnel",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::HttpOverHttp => write!(f, "HTTP over HTTP"),
            Leg::HttpsOverHttpTunnel => write!(f, "HTTPS over HTTP tunnel"),
        }
    }
}

/// Raw response from a probe client
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// HTTP status code of the final response
    pub status_code: u16,
    /// Complete response body
    pub body: Vec<u8>,
    /// Wall-clock time from send to end of body
    pub duration: Duration,
    /// Timing breakdown (DNS|TCP|TLS|TTFB|Total format), empty when unavailable
    pub breakdown: String,
}

/// Result of a single `perform` call, consumed immediately by the verifier
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub status_code: u16,
    /// Body decoded as text (lossy for binary payloads)
    pub body: String,
    /// Number of body bytes actually received
    pub body_bytes: usize,
    pub duration: Duration,
    pub breakdown: String,
}

/// Per-leg summary kept after the response itself is discarded
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LegReport {
    pub leg: Leg,
    pub url: String,
    pub status_code: u16,
    pub body_bytes: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub breakdown: String,
    /// Set when the body size differs from the requested size (non-strict mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_mismatch: Option<usize>,
}

/// Outcome of a fully successful run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VerificationReport {
    pub proxy: String,
    pub legs: Vec<LegReport>,
    pub total_ms: u64,
    pub checked_at: String,
}

/// Errors that stop a verification run
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build proxy client: {0}")]
    ClientBuild(String),
    #[error("cannot reach {leg}: {message}")]
    Transport { leg: Leg, message: String },
    #[error("cannot reach {leg}: expected status 200, got {status}")]
    Verification { leg: Leg, status: u16 },
    #[error("{leg} returned {actual} bytes, expected {expected}")]
    BodySize {
        leg: Leg,
        expected: usize,
        actual: usize,
    },
    #[error("failed to write response body: {0}")]
    Output(#[from] std::io::Error),
}

impl ProbeError {
    /// The leg this error is attributed to, if any
    pub fn leg(&self) -> Option<Leg> {
        match self {
            ProbeError::Transport { leg, .. }
            | ProbeError::Verification { leg, .. }
            | ProbeError::BodySize { leg, .. } => Some(*leg),
            _ => None,
        }
    }
}

/// Parse boolean environment variables
///
/// Accepts true/false, 1/0, yes/no, on/off (case insensitive).
/// Unset, empty and unrecognized values are false.
pub fn parse_env_bool(env_var: &str) -> bool {
    std::env::var(env_var)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(false)
}

/// Local timezone RFC 3339 timestamp used in reports and log entries
pub fn get_local_timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}
