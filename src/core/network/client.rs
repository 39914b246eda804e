//! Proxy-routed probe client
//!
//! Every request goes through the configured forward proxy. libcurl relays
//! `http://` targets in absolute form and opens a CONNECT tunnel for
//! `https://` targets, so both legs share one client and one proxy setup.

use crate::config::{Credential, HarnessConfig, ProxyEndpoint, Timeouts, TrustPolicy};
use crate::core::network::types::{ProbeError, ProbeResponse, VerificationResult};
use std::time::{Duration, Instant};

use isahc::auth::{Authentication, Credentials};
use isahc::config::{Configurable, RedirectPolicy, SslOption};
use isahc::error::ErrorKind;
use isahc::{HttpClient, ReadResponseExt, Request, ResponseExt};

/// Blocking GET client abstraction so the verifier can run against a scripted client
pub trait ProbeClient {
    /// Execute a GET and read the complete response
    ///
    /// # Returns
    /// * `Ok(ProbeResponse)` - Any HTTP response, whatever its status
    /// * `Err(String)` - Connection, tunnel, TLS or body-read failure
    fn get(&self, url: &str) -> Result<ProbeResponse, String>;
}

/// Production client: isahc bound to one proxy, one credential and one trust policy
pub struct IsahcProbeClient {
    client: HttpClient,
    proxy_uri: String,
}

impl IsahcProbeClient {
    /// Build the client from a resolved configuration
    pub fn from_config(config: &HarnessConfig) -> Result<Self, ProbeError> {
        Self::new(&config.proxy, &config.credential, config.trust, config.timeouts)
    }

    pub fn new(
        proxy: &ProxyEndpoint,
        credential: &Credential,
        trust: TrustPolicy,
        timeouts: Timeouts,
    ) -> Result<Self, ProbeError> {
        let proxy_uri = proxy.uri();
        let uri = proxy_uri
            .parse::<isahc::http::Uri>()
            .map_err(|e| ProbeError::ClientBuild(format!("invalid proxy URI {}: {}", proxy_uri, e)))?;

        let mut builder = HttpClient::builder()
            .proxy(Some(uri))
            // Empty list: never bypass the proxy, even if NO_PROXY is set
            .proxy_blacklist(Vec::<String>::new())
            .proxy_authentication(Authentication::basic())
            .proxy_credentials(Credentials::new(
                credential.username.as_str(),
                credential.password(),
            ))
            .redirect_policy(RedirectPolicy::None)
            .timeout(Duration::from_millis(timeouts.total_ms))
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .metrics(true);

        if trust.skip_certificate_validation {
            builder = builder.ssl_options(
                SslOption::DANGER_ACCEPT_INVALID_CERTS | SslOption::DANGER_ACCEPT_INVALID_HOSTS,
            );
        }

        let client = builder
            .build()
            .map_err(|e| ProbeError::ClientBuild(e.to_string()))?;

        Ok(Self { client, proxy_uri })
    }

    pub fn proxy_uri(&self) -> &str {
        &self.proxy_uri
    }
}

impl ProbeClient for IsahcProbeClient {
    fn get(&self, url: &str) -> Result<ProbeResponse, String> {
        let start = Instant::now();

        let request = Request::get(url)
            .header("Accept", "*/*")
            .body(())
            .map_err(|e| format!("request creation failed: {}", e))?;

        let mut response = self
            .client
            .send(request)
            .map_err(|e| describe_transport_error(&e))?;

        let status_code = response.status().as_u16();

        let mut body = Vec::new();
        response
            .copy_to(&mut body)
            .map_err(|e| format!("failed to read response body: {}", e))?;

        let breakdown = response
            .metrics()
            .map(|m| {
                format_breakdown(
                    m.name_lookup_time(),
                    m.connect_time(),
                    m.secure_connect_time(),
                    m.transfer_start_time(),
                    m.total_time(),
                )
            })
            .unwrap_or_default();

        Ok(ProbeResponse {
            status_code,
            body,
            duration: start.elapsed(),
            breakdown,
        })
    }
}

/// Issue a GET through the client and decode the body as text
///
/// Transport failures are returned as-is; the caller attributes them to a leg.
pub fn perform(client: &dyn ProbeClient, url: &str) -> Result<VerificationResult, String> {
    let response = client.get(url)?;

    Ok(VerificationResult {
        status_code: response.status_code,
        body_bytes: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        duration: response.duration,
        breakdown: response.breakdown,
    })
}

/// Timing breakdown in stable numeric form: DNS|TCP|TLS|TTFB|Total
pub fn format_breakdown(
    dns: Duration,
    tcp: Duration,
    tls: Duration,
    ttfb: Duration,
    total: Duration,
) -> String {
    format!(
        "DNS:{}ms|TCP:{}ms|TLS:{}ms|TTFB:{}ms|Total:{}ms",
        dns.as_millis(),
        tcp.as_millis(),
        tls.as_millis(),
        ttfb.as_millis(),
        total.as_millis()
    )
}

fn describe_transport_error(error: &isahc::Error) -> String {
    let summary = match error.kind() {
        ErrorKind::Timeout => "request timed out",
        ErrorKind::ConnectionFailed => "connection failed",
        ErrorKind::NameResolution => "name resolution failed",
        ErrorKind::BadServerCertificate => "server certificate rejected",
        ErrorKind::TlsEngine => "TLS handshake failed",
        ErrorKind::InvalidCredentials => "proxy rejected credentials",
        ErrorKind::ProtocolViolation => "protocol violation",
        _ => "transport error",
    };
    format!("{} ({})", summary, error)
}
