//! Configuration resolution
//!
//! Ports come from the environment set up by the invoking test runner:
//! - `MASTER_PORT`: forward proxy port
//! - `SERVERS_PORT_HTTP`: plain backend port
//! - `SERVERS_PORT_HTTPS`: TLS backend port
//!
//! All three are required. CLI flags are layered on top afterwards.

use super::defaults::{DEFAULT_BODY_SIZE, DEFAULT_PROXY_HOST, DEFAULT_TARGET_HOST, DEFAULT_TARGET_PATH};
use super::types::{
    Checks, ConfigError, Credential, HarnessConfig, ProxyEndpoint, Targets, Timeouts, TrustPolicy,
};
use crate::cli::Cli;
use crate::core::network::types::Leg;

pub const ENV_PROXY_PORT: &str = "MASTER_PORT";
pub const ENV_HTTP_PORT: &str = "SERVERS_PORT_HTTP";
pub const ENV_HTTPS_PORT: &str = "SERVERS_PORT_HTTPS";

impl HarnessConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let proxy_port = read_port(&lookup, ENV_PROXY_PORT)?;
        let http_port = read_port(&lookup, ENV_HTTP_PORT)?;
        let https_port = read_port(&lookup, ENV_HTTPS_PORT)?;

        Ok(Self {
            proxy: ProxyEndpoint::new(DEFAULT_PROXY_HOST, proxy_port),
            credential: Credential::default(),
            trust: TrustPolicy::default(),
            targets: Targets {
                host: DEFAULT_TARGET_HOST.to_string(),
                http_port,
                https_port,
                path: DEFAULT_TARGET_PATH.to_string(),
                size: DEFAULT_BODY_SIZE,
            },
            timeouts: Timeouts::default(),
            checks: Checks::default(),
        })
    }

    /// Layer command line overrides on top of the environment values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.proxy_host {
            self.proxy.host = host.clone();
        }
        if let Some(host) = &cli.target_host {
            self.targets.host = host.clone();
        }
        if let Some(size) = cli.size {
            self.targets.size = size;
        }

        if cli.username.is_some() || cli.password.is_some() {
            let username = cli
                .username
                .clone()
                .unwrap_or_else(|| self.credential.username.clone());
            let password = cli
                .password
                .clone()
                .unwrap_or_else(|| self.credential.password().to_string());
            self.credential = Credential::new(username, password);
        }

        if cli.verify_certs {
            self.trust = TrustPolicy::verify();
        }
        if let Some(ms) = cli.timeout_ms {
            self.timeouts.total_ms = ms;
        }
        if let Some(ms) = cli.connect_timeout_ms {
            self.timeouts.connect_ms = ms;
        }

        self.checks.strict_body_size |= cli.strict_size;
        if cli.quiet {
            self.checks.echo_body = false;
        }
    }

    /// Validate the resolved configuration without touching the network
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.proxy.host.trim().is_empty() {
            return Err(ConfigError::InvalidProxyUri {
                uri: self.proxy.uri(),
                reason: "empty host".to_string(),
            });
        }
        let proxy_uri = self.proxy.uri();
        url::Url::parse(&proxy_uri).map_err(|e| ConfigError::InvalidProxyUri {
            uri: proxy_uri.clone(),
            reason: e.to_string(),
        })?;

        if !self.targets.path.starts_with('/') {
            return Err(ConfigError::Invalid {
                var: "path".to_string(),
                value: self.targets.path.clone(),
                reason: "must start with '/'".to_string(),
            });
        }
        for leg in [Leg::HttpOverHttp, Leg::HttpsOverHttpTunnel] {
            self.targets.url_for(leg)?;
        }

        if self.timeouts.total_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.timeouts.connect_ms == 0 || self.timeouts.connect_ms > self.timeouts.total_ms {
            return Err(ConfigError::Invalid {
                var: "connect_timeout_ms".to_string(),
                value: self.timeouts.connect_ms.to_string(),
                reason: format!("must be between 1 and {}", self.timeouts.total_ms),
            });
        }

        Ok(())
    }

    /// Render the resolved configuration as TOML (password omitted)
    pub fn render(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))
    }

    pub fn print(&self) -> Result<(), ConfigError> {
        print!("{}", self.render()?);
        Ok(())
    }
}

fn read_port<F>(lookup: &F, var: &str) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => parse_port(var, &raw),
        _ => Err(ConfigError::Missing(var.to_string())),
    }
}

/// Parse a TCP port, rejecting 0 and anything outside u16
pub fn parse_port(var: &str, raw: &str) -> Result<u16, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: var.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| invalid("expected an integer port between 1 and 65535"))?;
    if port == 0 {
        return Err(invalid("port 0 is not connectable"));
    }
    Ok(port)
}
