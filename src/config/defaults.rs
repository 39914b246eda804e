// Harness defaults; only the three ports have no default and must come from the environment

use super::types::{Checks, Credential, Timeouts, TrustPolicy};

pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";
pub const DEFAULT_TARGET_HOST: &str = "localhost";
pub const DEFAULT_TARGET_PATH: &str = "/file/big";
pub const DEFAULT_BODY_SIZE: usize = 1024;

pub const DEFAULT_USERNAME: &str = "fake";
pub const DEFAULT_PASSWORD: &str = "token";

// No timeout is imposed by the invoking runner, so bound hangs here
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

impl Default for Credential {
    fn default() -> Self {
        Credential::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        TrustPolicy::trust_all()
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            total_ms: DEFAULT_TIMEOUT_MS,
            connect_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            strict_body_size: false,
            echo_body: true,
        }
    }
}
