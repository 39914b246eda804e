//! Proxy verification protocol
//!
//! Runs the two legs in order on one client:
//! 1. `GET http://<target>/file/big?size=N` relayed by the proxy (HTTP over HTTP)
//! 2. `GET https://<target>/file/big?size=N` through a CONNECT tunnel
//!
//! The first failure ends the run; the TLS leg is never attempted when the
//! plain leg fails. The TLS body is written to the output sink before its
//! status is checked.

use crate::config::HarnessConfig;
use crate::core::network::client::{perform, ProbeClient};
use crate::core::network::debug_logger::{get_debug_logger, DebugLogger};
use crate::core::network::types::{
    get_local_timestamp, Leg, LegReport, ProbeError, VerificationReport, VerificationResult,
};
use crate::core::network::url::requires_tunnel;
use std::io::Write;
use std::time::Instant;

pub const EXPECTED_STATUS: u16 = 200;

/// Runs the verification protocol against a probe client
pub struct Verifier<'a> {
    client: &'a dyn ProbeClient,
    logger: DebugLogger,
}

impl<'a> Verifier<'a> {
    pub fn new(client: &'a dyn ProbeClient, logger: DebugLogger) -> Self {
        Self { client, logger }
    }

    /// Verify both proxy paths, writing the TLS body to `out`
    ///
    /// # Returns
    /// * `Ok(VerificationReport)` - Both legs answered 200
    /// * `Err(ProbeError)` - First failure, attributed to its leg
    pub fn run<W: Write>(
        &self,
        config: &HarnessConfig,
        out: &mut W,
    ) -> Result<VerificationReport, ProbeError> {
        let result = self.run_legs(config, out);
        if let Err(e) = &result {
            self.logger.verification_failed(e.leg(), &e.to_string());
        }
        result
    }

    fn run_legs<W: Write>(
        &self,
        config: &HarnessConfig,
        out: &mut W,
    ) -> Result<VerificationReport, ProbeError> {
        let start = Instant::now();
        let checked_at = get_local_timestamp();
        let mut legs = Vec::with_capacity(2);

        // HTTP over HTTP
        let leg = Leg::HttpOverHttp;
        let url = config.targets.url_for(leg)?;
        let result = self.execute(leg, &url)?;
        ensure_status(leg, &result)?;
        legs.push(self.leg_report(leg, url, &result, config)?);

        // HTTPS over HTTP tunnel
        let leg = Leg::HttpsOverHttpTunnel;
        let url = config.targets.url_for(leg)?;
        let result = self.execute(leg, &url)?;
        if config.checks.echo_body {
            writeln!(out, "{}", result.body)?;
            out.flush()?;
        }
        ensure_status(leg, &result)?;
        legs.push(self.leg_report(leg, url, &result, config)?);

        let total_ms = start.elapsed().as_millis() as u64;
        self.logger.performance("Verifier", "verification_complete", total_ms);

        Ok(VerificationReport {
            proxy: config.proxy.uri(),
            legs,
            total_ms,
            checked_at,
        })
    }

    fn execute(&self, leg: Leg, url: &str) -> Result<VerificationResult, ProbeError> {
        self.logger.leg_start(leg, url, requires_tunnel(url));

        let result = perform(self.client, url)
            .map_err(|message| ProbeError::Transport { leg, message })?;

        self.logger.leg_end(
            leg,
            result.status_code,
            result.body_bytes,
            result.duration.as_millis() as u64,
            &result.breakdown,
        );
        Ok(result)
    }

    fn leg_report(
        &self,
        leg: Leg,
        url: String,
        result: &VerificationResult,
        config: &HarnessConfig,
    ) -> Result<LegReport, ProbeError> {
        let expected = config.targets.size;
        let size_mismatch = if result.body_bytes != expected {
            if config.checks.strict_body_size {
                return Err(ProbeError::BodySize {
                    leg,
                    expected,
                    actual: result.body_bytes,
                });
            }
            self.logger.body_size_mismatch(leg, expected, result.body_bytes);
            Some(result.body_bytes)
        } else {
            None
        };

        Ok(LegReport {
            leg,
            url,
            status_code: result.status_code,
            body_bytes: result.body_bytes,
            elapsed_ms: result.duration.as_millis() as u64,
            breakdown: result.breakdown.clone(),
            size_mismatch,
        })
    }
}

fn ensure_status(leg: Leg, result: &VerificationResult) -> Result<(), ProbeError> {
    if result.status_code == EXPECTED_STATUS {
        Ok(())
    } else {
        Err(ProbeError::Verification {
            leg,
            status: result.status_code,
        })
    }
}

/// Run the protocol with the environment-configured debug logger
pub fn run_verification<W: Write>(
    client: &dyn ProbeClient,
    config: &HarnessConfig,
    out: &mut W,
) -> Result<VerificationReport, ProbeError> {
    Verifier::new(client, get_debug_logger()).run(config, out)
}
