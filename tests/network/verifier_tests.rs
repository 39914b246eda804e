/*!
Tests for the verification protocol.

Runs the two-leg protocol against a scripted probe client: leg ordering,
status checks, leg attribution of failures, body echo and size checks.
*/

use crate::common::{config_for_ports, create_temp_dir, IsolatedEnv};
use proxyprobe::core::network::client::{perform, ProbeClient};
use proxyprobe::core::network::debug_logger::{DebugLogger, LogEntry};
use proxyprobe::core::network::types::{Leg, ProbeError, ProbeResponse};
use proxyprobe::core::network::verifier::{run_verification, Verifier};
use serial_test::serial;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

const HTTP_URL: &str = "http://localhost:8000/file/big?size=1024";
const HTTPS_URL: &str = "https://localhost:8443/file/big?size=1024";

#[derive(Default)]
struct ScriptedClient {
    responses: HashMap<String, Result<ProbeResponse, String>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedClient {
    fn respond(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            Ok(ProbeResponse {
                status_code: status,
                body: body.to_vec(),
                duration: Duration::from_millis(15),
                breakdown: "DNS:0ms|TCP:1ms|TLS:0ms|TTFB:10ms|Total:15ms".to_string(),
            }),
        );
        self
    }

    fn fail(mut self, url: &str, error: &str) -> Self {
        self.responses
            .insert(url.to_string(), Err(error.to_string()));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ProbeClient for ScriptedClient {
    fn get(&self, url: &str) -> Result<ProbeResponse, String> {
        self.calls.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err("URL not mocked".to_string()))
    }
}

fn body(size: usize) -> Vec<u8> {
    vec![b'x'; size]
}

fn verifier(client: &ScriptedClient) -> Verifier<'_> {
    Verifier::new(client, DebugLogger::disabled())
}

#[test]
fn test_both_legs_succeed_in_order() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .respond(HTTPS_URL, 200, &body(1024));
    let config = config_for_ports(8080, 8000, 8443);
    let mut out = Vec::new();

    let report = verifier(&client).run(&config, &mut out).unwrap();

    assert_eq!(client.calls(), vec![HTTP_URL.to_string(), HTTPS_URL.to_string()]);
    assert_eq!(report.proxy, "http://127.0.0.1:8080");
    assert_eq!(report.legs.len(), 2);
    assert_eq!(report.legs[0].leg, Leg::HttpOverHttp);
    assert_eq!(report.legs[0].url, HTTP_URL);
    assert_eq!(report.legs[1].leg, Leg::HttpsOverHttpTunnel);
    assert_eq!(report.legs[1].url, HTTPS_URL);
    assert_eq!(report.legs[1].elapsed_ms, 15);
    assert!(report.legs.iter().all(|leg| leg.size_mismatch.is_none()));

    let mut expected = body(1024);
    expected.push(b'\n');
    assert_eq!(out, expected);
}

#[test]
fn test_http_leg_status_failure_skips_tls_leg() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 503, b"unavailable")
        .respond(HTTPS_URL, 200, &body(1024));
    let config = config_for_ports(8080, 8000, 8443);
    let mut out = Vec::new();

    let err = verifier(&client).run(&config, &mut out).unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Verification {
            leg: Leg::HttpOverHttp,
            status: 503
        }
    ));
    assert_eq!(
        err.to_string(),
        "cannot reach HTTP over HTTP: expected status 200, got 503"
    );
    assert_eq!(client.calls(), vec![HTTP_URL.to_string()]);
    assert!(out.is_empty());
}

#[test]
fn test_tls_leg_status_failure_still_echoes_body() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .respond(HTTPS_URL, 502, b"bad gateway");
    let config = config_for_ports(8080, 8000, 8443);
    let mut out = Vec::new();

    let err = verifier(&client).run(&config, &mut out).unwrap_err();

    assert_eq!(err.leg(), Some(Leg::HttpsOverHttpTunnel));
    assert_eq!(
        err.to_string(),
        "cannot reach HTTPS over HTTP tunnel: expected status 200, got 502"
    );
    assert_eq!(out, b"bad gateway\n".to_vec());
}

#[test]
fn test_http_transport_error_is_attributed_to_http_leg() {
    let client = ScriptedClient::default()
        .fail(HTTP_URL, "connection failed (Connection refused)")
        .respond(HTTPS_URL, 200, &body(1024));
    let config = config_for_ports(8080, 8000, 8443);
    let mut out = Vec::new();

    let err = verifier(&client).run(&config, &mut out).unwrap_err();

    match &err {
        ProbeError::Transport { leg, message } => {
            assert_eq!(*leg, Leg::HttpOverHttp);
            assert!(message.contains("Connection refused"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("cannot reach HTTP over HTTP:"));
    assert_eq!(client.calls().len(), 1);
}

#[test]
fn test_tunnel_transport_error_is_attributed_to_tls_leg() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .fail(HTTPS_URL, "connection failed (CONNECT tunnel failed, response 502)");
    let config = config_for_ports(8080, 8000, 8443);
    let mut out = Vec::new();

    let err = verifier(&client).run(&config, &mut out).unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Transport {
            leg: Leg::HttpsOverHttpTunnel,
            ..
        }
    ));
    assert!(err.to_string().contains("HTTPS over HTTP tunnel"));
    assert!(out.is_empty());
}

#[test]
fn test_redirect_is_a_verification_failure() {
    let client = ScriptedClient::default().respond(HTTP_URL, 302, b"");
    let config = config_for_ports(8080, 8000, 8443);

    let err = verifier(&client).run(&config, &mut Vec::new()).unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Verification {
            leg: Leg::HttpOverHttp,
            status: 302
        }
    ));
}

#[test]
fn test_echo_disabled_writes_nothing() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .respond(HTTPS_URL, 200, &body(1024));
    let mut config = config_for_ports(8080, 8000, 8443);
    config.checks.echo_body = false;
    let mut out = Vec::new();

    verifier(&client).run(&config, &mut out).unwrap();

    assert!(out.is_empty());
}

#[test]
fn test_size_mismatch_is_reported_but_tolerated_by_default() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1000))
        .respond(HTTPS_URL, 200, &body(1024));
    let config = config_for_ports(8080, 8000, 8443);

    let report = verifier(&client).run(&config, &mut Vec::new()).unwrap();

    assert_eq!(report.legs[0].size_mismatch, Some(1000));
    assert_eq!(report.legs[0].body_bytes, 1000);
    assert_eq!(report.legs[1].size_mismatch, None);
}

#[test]
fn test_strict_size_fails_on_mismatch() {
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .respond(HTTPS_URL, 200, &body(10));
    let mut config = config_for_ports(8080, 8000, 8443);
    config.checks.strict_body_size = true;

    let err = verifier(&client).run(&config, &mut Vec::new()).unwrap_err();

    match err {
        ProbeError::BodySize {
            leg,
            expected,
            actual,
        } => {
            assert_eq!(leg, Leg::HttpsOverHttpTunnel);
            assert_eq!(expected, 1024);
            assert_eq!(actual, 10);
        }
        other => panic!("expected body size error, got {other:?}"),
    }
}

#[test]
fn test_custom_size_reaches_both_urls() {
    let http_url = "http://localhost:8000/file/big?size=64";
    let https_url = "https://localhost:8443/file/big?size=64";
    let client = ScriptedClient::default()
        .respond(http_url, 200, &body(64))
        .respond(https_url, 200, &body(64));
    let mut config = config_for_ports(8080, 8000, 8443);
    config.targets.size = 64;

    verifier(&client).run(&config, &mut Vec::new()).unwrap();

    assert_eq!(client.calls(), vec![http_url.to_string(), https_url.to_string()]);
}

#[test]
fn test_perform_decodes_body_lossily() {
    let client = ScriptedClient::default().respond(HTTP_URL, 200, &[b'o', b'k', 0xff]);

    let result = perform(&client, HTTP_URL).unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body_bytes, 3);
    assert_eq!(result.body, "ok\u{fffd}");
    assert_eq!(result.duration, Duration::from_millis(15));
}

#[test]
fn test_perform_propagates_transport_error() {
    let client = ScriptedClient::default().fail(HTTP_URL, "request timed out");

    let err = perform(&client, HTTP_URL).unwrap_err();

    assert_eq!(err, "request timed out");
}

#[test]
fn test_run_writes_leg_events_to_debug_log() {
    let dir = create_temp_dir();
    let log_path = dir.path().join("verify.log");
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .respond(HTTPS_URL, 503, b"down");
    let config = config_for_ports(8080, 8000, 8443);

    let err = Verifier::new(&client, DebugLogger::with_path(log_path.clone()))
        .run(&config, &mut Vec::new())
        .unwrap_err();
    assert_eq!(err.leg(), Some(Leg::HttpsOverHttpTunnel));

    let content = std::fs::read_to_string(&log_path).unwrap();
    let entries: Vec<LogEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();

    assert_eq!(
        events,
        vec!["leg_start", "leg_end", "leg_start", "leg_end", "verification_failed"]
    );
    assert_eq!(entries[2].fields["tunnel"], serde_json::Value::Bool(true));
    assert_eq!(entries[4].fields["leg"], serde_json::json!("https_tunnel"));
}

#[test]
#[serial]
fn test_run_verification_uses_environment_logger() {
    let _env = IsolatedEnv::new();
    let client = ScriptedClient::default()
        .respond(HTTP_URL, 200, &body(1024))
        .respond(HTTPS_URL, 200, &body(1024));
    let config = config_for_ports(8080, 8000, 8443);
    let mut out = Vec::new();

    let report = run_verification(&client, &config, &mut out).unwrap();

    assert_eq!(report.legs.len(), 2);
    assert_eq!(out.len(), 1025);
}
