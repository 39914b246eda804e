//! JSON-lines debug log for verification runs
//!
//! Disabled unless `PROXYPROBE_DEBUG` is truthy. Logging never changes the
//! outcome of a run: every write error is swallowed.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::network::types::{parse_env_bool, Leg};

pub const ENV_DEBUG: &str = "PROXYPROBE_DEBUG";
pub const ENV_LOG_PATH: &str = "PROXYPROBE_LOG_PATH";

const LOG_ROTATION_SIZE_MB: u64 = 8;
const MAX_ARCHIVES: usize = 5;
const ROTATION_CHECK_INTERVAL: u32 = 100;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    /// DEBUG, WARN, ERROR, PERF, NETWORK
    pub level: String,
    pub component: String,
    pub event: String,
    /// Redacted before it is written
    pub message: String,
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

/// Append-only log file with size-based gzip rotation
struct LogFile {
    path: PathBuf,
    writes: u32,
}

impl LogFile {
    fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Self { path, writes: 0 }
    }

    fn append(&mut self, line: &str) -> std::io::Result<()> {
        if self.writes % ROTATION_CHECK_INTERVAL == 0 {
            let _ = self.rotate_if_oversized();
        }
        self.writes = self.writes.wrapping_add(1);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }

    fn oversized(&self) -> std::io::Result<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() >= LOG_ROTATION_SIZE_MB * 1024 * 1024),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn rotate_if_oversized(&self) -> std::io::Result<()> {
        if !self.oversized()? {
            return Ok(());
        }

        // Several harness processes may share one log; only one rotates
        let lock_path = self.path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        if lock.try_lock_exclusive().is_err() {
            return Ok(());
        }

        let result = if self.oversized()? {
            self.archive()
        } else {
            Ok(())
        };
        let _ = std::fs::remove_file(&lock_path);
        result
    }

    fn archive(&self) -> std::io::Result<()> {
        let (dir, stem) = self.dir_and_stem()?;
        let archive_path = dir.join(format!(
            "{}.{}.gz",
            stem,
            Local::now().format("%Y%m%d_%H%M%S")
        ));

        let staging = self.path.with_extension("rotating");
        std::fs::rename(&self.path, &staging)?;

        let mut encoder = GzEncoder::new(File::create(&archive_path)?, Compression::default());
        std::io::copy(&mut BufReader::new(File::open(&staging)?), &mut encoder)?;
        encoder.finish()?;
        std::fs::remove_file(&staging)?;

        let _ = self.prune_archives(&dir, &stem);
        Ok(())
    }

    fn prune_archives(&self, dir: &Path, stem: &str) -> std::io::Result<()> {
        let prefix = format!("{}.", stem);
        let mut archives = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".gz") {
                archives.push((entry.path(), entry.metadata()?.modified()?));
            }
        }

        archives.sort_by_key(|(_, modified)| *modified);
        let excess = archives.len().saturating_sub(MAX_ARCHIVES);
        for (path, _) in archives.into_iter().take(excess) {
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }

    fn dir_and_stem(&self) -> std::io::Result<(PathBuf, String)> {
        let invalid = || {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("log path has no file name: {}", self.path.display()),
            )
        };
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(invalid)?
            .to_string();
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((dir, stem))
    }
}

pub struct DebugLogger {
    enabled: bool,
    sink: Option<Mutex<LogFile>>,
    session_id: String,
    redaction_patterns: Vec<(Regex, &'static str)>,
}

impl DebugLogger {
    /// Logger configured from `PROXYPROBE_DEBUG` and `PROXYPROBE_LOG_PATH`
    pub fn from_env() -> Self {
        if parse_env_bool(ENV_DEBUG) {
            Self::with_path(Self::default_log_path())
        } else {
            Self::disabled()
        }
    }

    /// Enabled logger writing to an explicit path
    pub fn with_path(path: PathBuf) -> Self {
        Self::build(Some(LogFile::new(path)))
    }

    pub fn disabled() -> Self {
        Self::build(None)
    }

    fn build(sink: Option<LogFile>) -> Self {
        Self {
            enabled: sink.is_some(),
            sink: sink.map(Mutex::new),
            session_id: Uuid::new_v4().to_string()[..8].to_string(),
            redaction_patterns: compile_redaction_patterns(),
        }
    }

    fn default_log_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_LOG_PATH) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".proxyprobe");
        path.push("proxyprobe-debug.log");
        path
    }

    /// Mask credentials and token-like strings
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for (regex, replacement) in &self.redaction_patterns {
            redacted = regex.replace_all(&redacted, *replacement).to_string();
        }

        if redacted.len() > 100
            && redacted
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_".contains(c))
        {
            redacted = format!("[REDACTED_LONG_STRING_{}chars]", redacted.len());
        }
        redacted
    }

    fn log(
        &self,
        level: &str,
        component: &str,
        event: &str,
        message: &str,
        fields: HashMap<String, Value>,
    ) {
        if !self.enabled {
            return;
        }

        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.to_string(),
            component: component.to_string(),
            event: event.to_string(),
            message: self.redact(message),
            correlation_id: Some(self.session_id.clone()),
            fields,
        };

        if let (Some(sink), Ok(line)) = (&self.sink, serde_json::to_string(&entry)) {
            if let Ok(mut file) = sink.lock() {
                let _ = file.append(&line);
            }
        }
    }

    pub fn debug(&self, component: &str, event: &str, message: &str) {
        self.log("DEBUG", component, event, message, HashMap::new());
    }

    pub fn warn(&self, component: &str, event: &str, message: &str) {
        self.log("WARN", component, event, message, HashMap::new());
    }

    pub fn error(&self, component: &str, event: &str, message: &str) {
        self.log("ERROR", component, event, message, HashMap::new());
    }

    pub fn performance(&self, component: &str, operation: &str, duration_ms: u64) {
        let fields = HashMap::from([("duration_ms".to_string(), Value::from(duration_ms))]);
        self.log("PERF", component, "operation_complete", operation, fields);
    }

    // Typed events

    pub fn config_loaded(&self, proxy_uri: &str, http_port: u16, https_port: u16) {
        let fields = HashMap::from([
            ("proxy".to_string(), Value::from(proxy_uri)),
            ("http_port".to_string(), Value::from(http_port)),
            ("https_port".to_string(), Value::from(https_port)),
        ]);
        self.log(
            "DEBUG",
            "Config",
            "config_loaded",
            &format!("Proxy {} with targets :{} and :{}", proxy_uri, http_port, https_port),
            fields,
        );
    }

    pub fn client_built(&self, proxy_uri: &str, username: &str, skip_certificate_validation: bool) {
        let fields = HashMap::from([
            ("proxy".to_string(), Value::from(proxy_uri)),
            ("username".to_string(), Value::from(username)),
            (
                "skip_certificate_validation".to_string(),
                Value::from(skip_certificate_validation),
            ),
        ]);
        self.log(
            "DEBUG",
            "ProbeClient",
            "client_built",
            &format!("Client bound to proxy {}", proxy_uri),
            fields,
        );
    }

    pub fn leg_start(&self, leg: Leg, url: &str, tunnel: bool) {
        let fields = HashMap::from([
            ("leg".to_string(), Value::from(leg.key())),
            ("url".to_string(), Value::from(url)),
            ("tunnel".to_string(), Value::from(tunnel)),
        ]);
        self.log(
            "NETWORK",
            "Verifier",
            "leg_start",
            &format!("Starting {} leg: GET {}", leg, url),
            fields,
        );
    }

    pub fn leg_end(&self, leg: Leg, status: u16, body_bytes: usize, duration_ms: u64, breakdown: &str) {
        let mut fields = HashMap::from([
            ("leg".to_string(), Value::from(leg.key())),
            ("http_status".to_string(), Value::from(status)),
            ("body_bytes".to_string(), Value::from(body_bytes)),
            ("duration_ms".to_string(), Value::from(duration_ms)),
        ]);
        if !breakdown.is_empty() {
            fields.insert("breakdown".to_string(), Value::from(breakdown));
        }
        self.log(
            "NETWORK",
            "Verifier",
            "leg_end",
            &format!("{} leg completed: {} ({}ms)", leg, status, duration_ms),
            fields,
        );
    }

    pub fn body_size_mismatch(&self, leg: Leg, expected: usize, actual: usize) {
        let fields = HashMap::from([
            ("leg".to_string(), Value::from(leg.key())),
            ("expected".to_string(), Value::from(expected)),
            ("actual".to_string(), Value::from(actual)),
        ]);
        self.log(
            "WARN",
            "Verifier",
            "body_size_mismatch",
            &format!("{} leg returned {} bytes, expected {}", leg, actual, expected),
            fields,
        );
    }

    pub fn verification_failed(&self, leg: Option<Leg>, message: &str) {
        let mut fields = HashMap::new();
        if let Some(leg) = leg {
            fields.insert("leg".to_string(), Value::from(leg.key()));
        }
        self.log("ERROR", "Verifier", "verification_failed", message, fields);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self::from_env()
    }
}

fn compile_redaction_patterns() -> Vec<(Regex, &'static str)> {
    // Capture group 1 keeps the key so the entry stays readable
    let patterns = [
        (r"(?i)(authorization[:\s]+)(?:basic\s+|bearer\s+)?[^\s]+", "${1}[REDACTED]"),
        (r"(?i)(password[=:\s]+)[^\s&]+", "${1}[REDACTED]"),
        (r"(?i)(token[=:\s]+)[^\s&]+", "${1}[REDACTED]"),
        (r"(://[^/\s:@]+:)[^@\s/]+@", "${1}[REDACTED]@"),
    ];

    patterns
        .iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, *replacement)))
        .collect()
}

// Factory for call sites that do not carry a logger around
pub fn get_debug_logger() -> DebugLogger {
    DebugLogger::from_env()
}
