// Terminal rendering for verification outcomes
use crate::core::network::types::{LegReport, ProbeError, VerificationReport};

/// Renders run summaries and failures for stderr
pub struct StatusRenderer;

impl StatusRenderer {
    pub fn new() -> Self {
        Self
    }

    /// One line per leg: `✓ HTTP over HTTP 200 1024B 12ms [DNS:..|Total:..]`
    pub fn render_leg(&self, leg: &LegReport) -> String {
        let mut line = format!(
            "✓ {} {} {}B {}ms",
            leg.leg, leg.status_code, leg.body_bytes, leg.elapsed_ms
        );
        if let Some(actual) = leg.size_mismatch {
            line.push_str(&format!(" (size mismatch: {} bytes)", actual));
        }
        self.append_breakdown(line, &leg.breakdown)
    }

    pub fn render_report(&self, report: &VerificationReport) -> String {
        let mut lines: Vec<String> = report.legs.iter().map(|leg| self.render_leg(leg)).collect();
        lines.push(format!(
            "✓ Proxy {} verified ({} legs, {}ms)",
            report.proxy,
            report.legs.len(),
            report.total_ms
        ));
        lines.join("\n")
    }

    pub fn render_json(&self, report: &VerificationReport) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(report)
    }

    pub fn render_failure(&self, error: &ProbeError) -> String {
        format!("✗ {}", error)
    }

    /// Append breakdown, wrapping to the next line if too long
    fn append_breakdown(&self, base: String, breakdown: &str) -> String {
        if breakdown.is_empty() {
            return base;
        }
        let max_line_length = 100;
        if base.chars().count() + breakdown.len() + 1 > max_line_length {
            format!("{}\n  {}", base, breakdown)
        } else {
            format!("{} {}", base, breakdown)
        }
    }
}

impl Default for StatusRenderer {
    fn default() -> Self {
        Self::new()
    }
}
