/// JSON-line progress protocol for machine consumers.
///
/// One object per line on stdout: `{"percent":..,"message":..,"timestamp":..}`.
use serde::{Deserialize, Serialize};

/// Single progress event as written to stdout in `--json` mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressLine {
    /// 0-100, rounded to two decimal places.
    pub percent: f64,
    pub message: String,
    /// Unix time in fractional seconds.
    pub timestamp: f64,
}

impl ProgressLine {
    /// Build a line stamped with the current time.
    pub fn now(percent: f64, message: &str) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        Self::at(percent, message, millis as f64 / 1000.0)
    }

    pub fn at(percent: f64, message: &str, timestamp: f64) -> Self {
        Self {
            percent: (percent * 100.0).round() / 100.0,
            message: message.trim().to_string(),
            timestamp,
        }
    }

    /// Serialize to a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a JSON line.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}
