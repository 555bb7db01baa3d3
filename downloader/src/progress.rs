/// Progress reporting: percent, speed and ETA derivation plus sink adapters.
///
/// The engine only talks to [`ProgressSink`]. Printing to a terminal or
/// emitting JSON lines are separate adapters chosen by the caller.
use std::io::Write;
use std::time::Duration;

use modelfetch_shared::progress_protocol::ProgressLine;

const MIB: f64 = 1024.0 * 1024.0;

/// Receives `(percent, message)` on the downloading thread. Must not block for long.
pub trait ProgressSink: Send {
    fn report(&mut self, percent: f64, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(f64, &str) + Send,
{
    fn report(&mut self, percent: f64, message: &str) {
        self(percent, message)
    }
}

/// One derived progress sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub downloaded: u64,
    pub total: u64,
    pub percent: f64,
    /// MiB per second over the last sampling window. Zero when unknown.
    pub speed_mib_s: f64,
    pub eta_secs: Option<f64>,
}

impl ProgressSnapshot {
    /// Derive a sample from byte counts and the window since the last one.
    pub fn compute(downloaded: u64, total: u64, window_bytes: u64, window: Duration) -> Self {
        let percent = if total > 0 {
            downloaded as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let secs = window.as_secs_f64();
        let speed_mib_s = if secs > 0.0 {
            window_bytes as f64 / secs / MIB
        } else {
            0.0
        };
        Self::with_speed(downloaded, total, percent, speed_mib_s)
    }

    /// Sample for a finished stream. Speed is forced to zero.
    pub fn finished(downloaded: u64, total: u64) -> Self {
        Self::compute(downloaded, total, 0, Duration::ZERO)
    }

    fn with_speed(downloaded: u64, total: u64, percent: f64, speed_mib_s: f64) -> Self {
        let eta_secs = (speed_mib_s > 0.0)
            .then(|| total.saturating_sub(downloaded) as f64 / (speed_mib_s * MIB));
        Self {
            downloaded,
            total,
            percent,
            speed_mib_s,
            eta_secs,
        }
    }

    /// Human-readable progress line.
    pub fn message(&self) -> String {
        let done_mb = self.downloaded as f64 / MIB;
        let total_mb = self.total as f64 / MIB;
        match self.eta_secs {
            Some(eta) => format!(
                "Progress: {:.1}% ({:.1}/{:.1} MB) - Speed: {:.2} MB/s - ETA: {}",
                self.percent,
                done_mb,
                total_mb,
                self.speed_mib_s,
                format_eta(eta)
            ),
            None => format!(
                "Progress: {:.1}% ({:.1}/{:.1} MB)",
                self.percent, done_mb, total_mb
            ),
        }
    }

    /// Forward this sample to a sink.
    pub fn emit(&self, sink: &mut dyn ProgressSink) {
        sink.report(self.percent, &self.message());
    }
}

/// Minutes with one decimal above a minute, whole seconds otherwise.
pub fn format_eta(secs: f64) -> String {
    if secs > 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.0}s", secs)
    }
}

/// Rewrites a single terminal line with each report.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, _percent: f64, message: &str) {
        if message.is_empty() {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = write!(stdout, "\r{}", message).and_then(|_| stdout.flush()) {
            tracing::warn!("Failed to write progress: {}", e);
        }
    }
}

/// Writes one [`ProgressLine`] JSON object per report.
pub struct JsonLineProgress<W: Write + Send> {
    out: W,
}

impl JsonLineProgress<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLineProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ProgressSink for JsonLineProgress<W> {
    fn report(&mut self, percent: f64, message: &str) {
        match ProgressLine::now(percent, message).to_json_line() {
            Ok(line) => {
                if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
                    tracing::warn!("Failed to write progress line: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to encode progress line: {}", e),
        }
    }
}
