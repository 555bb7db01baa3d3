/// Per-attempt transfer state: paths, byte counter and the progress sampling window.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::PARTIAL_SUFFIX;
use crate::progress::ProgressSnapshot;

/// Final and in-progress locations of one artifact. Always siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub output_dir: PathBuf,
    pub final_path: PathBuf,
    pub temp_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: impl Into<PathBuf>, filename: &str) -> Self {
        let output_dir = output_dir.into();
        let final_path = output_dir.join(filename);
        let mut temp_name = OsString::from(final_path.as_os_str());
        temp_name.push(PARTIAL_SUFFIX);
        Self {
            output_dir,
            final_path,
            temp_path: PathBuf::from(temp_name),
        }
    }

    /// Size of the final file, if present.
    pub async fn final_len(&self) -> Option<u64> {
        file_len(&self.final_path).await
    }

    /// Size of the partial file, 0 if absent.
    pub async fn partial_len(&self) -> u64 {
        file_len(&self.temp_path).await.unwrap_or(0)
    }
}

async fn file_len(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// Mutable state of a single download call. Dropped when the call returns.
#[derive(Debug)]
pub struct TransferSession {
    pub total: u64,
    downloaded: u64,
    resumed_from: u64,
    started_at: Instant,
    last_sample_at: Instant,
    last_sample_bytes: u64,
    interval: Duration,
}

impl TransferSession {
    /// Start a session at `offset` bytes of `total`. The first sampling window opens now.
    pub fn start(total: u64, offset: u64, interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            total,
            downloaded: offset,
            resumed_from: offset,
            started_at: now,
            last_sample_at: now,
            last_sample_bytes: offset,
            interval,
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn resumed_from(&self) -> u64 {
        self.resumed_from
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Count a written chunk and return a sample if the window has elapsed.
    pub fn record(&mut self, chunk_len: usize) -> Option<ProgressSnapshot> {
        self.downloaded += chunk_len as u64;
        self.sample_at(Instant::now())
    }

    fn sample_at(&mut self, now: Instant) -> Option<ProgressSnapshot> {
        let window = now.saturating_duration_since(self.last_sample_at);
        if window < self.interval {
            return None;
        }
        let window_bytes = self.downloaded - self.last_sample_bytes;
        self.last_sample_at = now;
        self.last_sample_bytes = self.downloaded;
        Some(ProgressSnapshot::compute(
            self.downloaded,
            self.total,
            window_bytes,
            window,
        ))
    }

    /// Terminal sample once the stream has ended.
    pub fn finish(&self) -> ProgressSnapshot {
        ProgressSnapshot::finished(self.downloaded, self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.downloaded == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_siblings() {
        let paths = ArtifactPaths::new("/models", "model.Q4_K_S.gguf");
        assert_eq!(paths.final_path, PathBuf::from("/models/model.Q4_K_S.gguf"));
        assert_eq!(
            paths.temp_path,
            PathBuf::from("/models/model.Q4_K_S.gguf.download")
        );
        assert_eq!(paths.final_path.parent(), paths.temp_path.parent());
    }

    #[test]
    fn test_resume_offset_counts() {
        let mut session = TransferSession::start(1_000, 400, Duration::from_secs(3600));
        assert_eq!(session.downloaded(), 400);
        assert!(session.record(100).is_none());
        assert_eq!(session.downloaded(), 500);
        assert_eq!(session.resumed_from(), 400);
        assert!(!session.is_complete());
        session.record(500);
        assert!(session.is_complete());
    }

    #[test]
    fn test_throttle_window() {
        let mut session = TransferSession::start(4 * 1024 * 1024, 0, Duration::from_secs(1));
        let t0 = session.last_sample_at;
        session.downloaded = 1024 * 1024;
        assert!(session.sample_at(t0 + Duration::from_millis(500)).is_none());

        let snap = session.sample_at(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(snap.speed_mib_s, 1.0);
        assert_eq!(snap.percent, 25.0);

        // window restarts at the last emission
        session.downloaded = 3 * 1024 * 1024;
        assert!(session.sample_at(t0 + Duration::from_millis(1500)).is_none());
        let snap = session.sample_at(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(snap.speed_mib_s, 2.0);
    }

    #[test]
    fn test_finish_has_no_speed() {
        let session = TransferSession::start(10, 10, Duration::from_secs(1));
        let snap = session.finish();
        assert_eq!(snap.percent, 100.0);
        assert_eq!(snap.eta_secs, None);
    }

    #[tokio::test]
    async fn test_partial_len_missing_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "absent.gguf");
        assert_eq!(paths.partial_len().await, 0);
        assert_eq!(paths.final_len().await, None);
    }
}
