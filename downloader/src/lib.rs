/// Model Fetch downloader library.
///
/// Resumable single-connection downloads of large model artifacts with
/// throttled progress reporting and post-hoc checksums.
pub mod checksum;
pub mod config;
pub mod engine;
pub mod progress;
pub mod session;

pub use checksum::HashAlgorithm;
pub use config::DownloaderConfig;
pub use engine::{download_model, ModelDownloader};
pub use progress::{ConsoleProgress, JsonLineProgress, ProgressSink, ProgressSnapshot};
