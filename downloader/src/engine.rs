/// Transfer engine.
///
/// Downloads one artifact over a single HTTP connection into `<file>.download`,
/// resuming with a byte-range request when the server allows it, and renames
/// the partial file to its final name only once every byte has arrived.
/// There is no retry loop: a failed call leaves the partial file on disk and
/// the next call with resume enabled continues from it.
use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, Response, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use modelfetch_shared::catalog;
use modelfetch_shared::errors::{FetchError, FetchResult};
use modelfetch_shared::models::DownloadTarget;

use crate::checksum::{self, HashAlgorithm};
use crate::config::{DownloaderConfig, CHUNK_SIZE};
use crate::progress::{ConsoleProgress, ProgressSink};
use crate::session::{ArtifactPaths, TransferSession};

/// Downloads a single [`DownloadTarget`] into an output directory.
pub struct ModelDownloader {
    target: DownloadTarget,
    paths: ArtifactPaths,
    config: DownloaderConfig,
    client: Client,
    sink: Box<dyn ProgressSink>,
}

impl ModelDownloader {
    /// Create a downloader, creating the output directory if needed.
    ///
    /// Progress goes to [`ConsoleProgress`] until [`with_progress`](Self::with_progress) replaces it.
    pub fn new(
        target: DownloadTarget,
        output_dir: impl Into<PathBuf>,
        config: DownloaderConfig,
    ) -> FetchResult<Self> {
        let paths = ArtifactPaths::new(output_dir, &target.filename);
        // filename may carry a subdirectory inside the repo
        let parent = paths
            .final_path
            .parent()
            .unwrap_or(&paths.output_dir)
            .to_path_buf();
        std::fs::create_dir_all(&parent)?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            target,
            paths,
            config,
            client,
            sink: Box::new(ConsoleProgress),
        })
    }

    /// Replace the progress sink.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn target(&self) -> &DownloadTarget {
        &self.target
    }

    pub fn final_path(&self) -> &Path {
        &self.paths.final_path
    }

    pub fn temp_path(&self) -> &Path {
        &self.paths.temp_path
    }

    pub fn url(&self) -> String {
        self.target.download_url(&self.config.hub_url)
    }

    async fn head(&self, url: &str) -> reqwest::Result<Response> {
        self.client
            .head(url)
            .timeout(self.config.metadata_timeout)
            .send()
            .await?
            .error_for_status()
    }

    /// Declared size of the remote artifact from a HEAD request.
    pub async fn remote_size(&self, url: &str) -> FetchResult<u64> {
        let response = self
            .head(url)
            .await
            .map_err(|e| FetchError::RemoteMetadata(e.to_string()))?;

        let value = response.headers().get(CONTENT_LENGTH).ok_or_else(|| {
            FetchError::RemoteMetadata(format!("no content-length in response from {}", url))
        })?;

        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                FetchError::RemoteMetadata(format!("invalid content-length {:?}", value))
            })
    }

    /// Whether the server advertises `accept-ranges: bytes`. Any failure reads as `false`.
    pub async fn supports_resume(&self, url: &str) -> bool {
        match self.head(url).await {
            Ok(response) => response
                .headers()
                .get(ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().eq_ignore_ascii_case("bytes"))
                .unwrap_or(false),
            Err(e) => {
                debug!("Range support probe failed for {}: {}", url, e);
                false
            }
        }
    }

    /// Download the artifact, resuming a previous partial file when `resume` is set.
    ///
    /// Returns the final path. On any error after the transfer started the
    /// partial file is left in place.
    pub async fn download(&mut self, resume: bool) -> FetchResult<PathBuf> {
        let url = self.url();
        let total = self.remote_size(&url).await?;
        if total == 0 {
            return Err(FetchError::RemoteMetadata(
                "Could not determine remote file size".into(),
            ));
        }
        info!("Remote size for {}: {} bytes", url, total);

        self.sink.report(
            0.0,
            &format!("Starting download: {}", self.target.display_name),
        );

        if let Some(existing) = self.paths.final_len().await {
            if existing == total {
                info!("{} already complete", self.paths.final_path.display());
                self.sink.report(
                    100.0,
                    &format!("Model already downloaded: {}", self.paths.final_path.display()),
                );
                return Ok(self.paths.final_path.clone());
            }
            // left in place; promotion overwrites it
            warn!(
                "Existing {} has {} bytes, expected {}; re-downloading",
                self.paths.final_path.display(),
                existing,
                total
            );
            self.sink.report(0.0, "Existing file incomplete, re-downloading...");
        }

        let offset = self.prepare_partial(&url, total, resume).await?;
        let mut session = TransferSession::start(total, offset, self.config.progress_interval);

        if offset < total {
            self.transfer(&url, &mut session).await?;
        }

        session.finish().emit(self.sink.as_mut());

        if !session.is_complete() {
            warn!(
                "Transfer ended at {} of {} bytes; keeping {}",
                session.downloaded(),
                total,
                self.paths.temp_path.display()
            );
            return Err(FetchError::IncompleteTransfer {
                downloaded: session.downloaded(),
                expected: total,
            });
        }

        tokio::fs::rename(&self.paths.temp_path, &self.paths.final_path).await?;
        info!(
            "Downloaded {} ({} bytes, resumed from {}) in {:.1}s",
            self.paths.final_path.display(),
            total,
            session.resumed_from(),
            session.elapsed().as_secs_f64()
        );
        self.sink.report(
            100.0,
            &format!("Download complete: {}", self.paths.final_path.display()),
        );

        Ok(self.paths.final_path.clone())
    }

    /// Decide the starting offset from the partial file, discarding it when it can't be reused.
    async fn prepare_partial(&mut self, url: &str, total: u64, resume: bool) -> FetchResult<u64> {
        let partial = self.paths.partial_len().await;
        if partial == 0 {
            return Ok(0);
        }

        if partial > total {
            warn!(
                "Partial file has {} bytes but remote has {}; discarding",
                partial, total
            );
        } else if !resume {
            info!("Resume disabled; discarding {} partial bytes", partial);
        } else if self.supports_resume(url).await {
            if partial == total {
                info!("Partial file already holds all {} bytes", total);
                return Ok(partial);
            }
            self.sink
                .report(0.0, &format!("Resuming from byte {}", group_digits(partial)));
            return Ok(partial);
        } else {
            info!("Server does not accept byte ranges; restarting from 0");
        }

        self.remove_partial().await?;
        Ok(0)
    }

    async fn remove_partial(&self) -> FetchResult<()> {
        match tokio::fs::remove_file(&self.paths.temp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stream the body from the session offset into the partial file.
    async fn transfer(&mut self, url: &str, session: &mut TransferSession) -> FetchResult<()> {
        let offset = session.downloaded();

        let mut request = self.client.get(url);
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }
        let response = request
            .send()
            .await
            .map_err(FetchError::transfer)?
            .error_for_status()
            .map_err(FetchError::transfer)?;
        let status = response.status();
        debug!("GET {} -> {} (offset {})", url, status, offset);

        let mut file = if offset > 0 {
            OpenOptions::new()
                .append(true)
                .open(&self.paths.temp_path)
                .await?
        } else {
            File::create(&self.paths.temp_path).await?
        };

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = Box::pin(StreamReader::new(stream));

        if offset > 0 && status != StatusCode::PARTIAL_CONTENT {
            warn!(
                "Server answered {} to a range request; skipping the first {} bytes",
                status, offset
            );
            tokio::io::copy(&mut (&mut reader).take(offset), &mut tokio::io::sink())
                .await
                .map_err(FetchError::transfer)?;
        }

        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await.map_err(FetchError::transfer)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            if let Some(snapshot) = session.record(n) {
                snapshot.emit(self.sink.as_mut());
            }
        }
        file.flush().await?;

        Ok(())
    }

    /// Final file exists and matches `expected_size`, or is non-empty when no size is given.
    pub async fn verify(&self, expected_size: Option<u64>) -> bool {
        match (self.paths.final_len().await, expected_size) {
            (None, _) => false,
            (Some(actual), Some(expected)) => actual == expected,
            (Some(actual), None) => actual > 0,
        }
    }

    /// Hex digest of the final file.
    pub async fn checksum(&self, algorithm: HashAlgorithm) -> FetchResult<String> {
        checksum::file_checksum(&self.paths.final_path, algorithm).await
    }
}

/// Download a catalog model by key.
pub async fn download_model(
    key: &str,
    output_dir: impl Into<PathBuf>,
    config: DownloaderConfig,
    sink: impl ProgressSink + 'static,
) -> FetchResult<PathBuf> {
    let target = catalog::lookup(key)?;
    let mut downloader = ModelDownloader::new(target, output_dir, config)?.with_progress(sink);
    downloader.download(true).await
}

/// `1234567` -> `1,234,567`.
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
