/// Artifact descriptors shared across Model Fetch crates.
use serde::{Deserialize, Serialize};

/// Default hub serving `<repo>/resolve/main/<file>` URLs.
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

/// Remote artifact to download. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadTarget {
    pub repo_id: String,
    pub filename: String,
    pub display_name: String,
    /// Advisory only; the server's content-length is authoritative.
    pub size_gb: f64,
    pub quantization: String,
}

impl DownloadTarget {
    pub fn new(
        repo_id: impl Into<String>,
        filename: impl Into<String>,
        display_name: impl Into<String>,
        size_gb: f64,
        quantization: impl Into<String>,
    ) -> Self {
        Self {
            repo_id: repo_id.into(),
            filename: filename.into(),
            display_name: display_name.into(),
            size_gb,
            quantization: quantization.into(),
        }
    }

    /// Target for an arbitrary repository file outside the catalog.
    pub fn custom(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            repo_id: repo_id.into(),
            display_name: filename.clone(),
            filename,
            size_gb: 0.0,
            quantization: "custom".to_string(),
        }
    }

    /// Direct download URL on the given hub.
    pub fn download_url(&self, hub_url: &str) -> String {
        format!(
            "{}/{}/resolve/main/{}",
            hub_url.trim_end_matches('/'),
            self.repo_id,
            self.filename
        )
    }

    /// Direct download URL on the default hub.
    pub fn default_url(&self) -> String {
        self.download_url(DEFAULT_HUB_URL)
    }
}
