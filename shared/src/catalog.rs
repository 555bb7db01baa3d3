/// Named catalog of recommended model downloads.
use crate::errors::{FetchError, FetchResult};
use crate::models::DownloadTarget;

/// One catalog row. Kept as plain static data so it never leaks into the engine.
struct CatalogEntry {
    key: &'static str,
    repo_id: &'static str,
    filename: &'static str,
    display_name: &'static str,
    size_gb: f64,
    quantization: &'static str,
}

const FLOPPA_REPO: &str = "mradermacher/Floppa-12B-Gemma3-Uncensored-GGUF";

static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "floppa-12b-q4",
        repo_id: FLOPPA_REPO,
        filename: "Floppa-12B-Gemma3-Uncensored.Q4_K_S.gguf",
        display_name: "Floppa-12B (Q4_K_S)",
        size_gb: 6.46,
        quantization: "Q4_K_S",
    },
    CatalogEntry {
        key: "floppa-12b-q5",
        repo_id: FLOPPA_REPO,
        filename: "Floppa-12B-Gemma3-Uncensored.Q5_K_M.gguf",
        display_name: "Floppa-12B (Q5_K_M)",
        size_gb: 7.93,
        quantization: "Q5_K_M",
    },
    CatalogEntry {
        key: "floppa-12b-q6",
        repo_id: FLOPPA_REPO,
        filename: "Floppa-12B-Gemma3-Uncensored.Q6_K.gguf",
        display_name: "Floppa-12B (Q6_K)",
        size_gb: 9.41,
        quantization: "Q6_K",
    },
];

impl CatalogEntry {
    fn to_target(&self) -> DownloadTarget {
        DownloadTarget::new(
            self.repo_id,
            self.filename,
            self.display_name,
            self.size_gb,
            self.quantization,
        )
    }
}

/// Catalog keys in table order.
pub fn keys() -> Vec<&'static str> {
    CATALOG.iter().map(|e| e.key).collect()
}

/// All catalog entries as `(key, target)` pairs, in table order.
pub fn list() -> Vec<(&'static str, DownloadTarget)> {
    CATALOG.iter().map(|e| (e.key, e.to_target())).collect()
}

/// Look up a target by catalog key.
pub fn lookup(key: &str) -> FetchResult<DownloadTarget> {
    CATALOG
        .iter()
        .find(|e| e.key == key)
        .map(CatalogEntry::to_target)
        .ok_or_else(|| FetchError::UnknownModel {
            key: key.to_string(),
            available: keys().join(", "),
        })
}
