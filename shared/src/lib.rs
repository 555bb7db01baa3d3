/// Shared types for Model Fetch: errors, artifact descriptors, the model
/// catalog and the JSON-line progress protocol.
pub mod catalog;
pub mod errors;
pub mod models;
pub mod progress_protocol;

pub use errors::{FetchError, FetchResult};
pub use models::DownloadTarget;
