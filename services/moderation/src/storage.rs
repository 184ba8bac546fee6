//! Frame storage collaborator boundary
//!
//! The video CDN is external to this service; all the pipeline needs from
//! it is one still image per timestamp.

use crate::error::{ModerationError, ModerationResult};
use async_trait::async_trait;

/// Boundary to the video storage/CDN collaborator
#[async_trait]
pub trait FrameStorage: Send + Sync {
    /// Fetch the still image at the given offset of the stored video.
    async fn fetch_frame(
        &self,
        storage_ref: &str,
        timestamp_seconds: f64,
    ) -> ModerationResult<Vec<u8>>;
}

/// HTTP implementation: the storage ref is a base URL and the CDN renders
/// one JPEG per requested offset.
#[derive(Clone)]
pub struct HttpFrameStorage {
    client: reqwest::Client,
}

impl HttpFrameStorage {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFrameStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameStorage for HttpFrameStorage {
    async fn fetch_frame(
        &self,
        storage_ref: &str,
        timestamp_seconds: f64,
    ) -> ModerationResult<Vec<u8>> {
        let response = self
            .client
            .get(storage_ref)
            .query(&[("start_offset", timestamp_seconds)])
            .query(&[("format", "jpg")])
            .send()
            .await
            .map_err(|e| ModerationError::StorageFetch {
                timestamp_seconds,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ModerationError::StorageFetch {
                timestamp_seconds,
                message: format!("storage returned status {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModerationError::StorageFetch {
                timestamp_seconds,
                message: e.to_string(),
            })?;

        Ok(bytes.to_vec())
    }
}
