//! Evidence upload pipeline.
//!
//! Validates a media set before anything is persisted, then uploads items
//! sequentially with per-item progress and cooperative cancellation. A
//! cancelled or failed upload unwinds: already-stored items are deleted
//! best-effort and nothing reaches the report document.

use std::sync::Arc;

use cityfix_common::{AppError, AppResult, StorageBackend, generate_storage_key};
use tokio_util::sync::CancellationToken;

use crate::services::lifecycle::{MAX_PHOTOS_PER_SET, MAX_VIDEO_BYTES};

/// A single media item to upload.
pub struct MediaItem {
    /// Original file name (used for the storage key extension).
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// One evidence set (before or after): up to four photos and one video.
#[derive(Default)]
pub struct EvidenceSet {
    pub photos: Vec<MediaItem>,
    pub video: Option<MediaItem>,
}

impl EvidenceSet {
    /// Whether the set contains no items at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.photos.is_empty() && self.video.is_none()
    }

    /// Number of items in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.photos.len() + usize::from(self.video.is_some())
    }
}

/// URLs of a fully uploaded evidence set.
#[derive(Debug, Clone, Default)]
pub struct UploadedEvidence {
    pub photo_urls: Vec<String>,
    pub video_url: Option<String>,
}

/// Per-item upload progress.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    /// 1-based index of the item being uploaded.
    pub item: usize,
    /// Total number of items in the set.
    pub total: usize,
    /// File name of the item being uploaded.
    pub file_name: String,
}

/// Progress callback invoked before each item upload.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Validate an evidence set against the media caps. Nothing may be uploaded
/// for a set that fails here.
pub fn validate_set(set: &EvidenceSet) -> AppResult<()> {
    if set.photos.len() > MAX_PHOTOS_PER_SET {
        return Err(AppError::Validation(format!(
            "At most {MAX_PHOTOS_PER_SET} photos are allowed per evidence set"
        )));
    }
    if let Some(video) = &set.video
        && video.data.len() as u64 > MAX_VIDEO_BYTES
    {
        return Err(AppError::Validation(format!(
            "Video '{}' exceeds the {} MB limit",
            video.file_name,
            MAX_VIDEO_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Evidence upload service.
#[derive(Clone)]
pub struct EvidenceService {
    storage: Arc<dyn StorageBackend>,
}

impl EvidenceService {
    /// Create a new evidence service over a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Upload a full evidence set for a report.
    ///
    /// Items upload one at a time; `progress` is invoked before each item.
    /// Cancellation stops new uploads, abandons the one in flight, deletes
    /// already-stored items, and returns [`AppError::UploadCancelled`].
    pub async fn upload_set(
        &self,
        report_id: &str,
        set: EvidenceSet,
        progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> AppResult<UploadedEvidence> {
        validate_set(&set)?;

        let total = set.len();
        let mut uploaded_keys: Vec<String> = Vec::with_capacity(total);
        let mut result = UploadedEvidence::default();

        let videos = set.video.into_iter().map(|v| (v, true));
        let items = set.photos.into_iter().map(|p| (p, false)).chain(videos);

        for (index, (item, is_video)) in items.enumerate() {
            if cancel.is_cancelled() {
                self.unwind(&uploaded_keys).await;
                return Err(AppError::UploadCancelled);
            }

            if let Some(ref progress) = progress {
                progress(UploadProgress {
                    item: index + 1,
                    total,
                    file_name: item.file_name.clone(),
                });
            }

            let key = generate_storage_key(report_id, &item.file_name);
            let upload = self.storage.upload(&key, &item.data, &item.content_type);

            let stored = tokio::select! {
                () = cancel.cancelled() => {
                    self.unwind(&uploaded_keys).await;
                    return Err(AppError::UploadCancelled);
                }
                res = upload => match res {
                    Ok(stored) => stored,
                    Err(e) => {
                        self.unwind(&uploaded_keys).await;
                        return Err(AppError::UploadFailed(e.to_string()));
                    }
                },
            };

            uploaded_keys.push(stored.key);
            if is_video {
                result.video_url = Some(stored.url);
            } else {
                result.photo_urls.push(stored.url);
            }
        }

        Ok(result)
    }

    /// Best-effort deletion of partially uploaded items.
    async fn unwind(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete partial evidence upload");
            }
        }
    }
}
