//! Temporary asset uploads with guaranteed cleanup.
//!
//! Metadata extraction needs the book photos reachable by URL, but only for
//! the length of one call. This module uploads prepared JPEGs under a scoped
//! key prefix, signs a short-lived URL for each, and deletes every uploaded
//! key when the scope ends:
//!
//! ```text
//! paths ──take(max_images)──► encode_for_upload ──► upload ──► signed_url
//!                                  │ error                        │
//!                                  ▼                              ▼
//!                             skipped (logged)        TemporaryUploads guard
//!                                                                 │ release() / Drop
//!                                                                 ▼
//!                                                   delete(all uploaded keys)
//! ```
//!
//! ## Keys
//!
//! `{prefix}/{token}_{position:02}.jpg`, where `token` is a fresh UUID per
//! call and `position` is the 1-based index in the input sequence (a skipped
//! source leaves a gap rather than shifting later positions).
//!
//! ## Failure policy
//!
//! | Failure | Outcome |
//! |---|---|
//! | A source cannot be decoded/encoded | skipped, recorded in [`TemporaryUploads::skipped`] |
//! | Upload or signing fails | call aborts with [`UploadError::Storage`]; keys already uploaded are deleted first |
//! | Consumer fails or panics | keys deleted, consumer's outcome returned unchanged |
//! | Delete fails | logged with `warn!`, never returned |

use crate::config::VisionConfig;
use crate::imaging::{ImageBackend, JpegConfig, Quality, encode_for_upload};
use crate::storage::{ObjectStore, StorageError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Content type of every temporary upload.
pub const CONTENT_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Settings for one temporary upload scope.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub prefix: String,
    pub ttl: Duration,
    pub max_images: usize,
    pub jpeg: JpegConfig,
}

impl UploadOptions {
    pub fn from_config(vision: &VisionConfig) -> Self {
        Self {
            prefix: vision.upload_prefix.clone(),
            ttl: Duration::from_secs(vision.signed_url_ttl),
            max_images: vision.max_images,
            jpeg: JpegConfig {
                max_edge: vision.max_side,
                quality: Quality::new(vision.jpeg_quality),
            },
        }
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from_config(&VisionConfig::default())
    }
}

/// A source that was uploaded and signed.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAsset {
    pub key: String,
    pub url: String,
    pub source: PathBuf,
}

/// A source that could not be prepared for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAsset {
    pub source: PathBuf,
    pub reason: String,
}

/// Guard owning the keys uploaded in one scope.
///
/// Keys are deleted in a single call by [`release`](Self::release), or by
/// `Drop` if the guard goes out of scope unreleased.
pub struct TemporaryUploads<'s> {
    store: &'s dyn ObjectStore,
    keys: Vec<String>,
    assets: Vec<UploadedAsset>,
    skipped: Vec<SkippedAsset>,
    released: bool,
}

impl<'s> TemporaryUploads<'s> {
    fn new(store: &'s dyn ObjectStore) -> Self {
        Self {
            store,
            keys: Vec::new(),
            assets: Vec::new(),
            skipped: Vec::new(),
            released: false,
        }
    }

    /// Uploaded and signed assets, in input order.
    pub fn assets(&self) -> &[UploadedAsset] {
        &self.assets
    }

    pub fn skipped(&self) -> &[SkippedAsset] {
        &self.skipped
    }

    /// Every key uploaded so far, including one whose signing failed.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn urls(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.url.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Delete every uploaded key now.
    pub fn release(mut self) -> Result<(), StorageError> {
        self.released = true;
        self.delete_all()
    }

    fn delete_all(&self) -> Result<(), StorageError> {
        if self.keys.is_empty() {
            return Ok(());
        }
        self.store.delete(&self.keys)?;
        debug!(store = self.store.name(), count = self.keys.len(), "temporary uploads deleted");
        Ok(())
    }
}

impl Drop for TemporaryUploads<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.delete_all() {
            warn!(keys = ?self.keys, error = %e, "failed to delete temporary uploads");
        }
    }
}

fn temporary_key(prefix: &str, token: &str, position: usize) -> String {
    format!("{}/{token}_{position:02}.jpg", prefix.trim_end_matches('/'))
}

/// Upload up to `options.max_images` of `paths` and sign a URL for each.
///
/// On a storage error the partially filled guard is dropped before the
/// error is returned, which deletes whatever was already uploaded.
pub fn upload_for_scope<'s>(
    store: &'s dyn ObjectStore,
    backend: &impl ImageBackend,
    paths: &[PathBuf],
    options: &UploadOptions,
) -> Result<TemporaryUploads<'s>, UploadError> {
    let token = Uuid::new_v4().simple().to_string();
    let mut uploads = TemporaryUploads::new(store);

    for (index, source) in paths.iter().take(options.max_images).enumerate() {
        let position = index + 1;
        let bytes = match encode_for_upload(backend, source, &options.jpeg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "skipping image");
                uploads.skipped.push(SkippedAsset {
                    source: source.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let key = temporary_key(&options.prefix, &token, position);
        store.upload(&key, bytes, CONTENT_TYPE)?;
        uploads.keys.push(key.clone());
        let url = store.signed_url(&key, options.ttl)?;
        debug!(key = %key, source = %source.display(), "uploaded");
        uploads.assets.push(UploadedAsset {
            key,
            url,
            source: source.clone(),
        });
    }

    info!(
        store = store.name(),
        uploaded = uploads.assets.len(),
        skipped = uploads.skipped.len(),
        "temporary uploads ready"
    );
    Ok(uploads)
}

/// Upload, run `consumer` with the uploads, then always delete them.
///
/// The consumer's result is returned as is; a failed delete is only logged.
pub fn with_temporary_uploads<T, E, F>(
    store: &dyn ObjectStore,
    backend: &impl ImageBackend,
    paths: &[PathBuf],
    options: &UploadOptions,
    consumer: F,
) -> Result<T, E>
where
    E: From<UploadError>,
    F: FnOnce(&TemporaryUploads<'_>) -> Result<T, E>,
{
    let uploads = upload_for_scope(store, backend, paths, options)?;
    let result = consumer(&uploads);
    if let Err(e) = uploads.release() {
        warn!(error = %e, "failed to delete temporary uploads");
    }
    result
}
