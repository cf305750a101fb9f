//! Remote object storage for temporary uploads.
//!
//! The [`ObjectStore`] trait is the seam: the upload pipeline only uploads,
//! signs and deletes through it. [`SupabaseStore`](supabase::SupabaseStore)
//! is the production implementation.
//!
//! A store connection is created lazily through [`LazyStore`]: the factory
//! runs on first use, the handle is reused afterwards, and `reset()` drops
//! it so the next use builds a fresh one.

pub mod signed;
pub mod supabase;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use supabase::SupabaseStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Signed URL response has none of the fields {fields:?}: {body}")]
    MissingSignedUrl {
        fields: &'static [&'static str],
        body: String,
    },
    #[error("Missing storage credentials: {0}")]
    MissingCredentials(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Object storage operations needed by the upload pipeline.
pub trait ObjectStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Store `bytes` under `key`, replacing any existing object.
    fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// A URL granting read access to `key` for `ttl`.
    fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    /// Delete every key in one request.
    fn delete(&self, keys: &[String]) -> Result<(), StorageError>;
}

type StoreFactory = Box<dyn Fn() -> Result<Arc<dyn ObjectStore>, StorageError> + Send + Sync>;

/// Store handle created at most once, on first use.
pub struct LazyStore {
    factory: StoreFactory,
    slot: Mutex<Option<Arc<dyn ObjectStore>>>,
}

impl LazyStore {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ObjectStore>, StorageError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            slot: Mutex::new(None),
        }
    }

    /// Return the shared store, creating it if needed.
    ///
    /// A factory failure leaves the handle uninitialized, so a later call
    /// tries again.
    pub fn get(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut slot = self.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = (self.factory)()?;
        tracing::debug!(store = store.name(), "storage client created");
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Drop the cached store.
    pub fn reset(&self) {
        *self.lock() = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn ObjectStore>>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
