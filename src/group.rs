//! Photo batching: moving photos from the raw pool into book folders.
//!
//! ```text
//! photos_raw/                      photos_grouped/
//! ├── IMG_0001.jpg   (oldest)      ├── book_001/
//! ├── IMG_0002.jpg         ──►     │   ├── 01.jpg   ← IMG_0001.jpg
//! ├── IMG_0003.HEIC                │   └── 02.jpg   ← IMG_0002.jpg
//! └── IMG_0004.jpg   (newest)      └── book_002/
//!                                      ├── 01.heic  ← IMG_0003.HEIC
//!                                      └── 02.jpg   ← IMG_0004.jpg
//! ```
//!
//! A batch is exactly `per_book` photos. Pools that cannot fill a batch are
//! left alone. Moved photos leave the pool, so a second run never sees them
//! again.
//!
//! ## Rename failures
//!
//! Batching aborts on the first failed rename. The returned
//! [`GroupError::Rename`] names the half-filled folder and the files
//! already moved into it; nothing is rolled back, and the folder keeps its
//! index.

use crate::allocate::{self, AllocateError, BookFolder};
use crate::naming::positional_name;
use crate::select::{self, Order};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Allocation failed: {0}")]
    Allocate(#[from] AllocateError),
    #[error("photos per book must be at least 1")]
    ZeroBatchSize,
    #[error(
        "Failed to move {} to {} ({} already moved into {}, {completed_batches} earlier batches complete): {source}",
        .from.display(), .to.display(), .moved.len(), .folder.display()
    )]
    Rename {
        from: PathBuf,
        to: PathBuf,
        folder: PathBuf,
        moved: Vec<PathBuf>,
        completed_batches: usize,
        #[source]
        source: io::Error,
    },
}

/// Result of [`group_last_set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastSetOutcome {
    /// A new book folder was created and filled.
    Created(PathBuf),
    /// Not enough photos for a batch; nothing was touched.
    Insufficient { available: usize, needed: usize },
}

/// Result of [`group_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupReport {
    /// Book folders created by this run, in allocation order.
    pub created: Vec<PathBuf>,
    /// Photos still in the pool after this run.
    pub leftover: usize,
    /// Batch size used.
    pub per_book: usize,
}

/// Group the `per_book` most recently modified photos of `raw` into one new
/// book folder under `grouped`.
pub fn group_last_set(
    raw: &Path,
    grouped: &Path,
    per_book: usize,
) -> Result<LastSetOutcome, GroupError> {
    if per_book == 0 {
        return Err(GroupError::ZeroBatchSize);
    }

    let images = select::list_images(raw, Order::Chronological)?;
    if images.len() < per_book {
        debug!(available = images.len(), needed = per_book, "not enough photos for a batch");
        return Ok(LastSetOutcome::Insufficient {
            available: images.len(),
            needed: per_book,
        });
    }

    let last = &images[images.len() - per_book..];
    let folder = allocate::allocate(grouped)?;
    move_batch(last, &folder, 0)?;
    info!(folder = %folder.path.display(), photos = per_book, "book folder created");
    Ok(LastSetOutcome::Created(folder.path))
}

/// Group the whole pool, oldest first, into consecutive batches of
/// `per_book` photos, one new book folder per batch.
///
/// `max_groups` caps how many batches this call creates; the remaining
/// photos stay in the pool for a later run.
pub fn group_all(
    raw: &Path,
    grouped: &Path,
    per_book: usize,
    max_groups: Option<usize>,
) -> Result<GroupReport, GroupError> {
    if per_book == 0 {
        return Err(GroupError::ZeroBatchSize);
    }

    let images = select::list_images(raw, Order::Chronological)?;
    let full = images.len() / per_book;
    let batches = max_groups.map_or(full, |cap| full.min(cap));

    let mut created = Vec::with_capacity(batches);
    for batch in images.chunks_exact(per_book).take(batches) {
        let folder = allocate::allocate(grouped)?;
        move_batch(batch, &folder, created.len())?;
        info!(folder = %folder.path.display(), photos = per_book, "book folder created");
        created.push(folder.path);
    }

    let leftover = images.len() - created.len() * per_book;
    if leftover > 0 {
        debug!(leftover, "photos left in the raw pool");
    }

    Ok(GroupReport {
        created,
        leftover,
        per_book,
    })
}

/// Rename `batch` into `folder` as `01.ext`, `02.ext`, … in batch order.
fn move_batch(
    batch: &[PathBuf],
    folder: &BookFolder,
    completed_batches: usize,
) -> Result<(), GroupError> {
    let mut moved = Vec::with_capacity(batch.len());
    for (i, src) in batch.iter().enumerate() {
        let ext = src.extension().and_then(|e| e.to_str());
        let dest = folder.path.join(positional_name(i + 1, ext));
        if let Err(source) = fs::rename(src, &dest) {
            return Err(GroupError::Rename {
                from: src.clone(),
                to: dest,
                folder: folder.path.clone(),
                moved,
                completed_batches,
                source,
            });
        }
        debug!(from = %src.display(), to = %dest.display(), "moved photo");
        moved.push(dest);
    }
    Ok(())
}
