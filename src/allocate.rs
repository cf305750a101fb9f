//! Book folder allocation.
//!
//! Each allocation returns the next `book_NNN` index under the grouped root
//! and creates that folder immediately, so two allocations in a row can
//! never hand out the same name.
//!
//! The highest index ever handed out is also written to
//! [`HIGH_WATER_FILE`] in the grouped root. Deleting the newest folder
//! therefore does not make its name available again.
//!
//! There is no locking: two processes allocating against the same root at
//! the same time can collide. The eager `create_dir` turns such a collision
//! into an `AlreadyExists` error rather than a silent merge.

use crate::naming::{book_folder_digits, book_folder_name};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Hidden file recording the highest allocated index.
pub const HIGH_WATER_FILE: &str = ".last_book_index";

#[derive(Error, Debug)]
pub enum AllocateError {
    #[error("IO error allocating book folder: {0}")]
    Io(#[from] io::Error),
    /// An existing folder or the marker holds an index with no successor.
    #[error("Book index in {0} is too large to allocate after")]
    IndexOverflow(String),
}

/// A freshly created, empty book folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFolder {
    pub index: u64,
    pub path: PathBuf,
}

/// Compute the next free index under `root` without creating anything
/// except `root` itself.
///
/// `max(existing book_NNN indices, high-water mark) + 1`, or `1` when the
/// root holds no book folders and no marker. Entries not matching the
/// naming convention are ignored. A matching folder or marker whose index
/// does not fit in a `u64`, or equals `u64::MAX`, is an
/// [`AllocateError::IndexOverflow`].
pub fn next_book_index(root: &Path) -> Result<u64, AllocateError> {
    fs::create_dir_all(root)?;

    let mut highest = read_high_water(root)?;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(digits) = name.to_str().and_then(book_folder_digits) else {
            continue;
        };
        let index = parse_index(digits, &name.to_string_lossy())?;
        highest = highest.max(index);
    }
    highest
        .checked_add(1)
        .ok_or_else(|| AllocateError::IndexOverflow(root.display().to_string()))
}

/// Allocate the next book folder under `root` and create it on disk.
pub fn allocate(root: &Path) -> Result<BookFolder, AllocateError> {
    let index = next_book_index(root)?;
    let path = root.join(book_folder_name(index));
    fs::create_dir(&path)?;
    fs::write(root.join(HIGH_WATER_FILE), format!("{index}\n"))?;
    debug!(index, path = %path.display(), "allocated book folder");
    Ok(BookFolder { index, path })
}

fn parse_index(digits: &str, source: &str) -> Result<u64, AllocateError> {
    digits
        .parse()
        .map_err(|_| AllocateError::IndexOverflow(source.to_string()))
}

/// Read the high-water mark; missing or non-numeric markers count as zero.
fn read_high_water(root: &Path) -> Result<u64, AllocateError> {
    let Ok(content) = fs::read_to_string(root.join(HIGH_WATER_FILE)) else {
        return Ok(0);
    };
    let digits = content.trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(0);
    }
    parse_index(digits, HIGH_WATER_FILE)
}
