//! Image selection: which files in a directory count as photos, and in
//! which order.
//!
//! The raw pool is read chronologically (oldest first) so batches follow
//! capture order. Book folders are read lexically, which matches their
//! order because the batcher names files `01.jpg`, `02.jpg`, …
//!
//! Selection never recurses and never touches the files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extensions accepted as photos (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];

/// Ordering applied to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Modification time ascending; equal times fall back to file name.
    Chronological,
    /// File name ascending.
    Lexical,
}

/// Whether `path` has one of the supported photo extensions.
///
/// Only looks at the name; use on paths already known to be files.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

/// List the photos directly inside `dir`, ordered by `order`.
///
/// A missing directory is treated like an empty one.
pub fn list_images(dir: &Path, order: Order) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut images: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || !has_image_extension(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        images.push((modified, path));
    }

    match order {
        Order::Chronological => images.sort(),
        Order::Lexical => images.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name())),
    }

    Ok(images.into_iter().map(|(_, path)| path).collect())
}
