//! Shared test utilities for the blt test suite.
//!
//! Builds raw photo pools with controlled modification times and real
//! decodable images, and lists directory contents in a stable order for
//! assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_photo(tmp.path(), "a.jpg", 1);
//! write_photo(tmp.path(), "b.jpg", 2);
//! assert_eq!(dir_listing(tmp.path()), vec!["a.jpg", "b.jpg"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Base timestamp for fixture mtimes; offsets are added in seconds.
const FIXTURE_EPOCH_SECS: u64 = 1_700_000_000;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write a placeholder photo whose content is its own name, with an mtime
/// `secs` seconds after the fixture epoch.
///
/// Content doubles as identity: after a rename, `read_content` tells which
/// source file landed where.
pub fn write_photo(dir: &Path, name: &str, secs: u64) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, name.as_bytes()).unwrap();
    set_mtime(&path, secs);
    path
}

/// Write a real PNG of the given dimensions (solid color).
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 40, 90]));
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

/// Write a real JPEG of the given dimensions (solid color).
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 120, 200]));
    img.save_with_format(&path, image::ImageFormat::Jpeg).unwrap();
    path
}

/// Set a file's modification time to `secs` after the fixture epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(FIXTURE_EPOCH_SECS + secs);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

// =========================================================================
// Inspection
// =========================================================================

/// File names of `paths`, in the given order.
pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

/// Sorted names of everything directly inside `dir`, hidden entries excluded.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Content of a placeholder photo written by [`write_photo`].
pub fn read_content(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}
