//! HEIC/HEIF → JPEG conversion through external codec programs.
//!
//! Neither the `image` crate nor any pure-Rust decoder reads HEIC, so
//! conversion shells out to the first converter that succeeds:
//!
//! | Program | Invocation |
//! |---|---|
//! | `heif-convert` (libheif) | `heif-convert -q <quality> src dst.jpg` |
//! | `ffmpeg` | `ffmpeg -y -loglevel error -i src -frames:v 1 -q:v <qscale> dst.jpg` |
//!
//! A missing program counts as a failed attempt, not an error of its own.

use super::backend::BackendError;
use super::params::Quality;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extensions handled by this module (compared case-insensitively).
pub const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Whether `path` names a HEIC/HEIF file.
pub fn is_heic(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEIC_EXTENSIONS.iter().any(|h| ext.eq_ignore_ascii_case(h)))
}

/// Map a 1–100 quality onto ffmpeg's MJPEG `-q:v` scale (2 best, 31 worst).
fn ffmpeg_qscale(quality: Quality) -> u32 {
    2 + (100 - quality.value()) * 29 / 99
}

/// Convert `src` to a JPEG at `dst`, trying each external converter in turn.
pub fn convert_to_jpeg(src: &Path, dst: &Path, quality: Quality) -> Result<(), BackendError> {
    let quality_arg = quality.value().to_string();
    let qscale_arg = ffmpeg_qscale(quality).to_string();
    let attempts: [(&str, Vec<&std::ffi::OsStr>); 2] = [
        (
            "heif-convert",
            vec!["-q".as_ref(), quality_arg.as_ref(), src.as_os_str(), dst.as_os_str()],
        ),
        (
            "ffmpeg",
            vec![
                "-y".as_ref(),
                "-loglevel".as_ref(),
                "error".as_ref(),
                "-i".as_ref(),
                src.as_os_str(),
                "-frames:v".as_ref(),
                "1".as_ref(),
                "-q:v".as_ref(),
                qscale_arg.as_ref(),
                dst.as_os_str(),
            ],
        ),
    ];

    let mut failures = Vec::new();
    for (program, args) in attempts {
        match Command::new(program).args(&args).output() {
            Ok(out) if out.status.success() && dst.exists() => {
                debug!(program, src = %src.display(), "converted HEIC");
                return Ok(());
            }
            Ok(out) => failures.push(format!(
                "{program} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )),
            Err(e) => failures.push(format!("{program}: {e}")),
        }
    }

    Err(BackendError::ProcessingFailed(format!(
        "No HEIC converter succeeded for {} ({})",
        src.display(),
        failures.join("; ")
    )))
}

/// Convert a single HEIC/HEIF file to a sibling `.jpg` with the same stem.
///
/// Returns `Ok(None)` when `src` is not a HEIC file. The original is
/// removed after a successful conversion when `delete_src` is set; a failed
/// removal is logged and does not fail the conversion.
pub fn convert_file(
    src: &Path,
    delete_src: bool,
    quality: Quality,
) -> Result<Option<PathBuf>, BackendError> {
    if !is_heic(src) {
        return Ok(None);
    }
    let dst = src.with_extension("jpg");
    convert_to_jpeg(src, &dst, quality)?;
    if delete_src && let Err(e) = fs::remove_file(src) {
        warn!(src = %src.display(), error = %e, "converted but could not remove original");
    }
    Ok(Some(dst))
}

/// Convert every HEIC/HEIF file under `folder`.
///
/// Files that fail to convert are logged and skipped. Returns the JPEGs
/// created, in path order.
pub fn convert_folder(
    folder: &Path,
    recursive: bool,
    delete_src: bool,
    quality: Quality,
) -> Result<Vec<PathBuf>, BackendError> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut sources = Vec::new();
    for entry in WalkDir::new(folder).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
        if entry.file_type().is_file() && is_heic(entry.path()) {
            sources.push(entry.into_path());
        }
    }

    let mut created = Vec::new();
    for src in &sources {
        match convert_file(src, delete_src, quality) {
            Ok(Some(jpg)) => created.push(jpg),
            Ok(None) => {}
            Err(e) => warn!(src = %src.display(), error = %e, "HEIC conversion failed"),
        }
    }
    info!(
        folder = %folder.display(),
        converted = created.len(),
        failed = sources.len() - created.len(),
        "HEIC conversion finished"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn recognizes_heic_extensions() {
        assert!(is_heic(Path::new("a.heic")));
        assert!(is_heic(Path::new("a.HEIF")));
        assert!(!is_heic(Path::new("a.jpg")));
        assert!(!is_heic(Path::new("heic")));
    }

    #[test]
    fn qscale_spans_ffmpeg_range() {
        assert_eq!(ffmpeg_qscale(Quality::new(100)), 2);
        assert_eq!(ffmpeg_qscale(Quality::new(1)), 31);
        let mid = ffmpeg_qscale(Quality::new(85));
        assert!((2..=31).contains(&mid));
    }

    #[test]
    fn convert_file_skips_non_heic() {
        let tmp = TempDir::new().unwrap();
        let jpg = tmp.path().join("a.jpg");
        fs::write(&jpg, b"x").unwrap();
        assert_eq!(convert_file(&jpg, true, Quality::default()).unwrap(), None);
        assert!(jpg.exists());
    }

    #[test]
    fn convert_folder_without_heic_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/b.png"), b"x").unwrap();

        let created = convert_folder(tmp.path(), true, true, Quality::default()).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn undecodable_heic_is_left_in_place() {
        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("broken.heic");
        fs::write(&fake, b"not really heic").unwrap();

        // Whatever converters exist on the machine, garbage input must fail
        // and the original must survive.
        let created = convert_folder(tmp.path(), false, true, Quality::default()).unwrap();
        assert!(created.is_empty());
        assert!(fake.exists());
    }
}
