//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{JpegParams, Quality};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Configuration for upload-ready JPEG encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegConfig {
    /// Maximum size of the longer edge.
    pub max_edge: u32,
    pub quality: Quality,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            max_edge: 1280,
            quality: Quality::default(),
        }
    }
}

/// Plan a JPEG encode without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_jpeg(source: &Path, original_dims: (u32, u32), config: &JpegConfig) -> JpegParams {
    let (width, height) = calculate_fit_dimensions(original_dims, config.max_edge);
    JpegParams {
        source: source.to_path_buf(),
        width,
        height,
        quality: config.quality,
    }
}

/// Produce upload-ready JPEG bytes for `source`.
///
/// Identifies the source, bounds its longer edge by `config.max_edge` and
/// re-encodes at `config.quality`, whatever the source format was.
pub fn encode_for_upload(
    backend: &impl ImageBackend,
    source: &Path,
    config: &JpegConfig,
) -> Result<Vec<u8>> {
    let dims = get_dimensions(backend, source)?;
    let params = plan_jpeg(source, dims, config);
    backend.encode_jpeg(&params)
}
