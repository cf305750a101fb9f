//! Image preparation for upload.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize → JPEG** | Lanczos3 + `JpegEncoder` |
//! | **HEIC → JPEG** | `heif-convert`, falling back to `ffmpeg` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend
//! - **HEIC**: batch and single-file conversion through external programs

pub mod backend;
mod calculations;
pub mod heic;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_fit_dimensions;
pub use operations::{JpegConfig, encode_for_upload, get_dimensions, plan_jpeg};
pub use params::{JpegParams, Quality};
pub use rust_backend::RustBackend;
