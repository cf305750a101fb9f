//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: identify, encode to JPEG, and report which sources it can read.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): the `image` crate for
//! pixel work, plus an external converter for HEIC sources.

use super::params::JpegParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported source format: {0}")]
    Unsupported(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// The temporary upload pipeline only talks to this trait, so tests can
/// substitute a backend that records calls or fails on demand.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode `params.source`, resize to the requested dimensions and return
    /// the encoded JPEG bytes.
    fn encode_jpeg(&self, params: &JpegParams) -> Result<Vec<u8>, BackendError>;

    /// Whether this backend has a decoder for `path` (by extension).
    fn can_decode(&self, path: &Path) -> bool;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Mock backend that records operations without touching pixels.
    ///
    /// Every source decodes to `dimensions` unless its file name is listed in
    /// `corrupt`, in which case identify fails like an undecodable file would.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub corrupt: HashSet<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        EncodeJpeg {
            source: String,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_dimensions(Dimensions {
                width: 4000,
                height: 3000,
            })
        }

        pub fn with_dimensions(dimensions: Dimensions) -> Self {
            Self {
                dimensions,
                corrupt: HashSet::new(),
                operations: Mutex::new(Vec::new()),
            }
        }

        /// Mark a file name as undecodable.
        pub fn with_corrupt(mut self, file_name: &str) -> Self {
            self.corrupt.insert(file_name.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn is_corrupt(&self, path: &Path) -> bool {
            path.file_name()
                .map(|n| self.corrupt.contains(n.to_string_lossy().as_ref()))
                .unwrap_or(false)
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            if self.is_corrupt(path) {
                return Err(BackendError::ProcessingFailed(format!(
                    "Failed to decode {}",
                    path.display()
                )));
            }
            Ok(self.dimensions)
        }

        fn encode_jpeg(&self, params: &JpegParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::EncodeJpeg {
                source: params.source.to_string_lossy().to_string(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            Ok(format!("jpeg:{}", params.source.display()).into_bytes())
        }

        fn can_decode(&self, path: &Path) -> bool {
            !self.is_corrupt(path)
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 800,
            height: 600,
        });

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_corrupt_file_fails_identify() {
        let backend = MockBackend::new().with_corrupt("bad.jpg");
        assert!(backend.identify(Path::new("/x/bad.jpg")).is_err());
        assert!(backend.identify(Path::new("/x/good.jpg")).is_ok());
        assert!(!backend.can_decode(Path::new("/x/bad.jpg")));
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();

        let bytes = backend
            .encode_jpeg(&JpegParams {
                source: "/source.png".into(),
                width: 1280,
                height: 960,
                quality: super::super::params::Quality::new(85),
            })
            .unwrap();

        assert_eq!(bytes, b"jpeg:/source.png");
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::EncodeJpeg {
                width: 1280,
                height: 960,
                quality: 85,
                ..
            }
        ));
    }
}
