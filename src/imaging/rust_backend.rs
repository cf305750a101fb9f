//! Production image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Decode (HEIC, HEIF) | [`heic::convert_to_jpeg`](super::heic::convert_to_jpeg) into a scratch dir, then `image` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Alpha is dropped before encoding; JPEG has no alpha channel.
//!
//! A HEIC source costs one external conversion per upload: the image
//! decoded by `identify` is kept and handed to the `encode_jpeg` call for
//! the same path.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::heic;
use super::params::{JpegParams, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

/// Extensions decoded by the `image` crate directly.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Quality of the intermediate JPEG made from a HEIC source.
const HEIC_INTERMEDIATE_QUALITY: u32 = 95;

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut exts: Vec<&'static str> = PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect();
    exts.extend_from_slice(heic::HEIC_EXTENSIONS);
    exts
});

/// Returns the image file extensions this backend can read.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Backend using the `image` crate, with HEIC routed through an external converter.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    last_heic: Mutex<Option<DecodedHeic>>,
}

/// HEIC source decoded by `identify`, waiting for its encode.
struct DecodedHeic {
    source: PathBuf,
    image: DynamicImage,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            last_heic: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<DecodedHeic>> {
        self.last_heic
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decode a HEIC source and keep it for the next encode of `path`.
    fn identify_heic(
        &self,
        path: &Path,
        load: impl Fn(&Path) -> Result<DynamicImage, BackendError>,
    ) -> Result<Dimensions, BackendError> {
        let image = load(path)?;
        let dims = Dimensions {
            width: image.width(),
            height: image.height(),
        };
        *self.slot() = Some(DecodedHeic {
            source: path.to_path_buf(),
            image,
        });
        Ok(dims)
    }

    /// The image kept by `identify` for `path`, or a fresh decode.
    fn take_heic(
        &self,
        path: &Path,
        load: impl Fn(&Path) -> Result<DynamicImage, BackendError>,
    ) -> Result<DynamicImage, BackendError> {
        let kept = self.slot().take().filter(|d| d.source.as_path() == path);
        match kept {
            Some(decoded) => Ok(decoded.image),
            None => load(path),
        }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode a non-HEIC image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Convert a HEIC file into a scratch JPEG and decode that.
fn load_heic(path: &Path) -> Result<DynamicImage, BackendError> {
    let scratch = tempfile::tempdir().map_err(BackendError::Io)?;
    let intermediate = scratch.path().join("intermediate.jpg");
    heic::convert_to_jpeg(path, &intermediate, Quality::new(HEIC_INTERMEDIATE_QUALITY))?;
    image::open(&intermediate).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Encode to JPEG bytes at the given quality.
fn encode_jpeg_bytes(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        if !self.can_decode(path) {
            return Err(BackendError::Unsupported(path.display().to_string()));
        }
        if heic::is_heic(path) {
            return self.identify_heic(path, load_heic);
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Dimensions { width, height })
    }

    fn encode_jpeg(&self, params: &JpegParams) -> Result<Vec<u8>, BackendError> {
        if !self.can_decode(&params.source) {
            return Err(BackendError::Unsupported(params.source.display().to_string()));
        }
        let img = if heic::is_heic(&params.source) {
            self.take_heic(&params.source, load_heic)?
        } else {
            load_image(&params.source)?
        };
        let img = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode_jpeg_bytes(&img, params.quality)
    }

    fn can_decode(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                supported_input_extensions()
                    .iter()
                    .any(|s| ext.eq_ignore_ascii_case(s))
            })
    }
}
