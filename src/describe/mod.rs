//! Turning a book folder into listing metadata.
//!
//! ```text
//! book_001/ ──list (lexical)──► with_temporary_uploads ──► VisionClient
//!                                                              │ identity
//!                                                              ▼
//!                                                   BibliographicLookup (optional)
//!                                                              │
//!                                                              ▼
//!                                               price + description → BookMetadata
//! ```
//!
//! Two composers implement [`MetadataComposer`]:
//!
//! | Composer | Title source | Needs |
//! |---|---|---|
//! | [`VisionComposer`] | vision model, completed by the lookup | storage + API key |
//! | [`PlaceholderComposer`] | folder name (`book_001` → `Book 001`) | nothing |
//!
//! Both price and describe the same way: see [`compute_price`] and
//! [`compose_description`].

pub mod bibliographic;
pub mod vision;

use crate::config::ListingConfig;
use crate::imaging::ImageBackend;
use crate::naming::display_title;
use crate::select::{Order, list_images};
use crate::storage::{LazyStore, StorageError};
use crate::types::{BookIdentity, BookMetadata};
use crate::upload::{UploadError, UploadOptions, with_temporary_uploads};
use bibliographic::{BibliographicLookup, LookupError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use vision::{VisionClient, VisionError};

/// Price floor in euros, applied before the margin.
pub const PRICE_FLOOR_EUR: f64 = 5.0;

#[derive(Error, Debug)]
pub enum DescribeError {
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("Vision request failed: {0}")]
    Vision(#[from] VisionError),
    #[error("Bibliographic lookup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("No usable images in {}", .0.display())]
    NoImages(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces listing metadata for one book folder.
pub trait MetadataComposer {
    fn describe(&self, folder: &Path) -> Result<BookMetadata, DescribeError>;
}

/// `max(price_min, 5) + price_margin_eur`, rounded to cents.
pub fn compute_price(listing: &ListingConfig) -> f64 {
    let price = listing.price_min.max(PRICE_FLOOR_EUR) + listing.price_margin_eur;
    (price * 100.0).round() / 100.0
}

/// The Portuguese listing text.
///
/// The author line appears only when the author is known. The price is
/// shown in whole euros.
pub fn compose_description(
    title: &str,
    author: Option<&str>,
    price: f64,
    listing: &ListingConfig,
) -> String {
    let mut text = format!("TÍTULO: {title}\n");
    if let Some(author) = author {
        text.push_str(&format!("Autor: {author}\n"));
    }
    text.push_str(&format!("Preço: {price:.0}€\n\n"));
    text.push_str("Livro em bom estado.\n");
    text.push_str(&format!(
        "Entrega em mão na {}, senão {}.\n",
        listing.location, listing.shipping
    ));
    text.push_str("Tenho outros livros à venda; ao comprar mais, paga apenas uma vez o transporte.");
    text
}

/// Assemble metadata from an identity, falling back to `fallback_title`.
pub fn build_metadata(
    identity: BookIdentity,
    fallback_title: &str,
    listing: &ListingConfig,
) -> BookMetadata {
    let title = identity
        .title
        .unwrap_or_else(|| fallback_title.to_string());
    let price = compute_price(listing);
    let description = compose_description(&title, identity.author.as_deref(), price, listing);
    BookMetadata {
        title,
        author: identity.author,
        isbn: identity.isbn,
        genre: identity.genre,
        price,
        description,
    }
}

fn folder_title(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| display_title(&n.to_string_lossy()))
        .unwrap_or_default()
}

/// Metadata from the folder name alone.
pub struct PlaceholderComposer {
    pub listing: ListingConfig,
}

impl MetadataComposer for PlaceholderComposer {
    fn describe(&self, folder: &Path) -> Result<BookMetadata, DescribeError> {
        Ok(build_metadata(
            BookIdentity::default(),
            &folder_title(folder),
            &self.listing,
        ))
    }
}

/// Metadata read off the photos by a vision model.
pub struct VisionComposer<'s, B, V, L> {
    pub store: &'s LazyStore,
    pub backend: B,
    pub vision: V,
    pub lookup: L,
    pub upload: UploadOptions,
    pub listing: ListingConfig,
}

impl<B, V, L> VisionComposer<'_, B, V, L>
where
    B: ImageBackend,
    V: VisionClient,
    L: BibliographicLookup,
{
    /// The folder's photos this composer would send, in order.
    pub fn select_images(&self, folder: &Path) -> Result<Vec<PathBuf>, DescribeError> {
        let images: Vec<PathBuf> = list_images(folder, Order::Lexical)?
            .into_iter()
            .filter(|p| self.backend.can_decode(p))
            .take(self.upload.max_images)
            .collect();
        if images.is_empty() {
            return Err(DescribeError::NoImages(folder.to_path_buf()));
        }
        Ok(images)
    }

    fn complete(&self, identity: BookIdentity) -> BookIdentity {
        match self.lookup.lookup(&identity) {
            Ok(Some(found)) => identity.or(found),
            Ok(None) => identity,
            Err(e) => {
                warn!(error = %e, "bibliographic lookup failed, using vision answer alone");
                identity
            }
        }
    }
}

impl<B, V, L> MetadataComposer for VisionComposer<'_, B, V, L>
where
    B: ImageBackend,
    V: VisionClient,
    L: BibliographicLookup,
{
    fn describe(&self, folder: &Path) -> Result<BookMetadata, DescribeError> {
        let images = self.select_images(folder)?;
        let store = self.store.get()?;

        let identity = with_temporary_uploads(
            &*store,
            &self.backend,
            &images,
            &self.upload,
            |uploads| -> Result<BookIdentity, DescribeError> {
                if uploads.is_empty() {
                    return Err(DescribeError::NoImages(folder.to_path_buf()));
                }
                Ok(self.vision.identify(&uploads.urls())?)
            },
        )?;

        let identity = self.complete(identity.normalized());
        info!(
            folder = %folder.display(),
            title = identity.title.as_deref().unwrap_or("-"),
            "book identified"
        );
        Ok(build_metadata(identity, &folder_title(folder), &self.listing))
    }
}
