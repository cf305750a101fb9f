//! # blt
//!
//! Book listing automation. Photos of used books land in a flat pool; `blt`
//! moves them into one folder per book, reads the book's identity off the
//! photos, writes a listing, publishes it on Vinted and records it.
//!
//! # Pipeline
//!
//! ```text
//! photos_raw/ ──group──► photos_grouped/book_NNN/ ──describe──► BookMetadata
//!                                                                  │
//!                          SQLite (books, listings, photos) ◄──publish
//! ```
//!
//! 1. **Group**: the newest `per_book` photos (or the whole pool, oldest
//!    first) are renamed into freshly allocated `book_NNN` folders.
//! 2. **Describe**: a few photos are resized, uploaded under temporary keys,
//!    signed, and sent to a vision model. Every uploaded key is deleted when
//!    the step ends, whatever the outcome. A bibliographic lookup completes
//!    the answer. Without credentials the folder name is the title.
//! 3. **Publish**: Chrome fills the marketplace's new-item form with the
//!    folder's photos and the composed text.
//! 4. **Record**: the book, its listing and its photos are stored in one
//!    transaction.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`select`] | Lists a directory's photos, chronologically or lexically |
//! | [`naming`] | `book_NNN` folder and `NN.ext` photo name conventions |
//! | [`allocate`] | Next book folder, never reusing an index |
//! | [`group`] | Moves photos from the pool into book folders in fixed batches |
//! | [`imaging`] | Decode, resize and JPEG-encode; HEIC through external converters |
//! | [`storage`] | Object store trait, Supabase implementation, lazy handle |
//! | [`upload`] | Scoped temporary uploads with guaranteed deletion |
//! | [`describe`] | Vision model + bibliographic lookup → [`types::BookMetadata`] |
//! | [`publish`] | Marketplace posting through headless Chrome |
//! | [`db`] | SQLite persistence of published books |
//! | [`config`] | `blt.toml` loading, environment overrides, validation |
//! | [`types`] | Shared book identity and metadata types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Filesystem Is the Queue
//!
//! A photo's location is its state: in the pool it is waiting, inside a
//! book folder it is grouped. Grouping is a rename, so a photo is never in
//! both places and a second run never sees it again. Book folders are
//! never deleted by `blt`.
//!
//! ## Indices Only Grow
//!
//! `photos_grouped/.last_book_index` remembers the highest index ever
//! allocated. Deleting `book_003` by hand does not make `003` available
//! again, so a database row pointing at a folder path keeps meaning the
//! same book.
//!
//! ## Temporary Uploads Are Scoped
//!
//! The vision model needs URLs, so photos are uploaded to object storage.
//! [`upload::with_temporary_uploads`] ties the uploaded keys to a scope: on
//! success, on error and on panic the keys are deleted. A failed delete is
//! logged and never hides the scope's own result.
//!
//! ## One Process, No Locks
//!
//! Everything runs sequentially in one process. Concurrent `blt group`
//! runs against the same directories are not supported.

pub mod allocate;
pub mod config;
pub mod db;
pub mod describe;
pub mod group;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod publish;
pub mod select;
pub mod storage;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
