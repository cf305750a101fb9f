//! Shared types passed between the describe, publish and persistence steps.

use serde::{Deserialize, Serialize};

/// Everything known about one book once it has been described.
///
/// Produced by a [`MetadataComposer`](crate::describe::MetadataComposer),
/// consumed by the publisher and the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Asking price in euros.
    pub price: f64,
    /// Listing body text.
    pub description: String,
}

/// What the vision model read off the photos.
///
/// Every field may be missing; the model answers with `null` when unsure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookIdentity {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

impl BookIdentity {
    /// Fill fields missing here from `other`, keeping the ones already set.
    pub fn or(self, other: BookIdentity) -> BookIdentity {
        BookIdentity {
            title: self.title.or(other.title),
            author: self.author.or(other.author),
            isbn: self.isbn.or(other.isbn),
            genre: self.genre.or(other.genre),
        }
    }

    /// Drop blank strings, trim the rest.
    pub fn normalized(self) -> BookIdentity {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        };
        BookIdentity {
            title: clean(self.title),
            author: clean(self.author),
            isbn: clean(self.isbn).map(|s| s.replace(['-', ' '], "")),
            genre: clean(self.genre),
        }
    }
}
