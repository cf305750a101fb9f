//! Bibliographic lookup against the Google Books volumes API.
//!
//! | Known | Query |
//! |---|---|
//! | ISBN | `isbn:{isbn}` |
//! | title (+ author) | `intitle:{title} inauthor:{author}` |
//! | neither | no request |

use crate::types::BookIdentity;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Lookup returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// A catalogue that can confirm or complete a partial identity.
pub trait BibliographicLookup {
    /// Best match for `identity`, or `None` when nothing matched or there
    /// was nothing to search by.
    fn lookup(&self, identity: &BookIdentity) -> Result<Option<BookIdentity>, LookupError>;
}

pub struct GoogleBooks {
    client: Client,
    api_base: String,
}

impl GoogleBooks {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// Search expression for `identity`, preferring the ISBN.
pub fn query_for(identity: &BookIdentity) -> Option<String> {
    if let Some(isbn) = &identity.isbn {
        return Some(format!("isbn:{isbn}"));
    }
    let title = identity.title.as_ref()?;
    Some(match &identity.author {
        Some(author) => format!("intitle:{title} inauthor:{author}"),
        None => format!("intitle:{title}"),
    })
}

impl BibliographicLookup for GoogleBooks {
    fn lookup(&self, identity: &BookIdentity) -> Result<Option<BookIdentity>, LookupError> {
        let Some(query) = query_for(identity) else {
            return Ok(None);
        };
        debug!(%query, "bibliographic lookup");

        let response = self
            .client
            .get(format!("{}/volumes", self.api_base))
            .query(&[("q", query.as_str()), ("maxResults", "1")])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let volumes: Volumes = response.json()?;
        Ok(first_match(volumes))
    }
}

#[derive(Debug, Default, Deserialize)]
struct Volumes {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

fn first_match(volumes: Volumes) -> Option<BookIdentity> {
    let info = volumes.items.into_iter().next()?.volume_info;
    let isbn = ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
        info.industry_identifiers
            .iter()
            .find(|id| id.kind == *kind)
            .map(|id| id.identifier.clone())
    });
    Some(
        BookIdentity {
            title: info.title,
            author: (!info.authors.is_empty()).then(|| info.authors.join(", ")),
            isbn,
            genre: info.categories.into_iter().next(),
        }
        .normalized(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(title: Option<&str>, author: Option<&str>, isbn: Option<&str>) -> BookIdentity {
        BookIdentity {
            title: title.map(String::from),
            author: author.map(String::from),
            isbn: isbn.map(String::from),
            genre: None,
        }
    }

    #[test]
    fn query_prefers_isbn() {
        let id = identity(Some("Mensagem"), Some("Fernando Pessoa"), Some("9789722"));
        assert_eq!(query_for(&id).as_deref(), Some("isbn:9789722"));
    }

    #[test]
    fn query_by_title_and_author() {
        let id = identity(Some("Mensagem"), Some("Fernando Pessoa"), None);
        assert_eq!(
            query_for(&id).as_deref(),
            Some("intitle:Mensagem inauthor:Fernando Pessoa")
        );
        let id = identity(Some("Mensagem"), None, None);
        assert_eq!(query_for(&id).as_deref(), Some("intitle:Mensagem"));
    }

    #[test]
    fn nothing_to_search_by() {
        assert_eq!(query_for(&identity(None, Some("Anon"), None)), None);
    }

    #[test]
    fn parses_first_volume() {
        let body = r#"{
            "totalItems": 2,
            "items": [
                {"volumeInfo": {
                    "title": "Os Maias",
                    "authors": ["Eça de Queirós"],
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "9722100000"},
                        {"type": "ISBN_13", "identifier": "9789722100001"}
                    ],
                    "categories": ["Fiction", "Classics"]
                }},
                {"volumeInfo": {"title": "Other"}}
            ]
        }"#;
        let volumes: Volumes = serde_json::from_str(body).unwrap();
        let found = first_match(volumes).unwrap();
        assert_eq!(found.title.as_deref(), Some("Os Maias"));
        assert_eq!(found.author.as_deref(), Some("Eça de Queirós"));
        assert_eq!(found.isbn.as_deref(), Some("9789722100001"));
        assert_eq!(found.genre.as_deref(), Some("Fiction"));
    }

    #[test]
    fn no_items_is_no_match() {
        let volumes: Volumes = serde_json::from_str(r#"{"totalItems": 0}"#).unwrap();
        assert_eq!(first_match(volumes), None);
    }
}
