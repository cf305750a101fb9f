//! Signed-URL response parsing.
//!
//! Storage API versions disagree on the field name carrying the URL, so the
//! parser tries each known spelling in order:
//!
//! | Order | Field |
//! |---|---|
//! | 1 | `signedURL` |
//! | 2 | `signedUrl` |
//! | 3 | `signed_url` |
//!
//! The value may be absolute or relative to the storage API base
//! (`{url}/storage/v1`).

use super::StorageError;
use serde_json::Value;

/// Field names tried, in order.
pub const SIGNED_URL_FIELDS: &[&str] = &["signedURL", "signedUrl", "signed_url"];

/// Extract the signed URL from a sign response, resolving it against `api_base`.
pub fn parse_signed_url(body: &Value, api_base: &str) -> Result<String, StorageError> {
    let found = SIGNED_URL_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .filter(|url| !url.is_empty());

    match found {
        Some(url) => Ok(resolve(url, api_base)),
        None => Err(StorageError::MissingSignedUrl {
            fields: SIGNED_URL_FIELDS,
            body: body.to_string(),
        }),
    }
}

fn resolve(url: &str, api_base: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    let base = api_base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://proj.supabase.co/storage/v1";

    #[test]
    fn prefers_first_field_in_order() {
        let body = json!({
            "signed_url": "https://c.example/3",
            "signedUrl": "https://b.example/2",
            "signedURL": "https://a.example/1",
        });
        assert_eq!(parse_signed_url(&body, BASE).unwrap(), "https://a.example/1");
    }

    #[test]
    fn falls_back_to_later_spellings() {
        let body = json!({ "signedUrl": "https://b.example/2" });
        assert_eq!(parse_signed_url(&body, BASE).unwrap(), "https://b.example/2");

        let body = json!({ "signed_url": "https://c.example/3" });
        assert_eq!(parse_signed_url(&body, BASE).unwrap(), "https://c.example/3");
    }

    #[test]
    fn relative_url_is_resolved_against_api_base() {
        let body = json!({ "signedURL": "/object/sign/books/vision/x_01.jpg?token=abc" });
        assert_eq!(
            parse_signed_url(&body, BASE).unwrap(),
            "https://proj.supabase.co/storage/v1/object/sign/books/vision/x_01.jpg?token=abc"
        );

        let body = json!({ "signedURL": "object/sign/k?token=abc" });
        assert_eq!(
            parse_signed_url(&body, &format!("{BASE}/")).unwrap(),
            "https://proj.supabase.co/storage/v1/object/sign/k?token=abc"
        );
    }

    #[test]
    fn missing_field_fails_explicitly() {
        let body = json!({ "error": "not found" });
        let err = parse_signed_url(&body, BASE).unwrap_err();
        assert!(matches!(err, StorageError::MissingSignedUrl { .. }));
        assert!(err.to_string().contains("signedURL"));
    }

    #[test]
    fn non_string_or_empty_value_is_missing() {
        assert!(parse_signed_url(&json!({ "signedURL": 42 }), BASE).is_err());
        assert!(parse_signed_url(&json!({ "signedURL": "" }), BASE).is_err());
    }
}
