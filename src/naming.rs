//! Centralized naming for the grouped-output layout.
//!
//! Two conventions live here so the allocator, the batcher and the
//! describe step agree on them:
//!
//! - Book folders: `book_NNN`, zero-padded to at least three digits
//!   (`book_001`, `book_042`, `book_1000`).
//! - Positional photos inside a folder: `NN.ext`, two digits, extension
//!   lowercased (`01.jpg`, `02.heic`).

/// Prefix shared by every book folder name.
pub const BOOK_PREFIX: &str = "book_";

/// Format the folder name for a book index.
///
/// - `1` → `"book_001"`
/// - `42` → `"book_042"`
/// - `1000` → `"book_1000"`
pub fn book_folder_name(index: u64) -> String {
    format!("{BOOK_PREFIX}{index:03}")
}

/// The digit suffix of a name following the `book_NNN` convention.
///
/// Returns `None` for anything else: fewer than three digits, a
/// non-numeric suffix, trailing text, or a different prefix. The suffix
/// is returned as is, however many digits it has.
pub fn book_folder_digits(name: &str) -> Option<&str> {
    let digits = name.strip_prefix(BOOK_PREFIX)?;
    if digits.len() < 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// Parse a folder name following the `book_NNN` convention.
///
/// `None` when the name does not follow the convention or its index does
/// not fit in a `u64`; use [`book_folder_digits`] to tell the two apart.
pub fn parse_book_folder(name: &str) -> Option<u64> {
    book_folder_digits(name)?.parse().ok()
}

/// Format the positional file name for the photo at `position` (1-based).
///
/// The source extension is kept but lowercased; a source without an
/// extension yields a bare number.
///
/// - `(1, Some("JPG"))` → `"01.jpg"`
/// - `(2, Some("heic"))` → `"02.heic"`
pub fn positional_name(position: usize, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!("{position:02}.{}", ext.to_lowercase()),
        _ => format!("{position:02}"),
    }
}

/// Display title derived from a folder name: `book_001` → `Book 001`.
///
/// Underscores become spaces and each word is capitalized.
pub fn display_title(folder_name: &str) -> String {
    folder_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_name_pads_to_three_digits() {
        assert_eq!(book_folder_name(1), "book_001");
        assert_eq!(book_folder_name(42), "book_042");
        assert_eq!(book_folder_name(999), "book_999");
    }

    #[test]
    fn folder_name_grows_past_three_digits() {
        assert_eq!(book_folder_name(1000), "book_1000");
    }

    #[test]
    fn parse_accepts_padded_index() {
        assert_eq!(parse_book_folder("book_001"), Some(1));
        assert_eq!(parse_book_folder("book_120"), Some(120));
        assert_eq!(parse_book_folder("book_1000"), Some(1000));
    }

    #[test]
    fn parse_rejects_short_index() {
        assert_eq!(parse_book_folder("book_1"), None);
        assert_eq!(parse_book_folder("book_01"), None);
    }

    #[test]
    fn parse_rejects_other_names() {
        assert_eq!(parse_book_folder("book_abc"), None);
        assert_eq!(parse_book_folder("book_001_old"), None);
        assert_eq!(parse_book_folder("album_001"), None);
        assert_eq!(parse_book_folder("Book_001"), None);
        assert_eq!(parse_book_folder(""), None);
    }

    #[test]
    fn digits_keep_indices_too_large_to_parse() {
        assert_eq!(book_folder_digits("book_5000000000"), Some("5000000000"));
        assert_eq!(parse_book_folder("book_5000000000"), Some(5_000_000_000));
        let huge = "book_99999999999999999999999";
        assert_eq!(book_folder_digits(huge), Some("99999999999999999999999"));
        assert_eq!(parse_book_folder(huge), None);
        assert_eq!(book_folder_digits("book_12"), None);
    }

    #[test]
    fn positional_name_lowercases_extension() {
        assert_eq!(positional_name(1, Some("JPG")), "01.jpg");
        assert_eq!(positional_name(2, Some("heic")), "02.heic");
        assert_eq!(positional_name(12, Some("Png")), "12.png");
    }

    #[test]
    fn positional_name_without_extension() {
        assert_eq!(positional_name(3, None), "03");
        assert_eq!(positional_name(3, Some("")), "03");
    }

    #[test]
    fn display_title_from_folder() {
        assert_eq!(display_title("book_001"), "Book 001");
        assert_eq!(display_title("old_BOOKS"), "Old Books");
    }
}
