//! CLI output formatting for every command.
//!
//! Output names entities by what they are (a book, a photo), with paths
//! shown as secondary context on indented lines.
//!
//! # Output Format
//!
//! ## Group
//!
//! ```text
//! 001 book_001 (2 photos)
//!     Path: photos_grouped/book_001
//! 002 book_002 (2 photos)
//!     Path: photos_grouped/book_002
//!
//! Grouped 2 books, 1 photo left in the pool
//! ```
//!
//! ## Describe
//!
//! ```text
//! Mensagem
//!     Author: Fernando Pessoa
//!     Price: 7.00€
//!     Description:
//!         TÍTULO: Mensagem
//!         ...
//! ```
//!
//! ## Publish
//!
//! ```text
//! Published Mensagem → https://www.vinted.pt/items/…
//!     Recorded as book 12
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::group::{GroupReport, LastSetOutcome};
use crate::naming::parse_book_folder;
use crate::types::BookMetadata;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Header line for a book folder: its index, name, and photo count.
///
/// ```text
/// 001 book_001 (2 photos)
/// ```
fn book_header(folder: &Path, per_book: usize) -> String {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let index = parse_book_folder(&name).unwrap_or(0) as usize;
    format!(
        "{} {} ({})",
        format_index(index),
        name,
        plural(per_book, "photo", "photos")
    )
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Group
// ============================================================================

pub fn format_last_set(outcome: &LastSetOutcome, per_book: usize) -> Vec<String> {
    match outcome {
        LastSetOutcome::Created(folder) => vec![
            book_header(folder, per_book),
            format!("{}Path: {}", indent(1), folder.display()),
        ],
        LastSetOutcome::Insufficient { available, needed } => vec![format!(
            "Not enough photos to group: {} available, {} needed",
            available, needed
        )],
    }
}

pub fn print_last_set(outcome: &LastSetOutcome, per_book: usize) {
    print_lines(format_last_set(outcome, per_book));
}

pub fn format_group_report(report: &GroupReport) -> Vec<String> {
    let mut lines = Vec::new();
    for folder in &report.created {
        lines.push(book_header(folder, report.per_book));
        lines.push(format!("{}Path: {}", indent(1), folder.display()));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Grouped {}, {} left in the pool",
        plural(report.created.len(), "book", "books"),
        plural(report.leftover, "photo", "photos")
    ));
    lines
}

pub fn print_group_report(report: &GroupReport) {
    print_lines(format_group_report(report));
}

// ============================================================================
// Describe
// ============================================================================

pub fn format_metadata(metadata: &BookMetadata) -> Vec<String> {
    let mut lines = vec![metadata.title.clone()];
    let fields = [
        ("Author", metadata.author.as_deref()),
        ("ISBN", metadata.isbn.as_deref()),
        ("Genre", metadata.genre.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            lines.push(format!("{}{}: {}", indent(1), label, value));
        }
    }
    lines.push(format!("{}Price: {:.2}€", indent(1), metadata.price));
    lines.push(format!("{}Description:", indent(1)));
    for line in metadata.description.lines() {
        if line.is_empty() {
            lines.push(String::new());
        } else {
            lines.push(format!("{}{}", indent(2), line));
        }
    }
    lines
}

pub fn print_metadata(metadata: &BookMetadata) {
    print_lines(format_metadata(metadata));
}

// ============================================================================
// Publish
// ============================================================================

pub fn format_published(metadata: &BookMetadata, url: &str, book_id: i64) -> Vec<String> {
    vec![
        format!("Published {} → {}", metadata.title, url),
        format!("{}Recorded as book {}", indent(1), book_id),
    ]
}

pub fn print_published(metadata: &BookMetadata, url: &str, book_id: i64) {
    print_lines(format_published(metadata, url, book_id));
}

// ============================================================================
// HEIC conversion
// ============================================================================

pub fn format_heic_output(created: &[PathBuf], root: &Path) -> Vec<String> {
    let mut lines: Vec<String> = created
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let rel = path.strip_prefix(root).unwrap_or(path);
            format!("{} {}", format_index(i + 1), rel.display())
        })
        .collect();
    lines.push(format!(
        "Converted {}",
        plural(created.len(), "HEIC file", "HEIC files")
    ));
    lines
}

pub fn print_heic_output(created: &[PathBuf], root: &Path) {
    print_lines(format_heic_output(created, root));
}

// ============================================================================
// Tests
// ============================================================================
