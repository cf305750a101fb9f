//! End-to-end batching through the public API: pool → book folders →
//! persisted listing.

use blt::allocate::HIGH_WATER_FILE;
use blt::config::ListingConfig;
use blt::db::Database;
use blt::describe::{MetadataComposer, PlaceholderComposer};
use blt::group::{LastSetOutcome, group_all, group_last_set};
use blt::select::{Order, list_images};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn photo(dir: &Path, name: &str, secs: u64) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, name.as_bytes()).unwrap();
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    path
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn newest_pair_becomes_first_book() {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("photos_raw");
    let grouped = tmp.path().join("photos_grouped");
    photo(&raw, "a.jpg", 1);
    photo(&raw, "b.jpg", 2);
    photo(&raw, "c.heic", 3);

    let outcome = group_last_set(&raw, &grouped, 2).unwrap();

    let book = grouped.join("book_001");
    assert_eq!(outcome, LastSetOutcome::Created(book.clone()));
    assert_eq!(names(&book), vec!["01.jpg", "02.heic"]);
    assert_eq!(fs::read_to_string(book.join("01.jpg")).unwrap(), "b.jpg");
    assert_eq!(fs::read_to_string(book.join("02.heic")).unwrap(), "c.heic");
    assert_eq!(names(&raw), vec!["a.jpg"]);
}

#[test]
fn short_pool_is_left_alone() {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("photos_raw");
    let grouped = tmp.path().join("photos_grouped");
    photo(&raw, "a.jpg", 1);

    let outcome = group_last_set(&raw, &grouped, 2).unwrap();

    assert_eq!(
        outcome,
        LastSetOutcome::Insufficient {
            available: 1,
            needed: 2
        }
    );
    assert_eq!(names(&raw), vec!["a.jpg"]);
    assert!(!grouped.join("book_001").exists());
}

#[test]
fn whole_pool_then_nothing_left_to_do() {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("photos_raw");
    let grouped = tmp.path().join("photos_grouped");
    for (i, name) in ["a.jpg", "b.png", "c.jpg", "d.webp", "e.jpg"].iter().enumerate() {
        photo(&raw, name, i as u64);
    }
    photo(&raw, "notes.txt", 10);

    let report = group_all(&raw, &grouped, 2, None).unwrap();
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.leftover, 1);
    assert_eq!(names(&raw), vec!["e.jpg", "notes.txt"]);

    let again = group_all(&raw, &grouped, 2, None).unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.leftover, 1);
}

#[test]
fn deleted_book_index_is_not_reused() {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("photos_raw");
    let grouped = tmp.path().join("photos_grouped");
    photo(&raw, "a.jpg", 1);
    photo(&raw, "b.jpg", 2);
    group_last_set(&raw, &grouped, 2).unwrap();

    fs::remove_dir_all(grouped.join("book_001")).unwrap();
    assert!(grouped.join(HIGH_WATER_FILE).exists());

    photo(&raw, "c.jpg", 3);
    photo(&raw, "d.jpg", 4);
    let outcome = group_last_set(&raw, &grouped, 2).unwrap();
    assert_eq!(outcome, LastSetOutcome::Created(grouped.join("book_002")));
}

#[test]
fn grouped_book_is_described_and_recorded() {
    let tmp = TempDir::new().unwrap();
    let raw = tmp.path().join("photos_raw");
    let grouped = tmp.path().join("photos_grouped");
    photo(&raw, "a.jpg", 1);
    photo(&raw, "b.jpg", 2);
    let LastSetOutcome::Created(book) = group_last_set(&raw, &grouped, 2).unwrap() else {
        panic!("expected a book folder");
    };

    let composer = PlaceholderComposer {
        listing: ListingConfig::default(),
    };
    let metadata = composer.describe(&book).unwrap();
    assert_eq!(metadata.title, "Book 001");
    assert_eq!(metadata.price, 7.0);

    let photos: Vec<String> = list_images(&book, Order::Lexical)
        .unwrap()
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    let mut db = Database::open(&tmp.path().join("blt.db")).unwrap();
    db.init().unwrap();
    let id = db
        .record_listing(&book, &metadata, "vinted", "https://example.test/items/1", &photos)
        .unwrap();

    assert_eq!(db.count_books().unwrap(), 1);
    assert_eq!(db.photos_for(id).unwrap(), photos);
    assert!(book.exists());
}
