//! SQLite persistence for published books.
//!
//! | Table | Rows |
//! |---|---|
//! | `books` | one per described book, `status = 'available'` |
//! | `listings` | one per marketplace post, `status = 'posted'` |
//! | `book_photos` | one per photo, `idx` 1-based in folder order |
//!
//! A book, its listing and its photos are written in one transaction.

use crate::types::BookMetadata;
use rusqlite::{Connection, params};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS books (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    author      TEXT,
    isbn        TEXT,
    genre       TEXT,
    description TEXT NOT NULL,
    price       REAL NOT NULL,
    quantity    INTEGER NOT NULL DEFAULT 1,
    status      TEXT NOT NULL DEFAULT 'available',
    folder_path TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE TABLE IF NOT EXISTS listings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id     INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    platform    TEXT NOT NULL,
    listing_url TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'posted',
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE TABLE IF NOT EXISTS book_photos (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
    url     TEXT NOT NULL,
    idx     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_listings_book ON listings(book_id);
CREATE INDEX IF NOT EXISTS idx_book_photos_book ON book_photos(book_id);
";

/// A stored listing row.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub id: i64,
    pub platform: String,
    pub listing_url: String,
    pub status: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Create the tables if missing. Safe to run repeatedly.
    pub fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Store a published book with its listing and photos; returns the book id.
    pub fn record_listing(
        &mut self,
        folder: &Path,
        metadata: &BookMetadata,
        platform: &str,
        listing_url: &str,
        photos: &[String],
    ) -> Result<i64, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO books (title, author, isbn, genre, description, price, folder_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                metadata.title,
                metadata.author,
                metadata.isbn,
                metadata.genre,
                metadata.description,
                metadata.price,
                folder.to_string_lossy(),
            ],
        )?;
        let book_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO listings (book_id, platform, listing_url) VALUES (?1, ?2, ?3)",
            params![book_id, platform, listing_url],
        )?;
        {
            let mut insert =
                tx.prepare("INSERT INTO book_photos (book_id, url, idx) VALUES (?1, ?2, ?3)")?;
            for (i, url) in photos.iter().enumerate() {
                insert.execute(params![book_id, url, (i + 1) as i64])?;
            }
        }
        tx.commit()?;

        info!(book_id, platform, %listing_url, "listing recorded");
        Ok(book_id)
    }

    pub fn count_books(&self) -> Result<usize, DbError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn listings_for(&self, book_id: i64) -> Result<Vec<ListingRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, listing_url, status FROM listings WHERE book_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([book_id], |r| {
            Ok(ListingRow {
                id: r.get(0)?,
                platform: r.get(1)?,
                listing_url: r.get(2)?,
                status: r.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Photo URLs of a book, in `idx` order.
    pub fn photos_for(&self, book_id: i64) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM book_photos WHERE book_id = ?1 ORDER BY idx")?;
        let rows = stmt.query_map([book_id], |r| r.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Title, price, quantity and status of a book.
    pub fn book_summary(&self, book_id: i64) -> Result<(String, f64, i64, String), DbError> {
        Ok(self.conn.query_row(
            "SELECT title, price, quantity, status FROM books WHERE id = ?1",
            [book_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metadata() -> BookMetadata {
        BookMetadata {
            title: "Mensagem".into(),
            author: Some("Fernando Pessoa".into()),
            isbn: None,
            genre: Some("Poesia".into()),
            price: 7.0,
            description: "TÍTULO: Mensagem".into(),
        }
    }

    #[test]
    fn init_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db.init().unwrap();
        assert_eq!(db.count_books().unwrap(), 0);
    }

    #[test]
    fn record_listing_round_trip() {
        let mut db = Database::open_in_memory().unwrap();
        db.init().unwrap();

        let photos = vec!["/g/book_001/01.jpg".to_string(), "/g/book_001/02.jpg".to_string()];
        let id = db
            .record_listing(
                Path::new("/g/book_001"),
                &metadata(),
                "vinted",
                "https://www.vinted.pt/items/1-mensagem",
                &photos,
            )
            .unwrap();

        assert_eq!(db.count_books().unwrap(), 1);
        let (title, price, quantity, status) = db.book_summary(id).unwrap();
        assert_eq!(title, "Mensagem");
        assert_eq!(price, 7.0);
        assert_eq!(quantity, 1);
        assert_eq!(status, "available");

        let listings = db.listings_for(id).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].platform, "vinted");
        assert_eq!(listings[0].status, "posted");
        assert_eq!(db.photos_for(id).unwrap(), photos);
    }

    #[test]
    fn books_get_distinct_ids() {
        let mut db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let a = db
            .record_listing(Path::new("/a"), &metadata(), "vinted", "u1", &[])
            .unwrap();
        let b = db
            .record_listing(Path::new("/b"), &metadata(), "vinted", "u2", &[])
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(db.count_books().unwrap(), 2);
    }

    #[test]
    fn record_without_schema_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let result = db.record_listing(Path::new("/a"), &metadata(), "vinted", "u", &[]);
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }

    #[test]
    fn file_database_persists_across_opens() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blt.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.init().unwrap();
            db.record_listing(Path::new("/a"), &metadata(), "vinted", "u", &[])
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        db.init().unwrap();
        assert_eq!(db.count_books().unwrap(), 1);
    }
}
