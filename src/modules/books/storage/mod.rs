//! Entity store for books.
//!
//! Every read excludes tombstoned rows. Mutations report success even when no
//! live row matched; callers detect that through a follow-up read.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use super::models::{
    Book, BooksResponse, CreateBook, GetListRequest, UpdateBook, UpdateBookPageNumber,
};

pub use memory::InMemoryBookStorage;
pub use postgres::PgBookStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    /// No live row carries this id.
    #[error("book '{id}' not found")]
    NotFound { id: String },

    /// A stored value cannot be represented in the public shape.
    #[error("column '{column}' holds an unusable value: {reason}")]
    Corrupt { column: &'static str, reason: String },

    /// An incoming value does not fit the column that stores it.
    #[error("{column} {value} exceeds the storable maximum {max}")]
    OutOfRange {
        column: &'static str,
        value: u64,
        max: i64,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence operations for the book entity.
#[async_trait]
pub trait BookStorage: Send + Sync {
    /// Insert a new row and return its freshly generated id.
    async fn create(&self, book: &CreateBook) -> StorageResult<String>;

    async fn get_by_id(&self, id: &str) -> StorageResult<Book>;

    /// One page of live books in natural store order plus the total match
    /// count. The count and the page are read independently.
    async fn get_list(&self, request: &GetListRequest) -> StorageResult<BooksResponse>;

    /// Overwrite `name` and `author_name`, refreshing `updated_at`.
    async fn update(&self, book: &UpdateBook) -> StorageResult<String>;

    /// Overwrite `page_number`, refreshing `updated_at`.
    async fn update_page_number(&self, request: &UpdateBookPageNumber) -> StorageResult<String>;

    /// Tombstone the row. Missing or already tombstoned ids are not an error.
    async fn delete(&self, id: &str) -> StorageResult<()>;
}

/// `page_number` as it is stored: a signed 64-bit column.
pub(crate) fn stored_page_number(value: u64) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| StorageError::OutOfRange {
        column: "page_number",
        value,
        max: i64::MAX,
    })
}

/// Escape LIKE metacharacters so `term` matches as a literal substring.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
