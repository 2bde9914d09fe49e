use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Public shape of a catalogued book. The tombstone column never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-generated identifier, immutable after creation
    pub id: String,
    pub name: String,
    pub author_name: String,
    pub page_number: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Refreshed on every mutating write
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Request body for `POST /book`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub name: String,
    pub author_name: String,
    pub page_number: u64,
}

/// Request body for `PUT /book/{id}`; the id always comes from the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBook {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub author_name: String,
}

/// Request body for `PATCH /book/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBookPageNumber {
    #[serde(skip)]
    pub id: String,
    pub page_number: u64,
}

/// Paging and search parameters for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetListRequest {
    /// 1-based page index
    pub page: u32,
    pub limit: u32,
    /// Case-insensitive substring of `name`; empty means no filter
    pub search: String,
}

impl GetListRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Rows skipped before the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for GetListRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
            search: String::new(),
        }
    }
}

/// One page of books plus the count of every matching book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooksResponse {
    pub books: Vec<Book>,
    pub count: u64,
}
