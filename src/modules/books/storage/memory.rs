use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{stored_page_number, BookStorage, StorageError, StorageResult};
use crate::modules::books::models::{
    Book, BooksResponse, CreateBook, GetListRequest, UpdateBook, UpdateBookPageNumber,
};

#[derive(Debug, Clone)]
struct StoredBook {
    /// Parsed form of `book.id`; lookups compare this, not the text
    key: Uuid,
    book: Book,
    /// Unix seconds of deletion, `0` while live
    deleted_at: i64,
}

impl StoredBook {
    fn is_live(&self) -> bool {
        self.deleted_at == 0
    }

    fn is_live_with(&self, key: Uuid) -> bool {
        self.is_live() && self.key == key
    }
}

/// Process-local book store with the same visibility rules as the
/// PostgreSQL table. Natural order is insertion order.
#[derive(Default)]
pub struct InMemoryBookStorage {
    rows: RwLock<Vec<StoredBook>>,
}

impl InMemoryBookStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<StoredBook>> {
        self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<StoredBook>> {
        self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `change` to the live row with this id, if any.
    fn touch_live(&self, id: &str, change: impl FnOnce(&mut Book)) {
        let Ok(key) = Uuid::parse_str(id) else {
            return;
        };
        let mut rows = self.write();
        if let Some(row) = rows.iter_mut().find(|row| row.is_live_with(key)) {
            change(&mut row.book);
            row.book.updated_at = OffsetDateTime::now_utc().max(row.book.updated_at);
        }
    }
}

fn matches_search(book: &Book, needle: &str) -> bool {
    needle.is_empty() || book.name.to_lowercase().contains(needle)
}

#[async_trait]
impl BookStorage for InMemoryBookStorage {
    async fn create(&self, book: &CreateBook) -> StorageResult<String> {
        stored_page_number(book.page_number)?;
        let now = OffsetDateTime::now_utc();
        let key = Uuid::new_v4();
        let id = key.to_string();

        self.write().push(StoredBook {
            key,
            book: Book {
                id: id.clone(),
                name: book.name.clone(),
                author_name: book.author_name.clone(),
                page_number: book.page_number,
                created_at: now,
                updated_at: now,
            },
            deleted_at: 0,
        });

        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Book> {
        let not_found = || StorageError::NotFound { id: id.to_string() };
        let key = Uuid::parse_str(id).map_err(|_| not_found())?;
        self.read()
            .iter()
            .find(|row| row.is_live_with(key))
            .map(|row| row.book.clone())
            .ok_or_else(not_found)
    }

    async fn get_list(&self, request: &GetListRequest) -> StorageResult<BooksResponse> {
        let needle = request.search.to_lowercase();

        // Two separate reads, mirroring the count-then-page round trips.
        let count = self
            .read()
            .iter()
            .filter(|row| row.is_live() && matches_search(&row.book, &needle))
            .count() as u64;

        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let books = self
            .read()
            .iter()
            .filter(|row| row.is_live() && matches_search(&row.book, &needle))
            .skip(offset)
            .take(request.limit as usize)
            .map(|row| row.book.clone())
            .collect();

        Ok(BooksResponse { books, count })
    }

    async fn update(&self, book: &UpdateBook) -> StorageResult<String> {
        self.touch_live(&book.id, |stored| {
            stored.name = book.name.clone();
            stored.author_name = book.author_name.clone();
        });
        Ok(book.id.clone())
    }

    async fn update_page_number(&self, request: &UpdateBookPageNumber) -> StorageResult<String> {
        stored_page_number(request.page_number)?;
        self.touch_live(&request.id, |stored| {
            stored.page_number = request.page_number;
        });
        Ok(request.id.clone())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let Ok(key) = Uuid::parse_str(id) else {
            return Ok(());
        };
        let now = OffsetDateTime::now_utc().unix_timestamp().max(1);
        for row in self.write().iter_mut().filter(|row| row.key == key) {
            row.deleted_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(name: &str, pages: u64) -> CreateBook {
        CreateBook {
            name: name.to_string(),
            author_name: "Author".to_string(),
            page_number: pages,
        }
    }

    fn list(page: u32, limit: u32, search: &str) -> GetListRequest {
        GetListRequest {
            page,
            limit,
            search: search.to_string(),
        }
    }

    #[tokio::test]
    async fn created_ids_are_unique() {
        let store = InMemoryBookStorage::new();
        let a = store.create(&new_book("A", 1)).await.unwrap();
        let b = store.create(&new_book("A", 1)).await.unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    async fn tombstoned_rows_disappear_from_every_read() {
        let store = InMemoryBookStorage::new();
        let keep = store.create(&new_book("Keep", 10)).await.unwrap();
        let gone = store.create(&new_book("Gone", 20)).await.unwrap();

        store.delete(&gone).await.unwrap();

        assert!(matches!(
            store.get_by_id(&gone).await,
            Err(StorageError::NotFound { .. })
        ));
        let page = store.get_list(&list(1, 10, "")).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.books[0].id, keep);
    }

    #[tokio::test]
    async fn tombstoned_rows_ignore_updates() {
        let store = InMemoryBookStorage::new();
        let id = store.create(&new_book("Gone", 20)).await.unwrap();
        store.delete(&id).await.unwrap();

        let returned = store
            .update_page_number(&UpdateBookPageNumber {
                id: id.clone(),
                page_number: 99,
            })
            .await
            .unwrap();
        assert_eq!(returned, id);

        let rows = store.read();
        assert_eq!(rows[0].book.page_number, 20);
        assert!(!rows[0].is_live());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_silent() {
        let store = InMemoryBookStorage::new();
        store.delete("no-such-book").await.unwrap();
    }

    #[tokio::test]
    async fn ids_match_in_any_uuid_spelling() {
        let store = InMemoryBookStorage::new();
        let id = store.create(&new_book("Dune", 412)).await.unwrap();
        let shouted = id.to_uppercase();
        let braced = format!("{{{id}}}");

        assert_eq!(store.get_by_id(&shouted).await.unwrap().id, id);
        assert_eq!(store.get_by_id(&braced).await.unwrap().id, id);

        store
            .update_page_number(&UpdateBookPageNumber {
                id: shouted.clone(),
                page_number: 500,
            })
            .await
            .unwrap();
        assert_eq!(store.get_by_id(&id).await.unwrap().page_number, 500);

        store.delete(&shouted).await.unwrap();
        assert!(matches!(
            store.get_by_id(&id).await,
            Err(StorageError::NotFound { .. })
        ));
        assert_eq!(store.get_list(&list(1, 10, "")).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn oversized_page_numbers_are_refused() {
        let store = InMemoryBookStorage::new();
        assert!(matches!(
            store.create(&new_book("Endless", u64::MAX)).await,
            Err(StorageError::OutOfRange { .. })
        ));

        let id = store.create(&new_book("Long", 5_000_000_000)).await.unwrap();
        assert_eq!(store.get_by_id(&id).await.unwrap().page_number, 5_000_000_000);
    }

    #[tokio::test]
    async fn listing_pages_in_insertion_order() {
        let store = InMemoryBookStorage::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(store.create(&new_book(&format!("Book {i}"), i)).await.unwrap());
        }

        let second = store.get_list(&list(2, 2, "")).await.unwrap();
        assert_eq!(second.count, 5);
        let got: Vec<_> = second.books.iter().map(|b| b.id.clone()).collect();
        assert_eq!(got, ids[2..4].to_vec());

        let beyond = store.get_list(&list(4, 2, "")).await.unwrap();
        assert!(beyond.books.is_empty());
        assert_eq!(beyond.count, 5);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = InMemoryBookStorage::new();
        store.create(&new_book("Dune", 412)).await.unwrap();
        store.create(&new_book("Dune Messiah", 256)).await.unwrap();
        store.create(&new_book("Neuromancer", 271)).await.unwrap();

        let hits = store.get_list(&list(1, 1, "DUNE")).await.unwrap();
        assert_eq!(hits.count, 2);
        assert_eq!(hits.books.len(), 1);

        let literal = store.get_list(&list(1, 10, "%")).await.unwrap();
        assert_eq!(literal.count, 0);
    }

    #[tokio::test]
    async fn update_touches_only_text_fields() {
        let store = InMemoryBookStorage::new();
        let id = store.create(&new_book("Old", 300)).await.unwrap();
        let before = store.get_by_id(&id).await.unwrap();

        store
            .update(&UpdateBook {
                id: id.clone(),
                name: "New".to_string(),
                author_name: "Other".to_string(),
            })
            .await
            .unwrap();

        let after = store.get_by_id(&id).await.unwrap();
        assert_eq!(after.name, "New");
        assert_eq!(after.author_name, "Other");
        assert_eq!(after.page_number, 300);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }
}
