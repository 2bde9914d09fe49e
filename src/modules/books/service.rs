use std::sync::Arc;

use super::models::{
    Book, BooksResponse, CreateBook, GetListRequest, UpdateBook, UpdateBookPageNumber,
};
use super::storage::{BookStorage, StorageResult};

/// Orchestrates store calls; every mutation reads the row back before returning.
#[derive(Clone)]
pub struct BookService {
    storage: Arc<dyn BookStorage>,
}

impl BookService {
    pub fn new(storage: Arc<dyn BookStorage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, book: CreateBook) -> StorageResult<Book> {
        tracing::info!(name = %book.name, author_name = %book.author_name, "creating book");

        let id = self.storage.create(&book).await.inspect_err(|e| {
            tracing::error!(error = %e, "failed to create book");
        })?;

        self.read_back(&id).await
    }

    pub async fn get(&self, id: &str) -> StorageResult<Book> {
        self.storage.get_by_id(id).await.inspect_err(|e| {
            tracing::error!(error = %e, book_id = %id, "failed to get book");
        })
    }

    pub async fn get_list(&self, request: GetListRequest) -> StorageResult<BooksResponse> {
        tracing::info!(
            page = request.page,
            limit = request.limit,
            search = %request.search,
            "listing books"
        );

        self.storage.get_list(&request).await.inspect_err(|e| {
            tracing::error!(error = %e, "failed to list books");
        })
    }

    pub async fn update(&self, book: UpdateBook) -> StorageResult<Book> {
        tracing::info!(book_id = %book.id, "updating book");

        let id = self.storage.update(&book).await.inspect_err(|e| {
            tracing::error!(error = %e, book_id = %book.id, "failed to update book");
        })?;

        self.read_back(&id).await
    }

    pub async fn update_page_number(&self, request: UpdateBookPageNumber) -> StorageResult<Book> {
        tracing::info!(
            book_id = %request.id,
            page_number = request.page_number,
            "updating page number"
        );

        let id = self
            .storage
            .update_page_number(&request)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, book_id = %request.id, "failed to update page number");
            })?;

        self.read_back(&id).await
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        tracing::info!(book_id = %id, "deleting book");

        self.storage.delete(id).await.inspect_err(|e| {
            tracing::error!(error = %e, book_id = %id, "failed to delete book");
        })
    }

    /// Follow-up read after a write. A failure here hides whether the write landed.
    async fn read_back(&self, id: &str) -> StorageResult<Book> {
        self.storage.get_by_id(id).await.inspect_err(|e| {
            tracing::error!(error = %e, book_id = %id, "failed to read book back after write");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::storage::{InMemoryBookStorage, StorageError};
    use async_trait::async_trait;

    fn service() -> BookService {
        BookService::new(Arc::new(InMemoryBookStorage::new()))
    }

    fn dune() -> CreateBook {
        CreateBook {
            name: "Dune".to_string(),
            author_name: "Herbert".to_string(),
            page_number: 412,
        }
    }

    #[tokio::test]
    async fn create_returns_the_stored_book() {
        let books = service();
        let book = books.create(dune()).await.unwrap();

        assert_eq!(book.name, "Dune");
        assert_eq!(book.author_name, "Herbert");
        assert_eq!(book.page_number, 412);
        assert!(!book.id.is_empty());
        assert_eq!(books.get(&book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn update_page_number_keeps_text_fields() {
        let books = service();
        let created = books.create(dune()).await.unwrap();

        let patched = books
            .update_page_number(UpdateBookPageNumber {
                id: created.id.clone(),
                page_number: 500,
            })
            .await
            .unwrap();

        assert_eq!(patched.page_number, 500);
        assert_eq!(patched.name, created.name);
        assert_eq!(patched.author_name, created.author_name);
        assert!(patched.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_of_missing_book_surfaces_not_found() {
        let books = service();
        let err = books
            .update(UpdateBook {
                id: "missing".to_string(),
                name: "x".to_string(),
                author_name: "y".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_then_get_fails() {
        let books = service();
        let created = books.create(dune()).await.unwrap();

        books.delete(&created.id).await.unwrap();
        assert!(books.get(&created.id).await.is_err());
        books.delete("never-existed").await.unwrap();
    }

    /// Accepts writes but can never read anything back.
    struct WriteOnlyStorage;

    #[async_trait]
    impl BookStorage for WriteOnlyStorage {
        async fn create(&self, _book: &CreateBook) -> StorageResult<String> {
            Ok("written".to_string())
        }

        async fn get_by_id(&self, id: &str) -> StorageResult<Book> {
            Err(StorageError::NotFound { id: id.to_string() })
        }

        async fn get_list(&self, _request: &GetListRequest) -> StorageResult<BooksResponse> {
            Ok(BooksResponse {
                books: vec![],
                count: 0,
            })
        }

        async fn update(&self, book: &UpdateBook) -> StorageResult<String> {
            Ok(book.id.clone())
        }

        async fn update_page_number(
            &self,
            request: &UpdateBookPageNumber,
        ) -> StorageResult<String> {
            Ok(request.id.clone())
        }

        async fn delete(&self, _id: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_read_back_fails_the_create() {
        let books = BookService::new(Arc::new(WriteOnlyStorage));
        let err = books.create(dune()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { ref id } if id == "written"));
    }
}
