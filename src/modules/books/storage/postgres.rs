use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{like_pattern, stored_page_number, BookStorage, StorageError, StorageResult};
use crate::modules::books::models::{
    Book, BooksResponse, CreateBook, GetListRequest, UpdateBook, UpdateBookPageNumber,
};

const SELECT_COLUMNS: &str =
    "SELECT id, name, author_name, page_number, created_at, updated_at FROM books WHERE deleted_at = 0";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    name: String,
    author_name: String,
    page_number: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<BookRow> for Book {
    type Error = StorageError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let page_number = u64::try_from(row.page_number).map_err(|e| StorageError::Corrupt {
            column: "page_number",
            reason: format!("{} ({})", row.page_number, e),
        })?;

        Ok(Book {
            id: row.id.to_string(),
            name: row.name,
            author_name: row.author_name,
            page_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed book store over the `books` table.
#[derive(Clone)]
pub struct PgBookStorage {
    pool: PgPool,
}

impl PgBookStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the shared filter; the search term is always a bound parameter.
fn push_search(builder: &mut QueryBuilder<'_, Postgres>, search: &str) {
    if !search.is_empty() {
        builder.push(" AND name ILIKE ");
        builder.push_bind(like_pattern(search));
    }
}

#[async_trait]
impl BookStorage for PgBookStorage {
    async fn create(&self, book: &CreateBook) -> StorageResult<String> {
        let id = Uuid::new_v4();
        let page_number = stored_page_number(book.page_number)?;

        sqlx::query("INSERT INTO books (id, name, author_name, page_number) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(&book.name)
            .bind(&book.author_name)
            .bind(page_number)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to insert book");
                StorageError::from(e)
            })?;

        Ok(id.to_string())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Book> {
        // A malformed id cannot name any stored row.
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Err(StorageError::NotFound { id: id.to_string() });
        };

        let row = sqlx::query_as::<_, BookRow>(&format!("{SELECT_COLUMNS} AND id = $1"))
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, book_id = %id, "failed to select book by id");
                StorageError::from(e)
            })?;

        match row {
            Some(row) => row.try_into(),
            None => Err(StorageError::NotFound { id: id.to_string() }),
        }
    }

    async fn get_list(&self, request: &GetListRequest) -> StorageResult<BooksResponse> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT count(1) FROM books WHERE deleted_at = 0");
        push_search(&mut count_query, &request.search);

        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to count books");
                StorageError::from(e)
            })?;

        // Separate round trip: the page may disagree with `count` under concurrent writes.
        let mut page_query = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_search(&mut page_query, &request.search);
        page_query.push(" LIMIT ");
        page_query.push_bind(i64::from(request.limit));
        page_query.push(" OFFSET ");
        page_query.push_bind(i64::try_from(request.offset()).unwrap_or(i64::MAX));

        let rows: Vec<BookRow> = page_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to select book page");
                StorageError::from(e)
            })?;

        let books = rows
            .into_iter()
            .map(Book::try_from)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(BooksResponse {
            books,
            count: u64::try_from(count).unwrap_or_default(),
        })
    }

    async fn update(&self, book: &UpdateBook) -> StorageResult<String> {
        let Ok(uuid) = Uuid::parse_str(&book.id) else {
            return Ok(book.id.clone());
        };

        sqlx::query(
            "UPDATE books SET name = $1, author_name = $2, updated_at = GREATEST(now(), updated_at) \
             WHERE id = $3 AND deleted_at = 0",
        )
        .bind(&book.name)
        .bind(&book.author_name)
        .bind(uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, book_id = %book.id, "failed to update book");
            StorageError::from(e)
        })?;

        Ok(book.id.clone())
    }

    async fn update_page_number(&self, request: &UpdateBookPageNumber) -> StorageResult<String> {
        let page_number = stored_page_number(request.page_number)?;
        let Ok(uuid) = Uuid::parse_str(&request.id) else {
            return Ok(request.id.clone());
        };

        sqlx::query(
            "UPDATE books SET page_number = $1, updated_at = GREATEST(now(), updated_at) \
             WHERE id = $2 AND deleted_at = 0",
        )
        .bind(page_number)
        .bind(uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, book_id = %request.id, "failed to update page number");
            StorageError::from(e)
        })?;

        Ok(request.id.clone())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(());
        };

        sqlx::query(
            "UPDATE books SET deleted_at = extract(epoch FROM current_timestamp)::bigint WHERE id = $1",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, book_id = %id, "failed to delete book");
            StorageError::from(e)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! These run against a live database named by `BOOKSHELF_TEST_DATABASE_URL`:
    //! `cargo test -- --ignored`.

    use super::*;
    use crate::modules::books::BooksModule;

    async fn storage() -> PgBookStorage {
        let url = std::env::var("BOOKSHELF_TEST_DATABASE_URL")
            .expect("BOOKSHELF_TEST_DATABASE_URL must point at a scratch database");
        let pool = PgPool::connect(&url).await.unwrap();
        let migrations: Vec<_> = BooksModule::migration_set()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        bookshelf_db::run_migrations(&pool, &migrations).await.unwrap();
        PgBookStorage::new(pool)
    }

    fn new_book(name: &str) -> CreateBook {
        CreateBook {
            name: name.to_string(),
            author_name: "Test Author".to_string(),
            page_number: 100,
        }
    }

    #[tokio::test]
    #[ignore]
    async fn create_get_delete_cycle() {
        let store = storage().await;

        let id = store.create(&new_book("Postgres Cycle")).await.unwrap();
        let book = store.get_by_id(&id).await.unwrap();
        assert_eq!(book.name, "Postgres Cycle");
        assert_eq!(book.page_number, 100);

        store.delete(&id).await.unwrap();
        assert!(matches!(
            store.get_by_id(&id).await,
            Err(StorageError::NotFound { .. })
        ));
        // Deleting again is not an error
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn search_binds_metacharacters_literally() {
        let store = storage().await;
        let marker = Uuid::new_v4().simple().to_string();

        let literal = store
            .create(&new_book(&format!("{marker} 100% Pure")))
            .await
            .unwrap();
        let decoy = store
            .create(&new_book(&format!("{marker} 1000 Pure")))
            .await
            .unwrap();

        let page = store
            .get_list(&GetListRequest {
                page: 1,
                limit: 10,
                search: format!("{} 100%", marker.to_uppercase()),
            })
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.books[0].id, literal);

        store.delete(&literal).await.unwrap();
        store.delete(&decoy).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn update_refreshes_updated_at() {
        let store = storage().await;
        let id = store.create(&new_book("Before")).await.unwrap();
        let before = store.get_by_id(&id).await.unwrap();

        store
            .update(&UpdateBook {
                id: id.clone(),
                name: "After".to_string(),
                author_name: "Someone".to_string(),
            })
            .await
            .unwrap();
        let after = store.get_by_id(&id).await.unwrap();

        assert_eq!(after.name, "After");
        assert_eq!(after.page_number, before.page_number);
        assert!(after.updated_at >= before.updated_at);
        store.delete(&id).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn page_numbers_beyond_u32_round_trip() {
        let store = storage().await;
        let mut book = new_book("Long Read");
        book.page_number = 5_000_000_000;

        let id = store.create(&book).await.unwrap();
        assert_eq!(store.get_by_id(&id).await.unwrap().page_number, 5_000_000_000);

        book.page_number = u64::MAX;
        assert!(matches!(
            store.create(&book).await,
            Err(StorageError::OutOfRange { .. })
        ));
        store.delete(&id).await.unwrap();
    }
}
