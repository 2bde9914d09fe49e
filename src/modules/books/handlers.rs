//! Axum handlers binding transport input to [`BookService`] calls.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use bookshelf_http::{ApiResponse, AppError};
use serde::Deserialize;
use uuid::Uuid;

use super::models::{
    Book, BooksResponse, CreateBook, GetListRequest, UpdateBook, UpdateBookPageNumber,
};
use super::service::BookService;
use super::storage::StorageError;

type HandlerResult<T> = Result<ApiResponse<T>, AppError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => AppError::not_found(err.to_string()),
            StorageError::OutOfRange { .. } => AppError::bad_request(err.to_string()),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Raw listing parameters; parsed by hand so bad numbers get the envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn into_request(self) -> Result<GetListRequest, AppError> {
        Ok(GetListRequest {
            page: parse_positive("page", self.page, GetListRequest::DEFAULT_PAGE)?,
            limit: parse_positive("limit", self.limit, GetListRequest::DEFAULT_LIMIT)?,
            search: self.search.unwrap_or_default(),
        })
    }
}

fn parse_positive(field: &str, raw: Option<String>, default: u32) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::bad_request(format!(
            "invalid {field} '{raw}': expected a positive integer"
        ))),
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// `POST /book`
pub async fn create_book(
    State(books): State<BookService>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> HandlerResult<Book> {
    let book = books.create(body(payload)?).await?;
    Ok(ApiResponse::created(book))
}

/// `GET /book/{id}`
pub async fn get_book(
    State(books): State<BookService>,
    Path(id): Path<String>,
) -> HandlerResult<Book> {
    Ok(ApiResponse::ok(books.get(&id).await?))
}

/// `GET /books?page=&limit=&search=`
pub async fn list_books(
    State(books): State<BookService>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> HandlerResult<BooksResponse> {
    let Query(params) = params.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let response = books.get_list(params.into_request()?).await?;
    Ok(ApiResponse::ok(response))
}

/// `PUT /book/{id}`
pub async fn update_book(
    State(books): State<BookService>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> HandlerResult<Book> {
    let mut update = body(payload)?;
    update.id = id;
    Ok(ApiResponse::ok(books.update(update).await?))
}

/// `PATCH /book/{id}`; the id must be a well-formed UUID.
pub async fn update_page_number(
    State(books): State<BookService>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookPageNumber>, JsonRejection>,
) -> HandlerResult<Book> {
    let mut request = body(payload)?;
    let id = Uuid::parse_str(&id)
        .map_err(|e| AppError::bad_request(format!("invalid book id '{id}': {e}")))?;
    request.id = id.to_string();
    Ok(ApiResponse::ok(books.update_page_number(request).await?))
}

/// `DELETE /book/{id}`
pub async fn delete_book(
    State(books): State<BookService>,
    Path(id): Path<String>,
) -> HandlerResult<serde_json::Value> {
    books.delete(&id).await?;
    Ok(ApiResponse::ok(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn params(page: Option<&str>, limit: Option<&str>, search: Option<&str>) -> ListParams {
        ListParams {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
            search: search.map(str::to_string),
        }
    }

    #[test]
    fn missing_params_use_defaults() {
        let request = ListParams::default().into_request().unwrap();
        assert_eq!(request, GetListRequest::default());
    }

    #[test]
    fn explicit_params_are_parsed() {
        let request = params(Some("3"), Some("50"), Some("dune"))
            .into_request()
            .unwrap();
        assert_eq!(request.page, 3);
        assert_eq!(request.limit, 50);
        assert_eq!(request.search, "dune");
    }

    #[test]
    fn non_numeric_or_non_positive_values_are_bad_requests() {
        for (page, limit) in [
            (Some("abc"), None),
            (None, Some("ten")),
            (Some("0"), None),
            (None, Some("-5")),
            (Some(""), None),
        ] {
            let err = params(page, limit, None).into_request().unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let missing: AppError = StorageError::NotFound {
            id: "x".to_string(),
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let oversized: AppError = StorageError::OutOfRange {
            column: "page_number",
            value: u64::MAX,
            max: i64::MAX,
        }
        .into();
        assert_eq!(oversized.status(), StatusCode::BAD_REQUEST);

        let broken: AppError = StorageError::Database(sqlx::Error::PoolClosed).into();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
