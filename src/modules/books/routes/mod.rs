use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use super::service::BookService;

/// Route table for the catalogue, served from the server root.
pub fn router(books: BookService) -> Router {
    Router::new()
        .route("/book", post(handlers::create_book))
        .route(
            "/book/{id}",
            get(handlers::get_book)
                .put(handlers::update_book)
                .patch(handlers::update_page_number)
                .delete(handlers::delete_book),
        )
        .route("/books", get(handlers::list_books))
        .with_state(books)
}
