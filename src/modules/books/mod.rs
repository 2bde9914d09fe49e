pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;
pub mod storage;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::{json, Value};

use service::BookService;
use storage::BookStorage;

/// Book catalogue: CRUD over a single soft-deleted `books` table
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(storage: Arc<dyn BookStorage>) -> Self {
        Self {
            service: BookService::new(storage),
        }
    }

    /// Schema owned by this module, in application order
    pub fn migration_set() -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id          UUID        PRIMARY KEY,
                    name        VARCHAR     NOT NULL,
                    author_name VARCHAR     NOT NULL,
                    page_number BIGINT      NOT NULL DEFAULT 0 CHECK (page_number >= 0),
                    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                    deleted_at  BIGINT      NOT NULL DEFAULT 0
                );
                "#,
        }]
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn nested(&self) -> bool {
        false
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        Self::migration_set()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Envelope schema whose `data` is `payload`.
fn enveloped(payload: Value) -> Value {
    json!({
        "type": "object",
        "properties": {
            "status_code": { "type": "integer" },
            "description": { "type": "string" },
            "data": payload
        },
        "required": ["status_code", "description", "data"]
    })
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn error_responses() -> Value {
    let error = json_content(json!({ "$ref": "#/components/schemas/ErrorResponse" }));
    json!({
        "400": { "description": "Bad Request", "content": error.clone() },
        "404": { "description": "Not Found", "content": error.clone() },
        "500": { "description": "Internal Server Error", "content": error }
    })
}

fn with_errors(success_code: &str, description: &str, payload: Value) -> Value {
    let mut responses = error_responses();
    responses[success_code] = json!({
        "description": description,
        "content": json_content(enveloped(payload))
    });
    responses
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    })
}

fn request_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": json_content(json!({ "$ref": format!("#/components/schemas/{schema}") }))
    })
}

fn openapi_fragment() -> Value {
    let book = json!({ "$ref": "#/components/schemas/Book" });

    json!({
        "paths": {
            "/book": {
                "post": {
                    "summary": "Create a new book",
                    "tags": ["Books"],
                    "requestBody": request_body("CreateBook"),
                    "responses": with_errors("201", "Created", book.clone())
                }
            },
            "/book/{id}": {
                "get": {
                    "summary": "Get book by id",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": with_errors("200", "OK", book.clone())
                },
                "put": {
                    "summary": "Update book name and author",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": request_body("UpdateBook"),
                    "responses": with_errors("200", "OK", book.clone())
                },
                "patch": {
                    "summary": "Update book page number",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": request_body("UpdateBookPageNumber"),
                    "responses": with_errors("200", "OK", book)
                },
                "delete": {
                    "summary": "Delete book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": with_errors("200", "OK", json!({ "type": "object" }))
                }
            },
            "/books": {
                "get": {
                    "summary": "Get book list",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "string" } },
                        { "name": "limit", "in": "query", "schema": { "type": "string" } },
                        { "name": "search", "in": "query", "schema": { "type": "string" } }
                    ],
                    "responses": with_errors(
                        "200",
                        "OK",
                        json!({ "$ref": "#/components/schemas/BooksResponse" })
                    )
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "name": { "type": "string" },
                        "author_name": { "type": "string" },
                        "page_number": { "type": "integer", "format": "int64", "minimum": 0 },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    },
                    "required": [
                        "id", "name", "author_name", "page_number", "created_at", "updated_at"
                    ]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "author_name": { "type": "string" },
                        "page_number": { "type": "integer", "format": "int64", "minimum": 0 }
                    },
                    "required": ["name", "author_name", "page_number"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "author_name": { "type": "string" }
                    },
                    "required": ["name", "author_name"]
                },
                "UpdateBookPageNumber": {
                    "type": "object",
                    "properties": {
                        "page_number": { "type": "integer", "format": "int64", "minimum": 0 }
                    },
                    "required": ["page_number"]
                },
                "BooksResponse": {
                    "type": "object",
                    "properties": {
                        "books": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        },
                        "count": { "type": "integer" }
                    },
                    "required": ["books", "count"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(storage: Arc<dyn BookStorage>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(storage))
}
