//! PostgreSQL connectivity for bookshelf: pool construction and the
//! migration runner fed by module-declared migrations.

pub mod migrate;
pub mod pool;

pub use migrate::run_migrations;
pub use pool::{connect, sanitize_connection_url};
