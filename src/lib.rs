//! Bookshelf application library
//!
//! The `books` catalogue module plus the process bootstrap that wires it
//! to storage, migrations, and the HTTP server.

pub mod app;
pub mod modules;

pub use modules::*;
