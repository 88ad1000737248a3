//! Core domain types for Audioshelf: catalog books, the catalog store and
//! the shared error taxonomy.

pub mod error;
pub mod types;

pub use error::{AppError, ErrorSeverity, Result};
pub use types::{format_clock, BookId, Catalog, CatalogBook, Duration, Validator};
