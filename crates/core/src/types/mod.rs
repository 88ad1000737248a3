//! Domain types for Audioshelf
//!
//! - `book`: catalog book records
//! - `catalog`: the in-memory catalog store and its views
//! - `common`: shared duration type, formatting and validation trait

mod book;
mod catalog;
mod common;

pub use book::{BookId, CatalogBook};
pub use catalog::Catalog;
pub use common::{format_clock, Duration, Validator};
