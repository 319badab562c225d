//! meli-crawler - Pagination discovery and product extraction for MercadoLibre Argentina
//!
//! Resolves every page of a category listing (splitting oversized listings by
//! price range) and reads product detail pages through configurable selectors.

pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod meli;

pub use config::Config;
pub use error::ExtractError;
pub use meli::models::{Availability, ListingPage, Product};
