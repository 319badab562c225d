//! MercadoLibre-specific modules for HTTP client, parsing, pagination, and data models.

pub mod client;
pub mod models;
pub mod pagination;
pub mod parser;
pub mod selectors;

pub use client::{MarketplaceFetch, MeliClient};
pub use models::{Availability, ListingPage, Product};
pub use pagination::Paginator;
pub use parser::Parser;
pub use selectors::Selectors;
