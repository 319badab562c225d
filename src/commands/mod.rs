//! CLI command implementations.

pub mod crawl;
pub mod pages;
pub mod product;

pub use crawl::CrawlCommand;
pub use pages::PagesCommand;
pub use product::ProductCommand;
