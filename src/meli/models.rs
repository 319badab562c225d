//! Data models for listing pages and product records.

use serde::{Deserialize, Serialize};

/// Currency every MercadoLibre Argentina price is quoted in.
pub const CURRENCY: &str = "ARS";

/// A product detail page reduced to a flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product URL without fragment or query string
    pub url: String,
    /// Product title
    pub name: String,
    /// Current price
    pub price: f64,
    /// Currency code, always "ARS"
    pub currency: String,
    /// Whether stock is available to buy
    pub availability: Availability,
    /// Main product image
    pub image_url: String,
    /// Long description, empty when the page has none
    pub description: String,
    /// Average review score
    pub rating: Option<f32>,
    /// Number of reviews, 0 when the page shows none
    pub reviews_count: u32,
    /// Breadcrumb trail joined with '|'
    pub category: String,
}

impl Product {
    /// Returns true if the product can be bought.
    pub fn in_stock(&self) -> bool {
        self.availability == Availability::Yes
    }
}

/// Stock availability, serialized as "Yes" / "No".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Yes,
    #[default]
    No,
}

impl From<bool> for Availability {
    fn from(available: bool) -> Self {
        if available {
            Availability::Yes
        } else {
            Availability::No
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Yes => write!(f, "Yes"),
            Availability::No => write!(f, "No"),
        }
    }
}

/// What a single listing page tells us about the result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Total products in the result set (0 when the page doesn't say)
    pub total_products: u32,
    /// Price-range sub-listing URLs, fragments stripped
    pub price_filter_urls: Vec<String>,
    /// Every href found inside the pagination widget, in document order
    pub pagination_hrefs: Vec<String>,
    /// Product detail links shown on this page
    pub product_urls: Vec<String>,
}

impl ListingPage {
    /// Last link of the pagination widget, used as the page URL template.
    pub fn next_page_href(&self) -> Option<&str> {
        self.pagination_hrefs.last().map(String::as_str)
    }

    /// Returns true if the page offers price-range sub-listings.
    pub fn has_price_filters(&self) -> bool {
        !self.price_filter_urls.is_empty()
    }
}
