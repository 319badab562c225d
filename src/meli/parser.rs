//! HTML parser for MercadoLibre listing and product pages.

use crate::error::ExtractError;
use crate::meli::models::{Availability, ListingPage, Product, CURRENCY};
use crate::meli::selectors::Selectors;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

/// Marker of the analytics script that carries the result count.
const RESULT_COUNT_MARKER: &str = "dimension22";

/// Heading text of the price-range filter group.
const PRICE_FILTER_LABEL: &str = "Precio";

/// Breadcrumb entry that links back to the listing rather than a category.
const BREADCRUMB_BACK_LINK: &str = "Volver al listado";

static RESULT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"dimension22":"(\d+)""#).unwrap());

static FILTER_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Parser for MercadoLibre HTML pages.
pub struct Parser {
    selectors: Selectors,
}

impl Parser {
    /// Creates a parser using the given compiled selectors.
    pub fn new(selectors: Selectors) -> Self {
        Self { selectors }
    }

    /// Reads pagination facts and product links from a listing page.
    pub fn parse_listing(&self, html: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let page = ListingPage {
            total_products: self.parse_total_products(&document),
            price_filter_urls: self.parse_price_filters(&document),
            pagination_hrefs: self.selectors.listing_pagination.values(&document),
            product_urls: self.parse_product_links(&document),
        };

        debug!(
            "Listing reports {} products ({} price filters, {} pagination links, {} items)",
            page.total_products,
            page.price_filter_urls.len(),
            page.pagination_hrefs.len(),
            page.product_urls.len()
        );

        page
    }

    /// Parses a product detail page into a record.
    ///
    /// Name, price and image are required; everything else falls back to an
    /// empty value when the page doesn't show it.
    pub fn parse_product_page(&self, html: &str, url: &str) -> Result<Product, ExtractError> {
        let document = Html::parse_document(html);
        let selectors = &self.selectors;

        let name = required(selectors.product_name.first(&document), "name", url)?;

        let price_text = required(selectors.product_price.first(&document), "price", url)?;
        let price = parse_price_value(&price_text)
            .ok_or(ExtractError::InvalidNumber { field: "price", value: price_text })?;

        let availability =
            Availability::from(selectors.product_available_inventory.exists(&document));

        let image_url = required(selectors.product_image_url.first(&document), "image_url", url)?;

        let description = selectors.product_description.first(&document).unwrap_or_default();

        let rating = selectors.product_rating.first(&document).and_then(|text| {
            let rating = parse_rating(&text);
            if rating.is_none() {
                warn!("Ignoring unparseable rating '{}' on {}", text, url);
            }
            rating
        });

        let reviews_count = selectors
            .product_reviews_count
            .first(&document)
            .map(|text| parse_review_count(&text))
            .unwrap_or(0);

        let category = join_breadcrumbs(&selectors.product_category.values(&document));

        trace!("Parsed product: {} - {}", name, price);

        Ok(Product {
            url: clean_url(url).to_string(),
            name,
            price,
            currency: CURRENCY.to_string(),
            availability,
            image_url,
            description,
            rating,
            reviews_count,
            category,
        })
    }

    /// Extracts the result count from the analytics script, 0 when absent.
    fn parse_total_products(&self, document: &Html) -> u32 {
        let Some(script) = document
            .select(self.selectors.listing_result_script.selector())
            .map(|e| e.text().collect::<String>())
            .find(|text| text.contains(RESULT_COUNT_MARKER))
        else {
            debug!("No result count script on page");
            return 0;
        };

        RESULT_COUNT
            .captures(&script)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    }

    /// Links of the list that follows the "Precio" filter heading.
    fn parse_price_filters(&self, document: &Html) -> Vec<String> {
        let mut urls = Vec::new();

        let headings = document
            .select(self.selectors.listing_price_filter_heading.selector())
            .filter(|h| h.text().collect::<String>().contains(PRICE_FILTER_LABEL));

        for heading in headings {
            let lists = heading
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "ul");

            for list in lists {
                for link in list.select(&FILTER_LINK) {
                    if let Some(href) = link.value().attr("href") {
                        urls.push(strip_fragment(href).to_string());
                    }
                }
            }
        }

        urls
    }

    /// Product links on a listing page, fragments stripped and deduplicated.
    fn parse_product_links(&self, document: &Html) -> Vec<String> {
        let mut seen = HashSet::new();

        self.selectors
            .listing_product_link
            .values(document)
            .into_iter()
            .map(|href| strip_fragment(&href).to_string())
            .filter(|href| href.starts_with("http"))
            .filter(|href| seen.insert(href.clone()))
            .collect()
    }
}

fn required(value: Option<String>, field: &'static str, url: &str) -> Result<String, ExtractError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractError::MissingField { field, url: url.to_string() })
}

/// Removes the `#fragment` part of a URL.
pub fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Removes both the fragment and the query string of a URL.
pub fn clean_url(url: &str) -> &str {
    let url = strip_fragment(url);
    url.split('?').next().unwrap_or(url)
}

/// Parses an Argentine price like "1.234,56" or "$ 12.999".
pub fn parse_price_value(text: &str) -> Option<f64> {
    let cleaned: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();

    if cleaned.is_empty() {
        return None;
    }

    // 1.234,56 -> 1234.56
    cleaned.replace('.', "").replace(',', ".").parse().ok()
}

/// Parses a review score like "4.7" or "4,7".
pub fn parse_rating(text: &str) -> Option<f32> {
    text.trim().replace(',', ".").parse().ok()
}

/// Keeps only the digits of a review count like "(1.234)".
pub fn parse_review_count(text: &str) -> u32 {
    let cleaned: String = text.chars().filter(|c| c.is_ascii_digit()).collect();

    cleaned.parse().unwrap_or(0)
}

/// Joins breadcrumb entries with '|', dropping empty and back-link entries.
pub fn join_breadcrumbs(entries: &[String]) -> String {
    entries
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty() && *e != BREADCRUMB_BACK_LINK)
        .collect::<Vec<_>>()
        .join("|")
}
