//! CSS selectors for MercadoLibre HTML parsing.
//!
//! Selectors live in a TOML file (`selectors.toml` at the crate root is embedded
//! as the default) so they can be updated without a rebuild when the site
//! changes its markup. Every entry is compiled once at load time.
//!
//! **Update process**: when a field stops parsing, capture an HTML sample,
//! adjust the selector, and add a fixture under `tests/fixtures/`.

use crate::error::ExtractError;
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const EMBEDDED: &str = include_str!("../../selectors.toml");

/// One field entry as written in the selector file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelector {
    /// CSS selector, may be a comma-separated group
    pub selector: String,

    /// Attribute to read instead of the element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

/// Raw selector file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub product_name: FieldSelector,
    pub product_price: FieldSelector,
    pub product_available_inventory: FieldSelector,
    pub product_image_url: FieldSelector,
    pub product_description: FieldSelector,
    pub product_rating: FieldSelector,
    pub product_reviews_count: FieldSelector,
    pub product_category: FieldSelector,
    pub listing_result_script: FieldSelector,
    pub listing_price_filter_heading: FieldSelector,
    pub listing_pagination: FieldSelector,
    pub listing_product_link: FieldSelector,
}

impl SelectorConfig {
    /// Parses the selector file shipped with the crate.
    pub fn embedded() -> Result<Self> {
        toml::from_str(EMBEDDED).context("Failed to parse embedded selectors")
    }

    /// Loads selectors from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading selectors from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read selector file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse selector file: {}", path.display()))
    }
}

/// A compiled selector plus the way its value is read.
#[derive(Debug, Clone)]
pub struct Field {
    selector: Selector,
    attr: Option<String>,
}

impl Field {
    fn compile(name: &str, raw: &FieldSelector) -> Result<Self, ExtractError> {
        let selector = Selector::parse(&raw.selector).map_err(|e| {
            ExtractError::InvalidSelector { field: name.to_string(), reason: e.to_string() }
        })?;

        Ok(Self { selector, attr: raw.attr.clone() })
    }

    /// The compiled CSS selector.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Reads the value of one matched element.
    pub fn read(&self, element: ElementRef) -> Option<String> {
        match &self.attr {
            Some(attr) => element.value().attr(attr).map(|v| v.trim().to_string()),
            None => Some(element.text().collect::<String>().trim().to_string()),
        }
    }

    /// All values matched in the document, in document order.
    pub fn values(&self, document: &Html) -> Vec<String> {
        document.select(&self.selector).filter_map(|e| self.read(e)).collect()
    }

    /// Value of the first match.
    pub fn first(&self, document: &Html) -> Option<String> {
        document.select(&self.selector).find_map(|e| self.read(e))
    }

    /// Returns true if anything in the document matches.
    pub fn exists(&self, document: &Html) -> bool {
        document.select(&self.selector).next().is_some()
    }
}

/// Compiled selector set used by the parser.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub product_name: Field,
    pub product_price: Field,
    pub product_available_inventory: Field,
    pub product_image_url: Field,
    pub product_description: Field,
    pub product_rating: Field,
    pub product_reviews_count: Field,
    pub product_category: Field,
    pub listing_result_script: Field,
    pub listing_price_filter_heading: Field,
    pub listing_pagination: Field,
    pub listing_product_link: Field,
}

impl Selectors {
    /// Compiles every entry of a selector file.
    pub fn compile(config: &SelectorConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            product_name: Field::compile("product_name", &config.product_name)?,
            product_price: Field::compile("product_price", &config.product_price)?,
            product_available_inventory: Field::compile(
                "product_available_inventory",
                &config.product_available_inventory,
            )?,
            product_image_url: Field::compile("product_image_url", &config.product_image_url)?,
            product_description: Field::compile(
                "product_description",
                &config.product_description,
            )?,
            product_rating: Field::compile("product_rating", &config.product_rating)?,
            product_reviews_count: Field::compile(
                "product_reviews_count",
                &config.product_reviews_count,
            )?,
            product_category: Field::compile("product_category", &config.product_category)?,
            listing_result_script: Field::compile(
                "listing_result_script",
                &config.listing_result_script,
            )?,
            listing_price_filter_heading: Field::compile(
                "listing_price_filter_heading",
                &config.listing_price_filter_heading,
            )?,
            listing_pagination: Field::compile("listing_pagination", &config.listing_pagination)?,
            listing_product_link: Field::compile(
                "listing_product_link",
                &config.listing_product_link,
            )?,
        })
    }

    /// Loads and compiles selectors from `path`, or the embedded defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => SelectorConfig::from_file(path)?,
            None => SelectorConfig::embedded()?,
        };

        Ok(Self::compile(&config)?)
    }

    /// The embedded default selectors.
    pub fn embedded() -> Result<Self> {
        Self::load(None)
    }
}
