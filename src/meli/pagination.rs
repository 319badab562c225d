//! Pagination discovery for listing pages.
//!
//! MercadoLibre serves at most 48 items per listing page and stops answering
//! offsets past 1969, so a category larger than 2016 products cannot be walked
//! page by page. When a listing is that large and offers price-range filters,
//! each price bucket is resolved as its own (smaller) listing instead.

use crate::meli::client::MarketplaceFetch;
use crate::meli::models::ListingPage;
use crate::meli::parser::Parser;
use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

/// Items shown per listing page.
pub const PAGE_SIZE: u32 = 48;

/// Listings larger than this are split by price range when possible.
pub const RECURSION_THRESHOLD: u32 = 2016;

/// Highest `_Desde_` offset the site will serve.
pub const MAX_OFFSET: u32 = 1969;

/// Host serving category and search listings.
pub const LISTING_BASE_URL: &str = "https://listado.mercadolibre.com.ar";

/// URLs containing this are single item pages, not listings.
const ITEM_URL_MARKER: &str = "articulo";

const COUNT_PLACEHOLDER: &str = "COUNT";

static PRICE_RANGE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(_PriceRange_\d+-\d+)").unwrap());

static OFFSET_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_Desde_\d+").unwrap());

/// Resolves a listing URL into the URLs of all of its pages.
pub struct Paginator<'a, C> {
    client: &'a C,
    parser: &'a Parser,
    max_depth: Option<usize>,
}

impl<'a, C: MarketplaceFetch> Paginator<'a, C> {
    /// Creates a paginator fetching through `client`.
    pub fn new(client: &'a C, parser: &'a Parser) -> Self {
        Self { client, parser, max_depth: None }
    }

    /// Limits how many levels of price-range sub-listings may be followed.
    ///
    /// Unbounded by default; the visited set already keeps cyclic filter
    /// links from looping.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns the deduplicated page URLs of `url`, in discovery order.
    ///
    /// Item URLs are returned unchanged without a request. Listings that fail
    /// to load are logged and contribute nothing.
    pub async fn resolve(&self, url: &str) -> Vec<String> {
        let mut pages = UrlSet::default();
        let mut visited = HashSet::new();
        let mut pending = vec![(url.to_string(), 0usize)];

        while let Some((listing_url, depth)) = pending.pop() {
            if is_item_url(&listing_url) {
                pages.insert(listing_url);
                continue;
            }

            if !visited.insert(listing_url.clone()) {
                debug!("Already resolved {}, skipping", listing_url);
                continue;
            }

            let html = match self.client.listing(&listing_url).await {
                Ok(html) => html,
                Err(e) => {
                    error!("Error fetching listing {}: {:#}", listing_url, e);
                    continue;
                }
            };

            let page = self.parser.parse_listing(&html);

            if page.total_products > RECURSION_THRESHOLD && page.has_price_filters() {
                if self.max_depth.is_none_or(|max| depth < max) {
                    debug!(
                        "{} has {} products, splitting into {} price ranges",
                        listing_url,
                        page.total_products,
                        page.price_filter_urls.len()
                    );

                    // Reversed so sub-listings are resolved in page order
                    for sub in page.price_filter_urls.iter().rev() {
                        pending.push((absolutize(&listing_url, sub), depth + 1));
                    }
                    continue;
                }

                warn!(
                    "Depth limit {} reached at {}, only the first {} products are reachable",
                    depth, listing_url, RECURSION_THRESHOLD
                );
            }

            for page_url in page_urls(&listing_url, &page) {
                pages.insert(page_url);
            }
        }

        info!("Resolved {} listing pages for {}", pages.len(), url);
        pages.into_vec()
    }
}

/// Turns a CLI argument into a listing URL.
///
/// Full URLs are kept; anything else is treated as a search term, which the
/// site expects as a dash-separated path segment.
pub fn listing_url(query: &str) -> String {
    let query = query.trim();
    if query.starts_with("http://") || query.starts_with("https://") {
        return query.to_string();
    }

    let slug = query.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase();
    format!("{}/{}", LISTING_BASE_URL, urlencoding::encode(&slug))
}

/// Returns true if `url` points at a single item rather than a listing.
pub fn is_item_url(url: &str) -> bool {
    url.contains(ITEM_URL_MARKER)
}

/// Number of pages needed for `total_products` items.
pub fn page_count(total_products: u32) -> u32 {
    total_products.div_ceil(PAGE_SIZE)
}

/// `_Desde_` offsets of the first `total_pages` pages, capped at [`MAX_OFFSET`].
pub fn offsets(total_pages: u32) -> impl Iterator<Item = u32> {
    (0..total_pages).map(|i| 1 + i * PAGE_SIZE).take_while(|&count| count <= MAX_OFFSET)
}

/// Page URLs of a listing that is paginated directly.
pub fn page_urls(listing_url: &str, page: &ListingPage) -> Vec<String> {
    let template = page
        .next_page_href()
        .and_then(|href| next_page_template(&absolutize(listing_url, href)))
        .unwrap_or_else(|| offset_template(listing_url));

    debug!("Paginating {} products with template {}", page.total_products, template);

    offsets(page_count(page.total_products))
        .map(|count| template.replace(COUNT_PLACEHOLDER, &count.to_string()))
        .collect()
}

/// Turns a discovered next-page link into a template by replacing its offset.
fn next_page_template(href: &str) -> Option<String> {
    if !OFFSET_SEGMENT.is_match(href) {
        return None;
    }

    let template = format!("_Desde_{}", COUNT_PLACEHOLDER);
    Some(OFFSET_SEGMENT.replace(href, template.as_str()).into_owned())
}

/// Builds an offset template from the listing URL itself.
///
/// Price-range listings take the offset right before the range segment;
/// plain listings get it appended along with the no-index marker.
fn offset_template(listing_url: &str) -> String {
    let template = PRICE_RANGE_SEGMENT
        .replace(listing_url, format!("_Desde_{}${{1}}", COUNT_PLACEHOLDER).as_str())
        .into_owned();

    if template.contains(COUNT_PLACEHOLDER) {
        template
    } else {
        format!("{}_Desde_{}_NoIndex_True", listing_url, COUNT_PLACEHOLDER)
    }
}

/// Resolves an href found on `base` into an absolute URL.
///
/// Handles protocol-relative (`//host/..`), root-relative (`/path`) and
/// document-relative (`path`) links; absolute links are kept.
fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let Some(scheme_end) = base.find("://") else {
        return href.to_string();
    };
    let origin_end = base[scheme_end + 3..]
        .find('/')
        .map(|i| scheme_end + 3 + i)
        .unwrap_or(base.len());

    if let Some(rest) = href.strip_prefix("//") {
        format!("{}//{}", &base[..scheme_end + 1], rest)
    } else if href.starts_with('/') {
        format!("{}{}", &base[..origin_end], href)
    } else {
        let path = base[origin_end..].split(['?', '#']).next().unwrap_or_default();
        let dir = path.rfind('/').map(|i| &path[..=i]).unwrap_or("/");
        format!("{}{}{}", &base[..origin_end], dir, href)
    }
}

/// Insertion-ordered set of URLs.
#[derive(Default)]
struct UrlSet {
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl UrlSet {
    fn insert(&mut self, url: String) {
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }

    fn len(&self) -> usize {
        self.urls.len()
    }

    fn into_vec(self) -> Vec<String> {
        self.urls
    }
}
