//! Full crawl: resolve listing pages, collect product links, extract each product.

use crate::commands::product::extract_product;
use crate::config::Config;
use crate::format::Formatter;
use crate::meli::pagination::{is_item_url, listing_url};
use crate::meli::{MarketplaceFetch, MeliClient, Paginator, Parser, Product, Selectors};
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Crawls a listing end to end, one request at a time.
pub struct CrawlCommand {
    config: Config,
    max_pages: Option<usize>,
    max_products: Option<usize>,
}

impl CrawlCommand {
    /// Creates a new crawl command.
    pub fn new(config: Config) -> Self {
        Self { config, max_pages: None, max_products: None }
    }

    /// Stops after visiting this many listing pages.
    pub fn max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Stops after extracting this many products.
    pub fn max_products(mut self, max_products: Option<usize>) -> Self {
        self.max_products = max_products;
        self
    }

    /// Runs the crawl and returns formatted products.
    pub async fn execute(&self, listing: &str) -> Result<String> {
        let client =
            MeliClient::new(&self.config).await.context("Failed to create HTTP client")?;

        self.execute_with_client(&client, listing).await
    }

    /// Runs the crawl with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl MarketplaceFetch,
        listing: &str,
    ) -> Result<String> {
        let selectors = Selectors::load(self.config.selectors_path.as_deref())?;
        let parser = Parser::new(selectors);

        let url = listing_url(listing);
        info!("Crawling: {}", url);

        let mut pages = Paginator::new(client, &parser)
            .with_max_depth(self.config.max_depth)
            .resolve(&url)
            .await;

        if let Some(max) = self.max_pages {
            pages.truncate(max);
        }

        let max_products = self.max_products.unwrap_or(usize::MAX);
        let mut seen = HashSet::new();
        let mut products: Vec<Product> = Vec::new();

        'pages: for page_url in &pages {
            let product_urls = if is_item_url(page_url) {
                vec![page_url.clone()]
            } else {
                match client.listing(page_url).await {
                    Ok(html) => parser.parse_listing(&html).product_urls,
                    Err(e) => {
                        error!("Error fetching listing page {}: {:#}", page_url, e);
                        continue;
                    }
                }
            };

            debug!("{} product links on {}", product_urls.len(), page_url);

            for product_url in product_urls {
                if products.len() >= max_products {
                    break 'pages;
                }
                if !seen.insert(product_url.clone()) {
                    continue;
                }

                match extract_product(client, &parser, &product_url).await {
                    Ok(Some(product)) => products.push(product),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping {}: {}", product_url, e),
                }
            }
        }

        info!("Extracted {} products from {} pages", products.len(), pages.len());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_products(&products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock client: listings carry a count and two product links, products
    /// parse unless their URL contains "broken".
    struct MockMeliClient {
        total: u32,
        product_requests: Mutex<Vec<String>>,
    }

    impl MockMeliClient {
        fn new(total: u32) -> Self {
            Self { total, product_requests: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl MarketplaceFetch for MockMeliClient {
        async fn listing(&self, url: &str) -> Result<String> {
            let suffix = url.rsplit('/').next().unwrap_or_default().to_string();
            Ok(format!(
                r#"<html><head><script>x = {{"dimension22":"{}"}};</script></head><body>
                    <a class="poly-component__title" href="https://articulo.mercadolibre.com.ar/MLA-1-{}">A</a>
                    <a class="poly-component__title" href="https://articulo.mercadolibre.com.ar/MLA-broken">B</a>
                </body></html>"#,
                self.total, suffix
            ))
        }

        async fn product(&self, url: &str) -> Result<String> {
            self.product_requests.lock().unwrap().push(url.to_string());
            if url.contains("broken") {
                return Ok("<html></html>".to_string());
            }
            Ok(r#"<html><body>
                <h1 class="ui-pdp-title">Jabón</h1>
                <div class="ui-pdp-price__second-line"><span class="andes-money-amount__fraction">1.000</span></div>
                <img class="ui-pdp-image" src="https://http2.mlstatic.com/D_3.jpg">
            </body></html>"#
                .to_string())
        }
    }

    #[tokio::test]
    async fn test_crawl_collects_products_across_pages() {
        let client = MockMeliClient::new(96);
        let cmd = CrawlCommand::new(Config::default());

        let output = cmd.execute_with_client(&client, "jabon").await.unwrap();
        let products: Vec<Product> = serde_json::from_str(&output).unwrap();

        // Two pages, one good link each; the shared broken link is requested once
        assert_eq!(products.len(), 2);
        assert_eq!(client.product_requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_crawl_respects_max_products() {
        let client = MockMeliClient::new(480);
        let cmd = CrawlCommand::new(Config::default()).max_products(Some(1));

        let output = cmd.execute_with_client(&client, "jabon").await.unwrap();
        let products: Vec<Product> = serde_json::from_str(&output).unwrap();
        assert_eq!(products.len(), 1);
    }

    #[tokio::test]
    async fn test_crawl_respects_max_pages() {
        let client = MockMeliClient::new(480);
        let cmd = CrawlCommand::new(Config::default()).max_pages(Some(1));

        let output = cmd.execute_with_client(&client, "jabon").await.unwrap();
        let products: Vec<Product> = serde_json::from_str(&output).unwrap();
        assert_eq!(products.len(), 1);
    }

    #[tokio::test]
    async fn test_crawl_item_url() {
        let client = MockMeliClient::new(0);
        let cmd = CrawlCommand::new(Config::default());

        let output = cmd
            .execute_with_client(&client, "https://articulo.mercadolibre.com.ar/MLA-77-jabon")
            .await
            .unwrap();
        let products: Vec<Product> = serde_json::from_str(&output).unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].url, "https://articulo.mercadolibre.com.ar/MLA-77-jabon");
    }
}
