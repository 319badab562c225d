//! Product detail extraction command implementation.

use crate::config::Config;
use crate::error::ExtractError;
use crate::format::Formatter;
use crate::meli::{MarketplaceFetch, MeliClient, Parser, Product, Selectors};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

/// Fetches a product page and parses it into a record.
///
/// A page that can't be fetched is logged and yields `Ok(None)`; a page that
/// lacks a required field is an error.
pub async fn extract_product(
    client: &impl MarketplaceFetch,
    parser: &Parser,
    url: &str,
) -> Result<Option<Product>, ExtractError> {
    let html = match client.product(url).await {
        Ok(html) => html,
        Err(e) => {
            error!("Failed fetching product page {}: {:#}", url, e);
            return Ok(None);
        }
    };

    parser.parse_product_page(&html, url).map(Some)
}

/// Extracts one or more product detail pages.
pub struct ProductCommand {
    config: Config,
}

impl ProductCommand {
    /// Creates a new product command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Extracts a single product and returns formatted output.
    pub async fn execute(&self, url: &str) -> Result<String> {
        let client =
            MeliClient::new(&self.config).await.context("Failed to create HTTP client")?;

        self.execute_with_client(&client, url).await
    }

    /// Extracts a single product with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl MarketplaceFetch,
        url: &str,
    ) -> Result<String> {
        let parser = self.parser()?;

        info!("Extracting product: {}", url);
        let product = extract_product(client, &parser, url.trim()).await?;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_product(product.as_ref()))
    }

    /// Extracts several products.
    pub async fn execute_batch(&self, urls: &[String]) -> Result<String> {
        let client =
            MeliClient::new(&self.config).await.context("Failed to create HTTP client")?;

        self.execute_batch_with_client(&client, urls).await
    }

    /// Extracts several products with a provided client (for testing).
    ///
    /// Pages that fail are logged and left out of the output.
    pub async fn execute_batch_with_client(
        &self,
        client: &impl MarketplaceFetch,
        urls: &[String],
    ) -> Result<String> {
        let parser = self.parser()?;
        let mut products: Vec<Product> = Vec::new();

        for url in urls {
            let url = url.trim();
            info!("Extracting product: {}", url);

            match extract_product(client, &parser, url).await {
                Ok(Some(product)) => products.push(product),
                Ok(None) => {}
                Err(e) => warn!("Skipping {}: {}", url, e),
            }
        }

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_products(&products))
    }

    fn parser(&self) -> Result<Parser> {
        let selectors = Selectors::load(self.config.selectors_path.as_deref())?;
        Ok(Parser::new(selectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use async_trait::async_trait;

    /// Mock MercadoLibre client for testing.
    struct MockMeliClient {
        product_html: String,
        should_fail: bool,
    }

    impl MockMeliClient {
        fn new(product_html: String) -> Self {
            Self { product_html, should_fail: false }
        }

        fn failing() -> Self {
            Self { product_html: String::new(), should_fail: true }
        }
    }

    #[async_trait]
    impl MarketplaceFetch for MockMeliClient {
        async fn listing(&self, _url: &str) -> Result<String> {
            Ok("<html></html>".to_string())
        }

        async fn product(&self, _url: &str) -> Result<String> {
            if self.should_fail {
                anyhow::bail!("Simulated network error")
            } else {
                Ok(self.product_html.clone())
            }
        }
    }

    fn make_product_html(name: &str, price: &str, rating: Option<&str>) -> String {
        let rating = rating
            .map(|r| format!(r#"<span class="ui-pdp-review__rating">{}</span>"#, r))
            .unwrap_or_default();

        format!(
            r#"<html><body>
                <h1 class="ui-pdp-title">{}</h1>
                <div class="ui-pdp-price__second-line">
                    <span class="andes-money-amount__fraction">{}</span>
                </div>
                <figure class="ui-pdp-gallery__figure"><img src="https://http2.mlstatic.com/D_9.jpg"></figure>
                {}
            </body></html>"#,
            name, price, rating
        )
    }

    const URL: &str = "https://articulo.mercadolibre.com.ar/MLA-123-jabon#position=2";

    #[tokio::test]
    async fn test_extract_product_basic() {
        let client = MockMeliClient::new(make_product_html("Jabón Dove", "2.500", Some("4.6")));
        let parser = Parser::new(Selectors::embedded().unwrap());

        let product = extract_product(&client, &parser, URL).await.unwrap().unwrap();
        assert_eq!(product.url, "https://articulo.mercadolibre.com.ar/MLA-123-jabon");
        assert_eq!(product.name, "Jabón Dove");
        assert_eq!(product.price, 2500.0);
        assert_eq!(product.rating, Some(4.6));
    }

    #[tokio::test]
    async fn test_extract_product_missing_rating() {
        let client = MockMeliClient::new(make_product_html("Jabón Dove", "2.500", None));
        let parser = Parser::new(Selectors::embedded().unwrap());

        let product = extract_product(&client, &parser, URL).await.unwrap().unwrap();
        assert_eq!(product.rating, None);
        assert_eq!(product.reviews_count, 0);
    }

    #[tokio::test]
    async fn test_extract_product_network_error_is_swallowed() {
        let client = MockMeliClient::failing();
        let parser = Parser::new(Selectors::embedded().unwrap());

        let result = extract_product(&client, &parser, URL).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_extract_product_missing_required_field() {
        let client = MockMeliClient::new("<html><body></body></html>".to_string());
        let parser = Parser::new(Selectors::embedded().unwrap());

        let result = extract_product(&client, &parser, URL).await;
        assert!(matches!(result, Err(ExtractError::MissingField { field: "name", .. })));
    }

    #[tokio::test]
    async fn test_product_command_json() {
        let client = MockMeliClient::new(make_product_html("Jabón Dove", "2.500", Some("4.6")));
        let cmd = ProductCommand::new(Config::default());

        let output = cmd.execute_with_client(&client, URL).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["name"], "Jabón Dove");
        assert_eq!(value["currency"], "ARS");
        assert_eq!(value["availability"], "No");
    }

    #[tokio::test]
    async fn test_product_command_network_error_prints_empty_object() {
        let client = MockMeliClient::failing();
        let cmd = ProductCommand::new(Config::default());

        let output = cmd.execute_with_client(&client, URL).await.unwrap();
        assert_eq!(output, "{}");
    }

    #[tokio::test]
    async fn test_product_command_missing_field_is_error() {
        let client = MockMeliClient::new("<html></html>".to_string());
        let cmd = ProductCommand::new(Config::default());

        let result = cmd.execute_with_client(&client, URL).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("required field 'name'"));
    }

    #[tokio::test]
    async fn test_product_command_table_format() {
        let client = MockMeliClient::new(make_product_html("Jabón Dove", "2.500", None));
        let config = Config { format: OutputFormat::Table, ..Config::default() };
        let cmd = ProductCommand::new(config);

        let output = cmd.execute_with_client(&client, URL).await.unwrap();
        assert!(output.contains("Name:        Jabón Dove"));
        assert!(output.contains("ARS 2500.00"));
    }

    #[tokio::test]
    async fn test_product_command_batch_skips_broken_pages() {
        let client = MockMeliClient::new("<html></html>".to_string());
        let cmd = ProductCommand::new(Config::default());

        let urls = vec![URL.to_string(), URL.to_string()];
        let output = cmd.execute_batch_with_client(&client, &urls).await.unwrap();
        assert_eq!(output, "[]");
    }

    #[tokio::test]
    async fn test_product_command_batch_success() {
        let client = MockMeliClient::new(make_product_html("Jabón Dove", "2.500", None));
        let cmd = ProductCommand::new(Config::default());

        let urls = vec![URL.to_string(), URL.to_string()];
        let output = cmd.execute_batch_with_client(&client, &urls).await.unwrap();
        let products: Vec<Product> = serde_json::from_str(&output).unwrap();
        assert_eq!(products.len(), 2);
    }
}
