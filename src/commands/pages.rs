//! Pagination discovery command implementation.

use crate::config::Config;
use crate::format::Formatter;
use crate::meli::pagination::listing_url;
use crate::meli::{MarketplaceFetch, MeliClient, Paginator, Parser, Selectors};
use anyhow::{Context, Result};
use tracing::info;

/// Lists every page URL of a category or search listing.
pub struct PagesCommand {
    config: Config,
}

impl PagesCommand {
    /// Creates a new pages command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Resolves the listing and returns formatted page URLs.
    pub async fn execute(&self, listing: &str) -> Result<String> {
        let client =
            MeliClient::new(&self.config).await.context("Failed to create HTTP client")?;

        self.execute_with_client(&client, listing).await
    }

    /// Resolves the listing with a provided client (for testing).
    pub async fn execute_with_client(
        &self,
        client: &impl MarketplaceFetch,
        listing: &str,
    ) -> Result<String> {
        let selectors = Selectors::load(self.config.selectors_path.as_deref())?;
        let parser = Parser::new(selectors);

        let url = listing_url(listing);
        info!("Resolving pagination for: {}", url);

        let pages = Paginator::new(client, &parser)
            .with_max_depth(self.config.max_depth)
            .resolve(&url)
            .await;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_urls(&pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use async_trait::async_trait;

    /// Mock client returning one listing page for every URL.
    struct MockMeliClient {
        listing_html: String,
    }

    #[async_trait]
    impl MarketplaceFetch for MockMeliClient {
        async fn listing(&self, _url: &str) -> Result<String> {
            Ok(self.listing_html.clone())
        }

        async fn product(&self, _url: &str) -> Result<String> {
            anyhow::bail!("not a product mock")
        }
    }

    fn make_listing_html(total: u32) -> String {
        format!(
            r#"<html><head><script>x = {{"dimension22":"{}"}};</script></head><body></body></html>"#,
            total
        )
    }

    #[tokio::test]
    async fn test_pages_command_json() {
        let client = MockMeliClient { listing_html: make_listing_html(100) };
        let cmd = PagesCommand::new(Config::default());

        let output = cmd.execute_with_client(&client, "jabon bebe").await.unwrap();
        let pages: Vec<String> = serde_json::from_str(&output).unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(
            pages[0],
            "https://listado.mercadolibre.com.ar/jabon-bebe_Desde_1_NoIndex_True"
        );
    }

    #[tokio::test]
    async fn test_pages_command_item_url() {
        let client = MockMeliClient { listing_html: String::new() };
        let cmd = PagesCommand::new(Config::default());

        let url = "https://articulo.mercadolibre.com.ar/MLA-123-jabon";
        let output = cmd.execute_with_client(&client, url).await.unwrap();
        assert!(output.contains(url));
    }

    #[tokio::test]
    async fn test_pages_command_table() {
        let client = MockMeliClient { listing_html: make_listing_html(0) };
        let config = Config { format: OutputFormat::Table, ..Config::default() };
        let cmd = PagesCommand::new(config);

        let output = cmd.execute_with_client(&client, "jabon").await.unwrap();
        assert!(output.contains("Total: 0 pages"));
    }

    #[tokio::test]
    async fn test_pages_command_bad_selector_file() {
        let client = MockMeliClient { listing_html: make_listing_html(10) };
        let config = Config {
            selectors_path: Some("/nonexistent/selectors.toml".into()),
            ..Config::default()
        };
        let cmd = PagesCommand::new(config);

        let result = cmd.execute_with_client(&client, "jabon").await;
        assert!(result.is_err());
    }
}
