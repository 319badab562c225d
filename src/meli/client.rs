//! HTTP client for MercadoLibre requests using wreq for TLS fingerprint emulation.

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use wreq::Client;
use wreq_util::Emulation;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Trait for fetching marketplace pages - enables mocking for tests.
#[async_trait]
pub trait MarketplaceFetch: Send + Sync {
    /// Fetches a listing (category or search) page.
    async fn listing(&self, url: &str) -> Result<String>;

    /// Fetches a product detail page with a fresh session cookie.
    async fn product(&self, url: &str) -> Result<String>;
}

/// MercadoLibre HTTP client with browser-like headers.
pub struct MeliClient {
    client: Client,
    base_url: Option<String>,
}

impl MeliClient {
    /// Creates a new client with the given configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, None).await
    }

    /// Creates a new client that sends every request to `base_url` (for testing).
    pub async fn with_base_url(config: &Config, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Rewrites scheme and host when a base URL override is set.
    fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path_and_query(url)),
            None => url.to_string(),
        }
    }

    /// Performs a GET request and returns the body of a successful response.
    async fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<String> {
        let url = self.resolve(url);
        debug!("GET {}", url);

        let mut request = self.client.get(url.as_str()).emulation(Emulation::Chrome131);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            anyhow::bail!("Request to {} failed with status: {}", url, status);
        }

        response.text().await.context("Failed to read response body")
    }
}

#[async_trait]
impl MarketplaceFetch for MeliClient {
    async fn listing(&self, url: &str) -> Result<String> {
        info!("Fetching listing: {}", url);

        let headers = [
            ("User-Agent", BROWSER_USER_AGENT.to_string()),
            ("Accept-Language", "en-US,en;q=0.9".to_string()),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Encoding", "gzip, deflate, br".to_string()),
            ("Connection", "keep-alive".to_string()),
        ];
        self.get(url, &headers).await
    }

    async fn product(&self, url: &str) -> Result<String> {
        info!("Fetching product: {}", url);

        let headers = [
            ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9".to_string()),
            ("User-Agent", "Mozilla/5.0".to_string()),
            ("Cookie", session_cookie()),
        ];
        self.get(url, &headers).await
    }
}

/// Hotjar session payload the product pages expect to find in a cookie.
#[derive(Serialize)]
struct HotjarSession {
    id: String,
    created: u64,
    existing: bool,
}

/// JSON formatter writing `", "` and `": "` separators, the layout the
/// session cookie has always been sent with.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn spaced_json(value: &impl Serialize) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Builds a cookie header with random device and session identifiers.
pub fn session_cookie() -> String {
    let session =
        HotjarSession { id: Uuid::new_v4().to_string(), created: 123456789, existing: true };
    // Serializing a plain struct of strings and numbers cannot fail
    let payload = spaced_json(&session).unwrap_or_default();

    format!("_d2id={}; _hjSessionUser_783944={}", Uuid::new_v4(), URL_SAFE.encode(payload))
}

/// Path, query and fragment of an absolute URL ("/" when there is no path).
fn path_and_query(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.find('/').map_or("/", |i| &rest[i..])
}
