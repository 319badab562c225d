//! meli-crawler - MercadoLibre Argentina listing and product scraper CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use meli_crawler::commands::{CrawlCommand, PagesCommand, ProductCommand};
use meli_crawler::config::{Config, OutputFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

const DEFAULT_LISTING: &str =
    "https://listado.mercadolibre.com.ar/supermercado/bebes/higiene-cuidado-bebe/jabones/";

#[derive(Parser)]
#[command(
    name = "meli-crawler",
    version,
    about = "MercadoLibre Argentina listing and product scraper",
    long_about = "Discovers every page of a MercadoLibre Argentina listing and extracts product details using configurable CSS selectors."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to a selector file replacing the built-in selectors
    #[arg(short, long, global = true, env = "MELI_SELECTORS")]
    selectors: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "MELI_TIMEOUT")]
    timeout: Option<u64>,

    /// Maximum nesting of price-range sub-listings (unbounded by default)
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every page URL of a listing
    #[command(alias = "p")]
    Pages {
        /// Listing URL or search term
        #[arg(default_value = DEFAULT_LISTING)]
        listing: String,
    },

    /// Extract product details from detail page URLs
    #[command(alias = "d")]
    Product {
        /// Product URL(s)
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Resolve a listing and extract every product on it
    #[command(alias = "c")]
    Crawl {
        /// Listing URL or search term
        #[arg(default_value = DEFAULT_LISTING)]
        listing: String,

        /// Stop after this many listing pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Stop after this many products
        #[arg(short, long)]
        max_products: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(path) = cli.selectors {
        config.selectors_path = Some(path);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = Some(max_depth);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Commands::Pages { listing } => {
            let output = PagesCommand::new(config).execute(&listing).await?;
            println!("{}", output);
        }

        Commands::Product { urls } => {
            let cmd = ProductCommand::new(config);

            let output = if urls.len() == 1 {
                cmd.execute(&urls[0]).await?
            } else {
                cmd.execute_batch(&urls).await?
            };

            println!("{}", output);
        }

        Commands::Crawl { listing, max_pages, max_products } => {
            let output = CrawlCommand::new(config)
                .max_pages(max_pages)
                .max_products(max_products)
                .execute(&listing)
                .await?;
            println!("{}", output);
        }
    }

    Ok(())
}
