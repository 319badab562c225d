//! Output formatting for products and page URLs (JSON, table, CSV).

use crate::config::OutputFormat;
use crate::meli::Product;

const TITLE_WIDTH: usize = 50;

/// Formats extraction results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single product; `None` stands for a page that couldn't be fetched.
    pub fn format_product(&self, product: Option<&Product>) -> String {
        match (self.format, product) {
            (OutputFormat::Json, Some(product)) => self.json_single(product),
            (OutputFormat::Json, None) => "{}".to_string(),
            (OutputFormat::Table, Some(product)) => self.table_single(product),
            (OutputFormat::Table, None) => "No product extracted.".to_string(),
            (OutputFormat::Csv, product) => {
                self.csv_products(product.map(std::slice::from_ref).unwrap_or(&[]))
            }
        }
    }

    /// Formats multiple products.
    pub fn format_products(&self, products: &[Product]) -> String {
        if products.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                OutputFormat::Table => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_products(products),
            OutputFormat::Table => self.table_products(products),
            OutputFormat::Csv => self.csv_products(products),
        }
    }

    /// Formats a list of listing page URLs.
    pub fn format_urls(&self, urls: &[String]) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(urls).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => {
                let mut lines = urls.to_vec();
                lines.push(String::new());
                lines.push(format!("Total: {} pages", urls.len()));
                lines.join("\n")
            }
            OutputFormat::Csv => {
                let mut lines = vec!["url".to_string()];
                lines.extend(urls.iter().map(|u| Self::csv_escape(u)));
                lines.join("\n")
            }
        }
    }

    // JSON formatting

    fn json_single(&self, product: &Product) -> String {
        serde_json::to_string_pretty(product).unwrap_or_else(|_| "{}".to_string())
    }

    fn json_products(&self, products: &[Product]) -> String {
        serde_json::to_string_pretty(products).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_single(&self, product: &Product) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Name:        {}", product.name));
        lines.push(format!("URL:         {}", product.url));
        lines.push(format!("Price:       {} {:.2}", product.currency, product.price));
        lines.push(format!("Available:   {}", product.availability));

        match product.rating {
            Some(stars) => lines.push(format!(
                "Rating:      {:.1}/5 ({} reviews)",
                stars, product.reviews_count
            )),
            None => lines.push("Rating:      N/A".to_string()),
        }

        if !product.category.is_empty() {
            lines.push(format!("Category:    {}", product.category));
        }

        lines.push(format!("Image:       {}", product.image_url));

        if !product.description.is_empty() {
            lines.push(String::new());
            lines.push(product.description.clone());
        }

        lines.join("\n")
    }

    fn table_products(&self, products: &[Product]) -> String {
        let price_width = 14;
        let rating_width = 6;
        let stock_width = 5;
        let title_width = TITLE_WIDTH;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<price_width$}  {:<rating_width$}  {:<stock_width$}  {}",
            "Price", "Rating", "Stock", "Name"
        ));
        lines.push(format!(
            "{:-<price_width$}  {:-<rating_width$}  {:-<stock_width$}  {:-<title_width$}",
            "", "", "", ""
        ));

        for product in products {
            let price_str = format!("{:.2}", product.price);
            let rating_str = product.rating.map(|r| format!("{:.1}", r)).unwrap_or("N/A".into());

            lines.push(format!(
                "{:>price_width$}  {:>rating_width$}  {:<stock_width$}  {}",
                price_str,
                rating_str,
                product.availability.to_string(),
                truncate(&product.name, title_width)
            ));
        }

        lines.push(String::new());
        let in_stock = products.iter().filter(|p| p.in_stock()).count();
        lines.push(format!("Total: {} products ({} in stock)", products.len(), in_stock));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "url,name,price,currency,availability,image_url,description,rating,reviews_count,category"
            .to_string()
    }

    fn csv_products(&self, products: &[Product]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for product in products {
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{},{}",
                Self::csv_escape(&product.url),
                Self::csv_escape(&product.name),
                product.price,
                product.currency,
                product.availability,
                Self::csv_escape(&product.image_url),
                Self::csv_escape(&product.description),
                product.rating.map(|r| r.to_string()).unwrap_or_default(),
                product.reviews_count,
                Self::csv_escape(&product.category)
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

/// Shortens `s` to at most `width` characters, marking the cut with "...".
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
