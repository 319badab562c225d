//! Errors raised while reading fields out of marketplace pages.

use thiserror::Error;

/// Failure to turn a page into a structured record.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A field the record cannot exist without was not found on the page.
    #[error("required field '{field}' not found on {url}")]
    MissingField { field: &'static str, url: String },

    /// A field was present but its text is not a number.
    #[error("field '{field}' has non-numeric value '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// A configured selector failed to compile.
    #[error("invalid selector for '{field}': {reason}")]
    InvalidSelector { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ExtractError::MissingField {
            field: "name",
            url: "https://articulo.mercadolibre.com.ar/MLA-1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'name'"));
        assert!(msg.contains("MLA-1"));
    }

    #[test]
    fn test_invalid_selector_message() {
        let err = ExtractError::InvalidSelector {
            field: "product_price".to_string(),
            reason: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "invalid selector for 'product_price': unexpected token");
    }
}
