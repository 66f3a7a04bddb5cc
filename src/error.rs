use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricewiseError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Unknown marketplace: {0}")]
    UnknownMarketplace(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PricewiseError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PricewiseError::HttpError(_) | PricewiseError::FetchError(_) => Some(
                "Check your internet connection, or try a saved page:\n  pricewise extract <market> page.html \"<query>\""
            ),
            PricewiseError::UnknownMarketplace(_) => Some(
                "Known marketplaces: amazon, flipkart, ebay, aliexpress, snapdeal"
            ),
            PricewiseError::ExpenseNotFound(_) => Some(
                "Run `pricewise expense list` to see expense ids"
            ),
            PricewiseError::InvalidDate(_) => Some(
                "Dates use the YYYY-MM-DD format, e.g. 2024-03-15"
            ),
            PricewiseError::InvalidAmount(_) => Some(
                "Amounts must be non-negative numbers, e.g. 499 or 12.50"
            ),
            PricewiseError::DatabaseError(_) | PricewiseError::MigrationError(_) => Some(
                "Check the ledger location with `pricewise config path`"
            ),
            PricewiseError::TomlError(_) | PricewiseError::ConfigError(_) => Some(
                "Inspect your configuration with `pricewise config show`"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PricewiseError>;
