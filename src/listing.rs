use serde::{Deserialize, Serialize};

/// An unvalidated title/price/link triple lifted from one listing container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title_text: String,
    pub price_text: String,
    pub link_href: String,
}

impl RawCandidate {
    pub fn new(title: impl Into<String>, price: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title_text: title.into(),
            price_text: price.into(),
            link_href: link.into(),
        }
    }
}

/// A validated offer: finite positive price, absolute URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: f64,
    pub url: String,
    /// False when the title reports the item as sold out
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

fn default_true() -> bool {
    true
}

impl Listing {
    /// Availability as reported by the title text
    pub fn stock_from_title(title: &str) -> bool {
        let lower = title.to_lowercase();
        !(lower.contains("sold out") || lower.contains("out of stock"))
    }
}
