//! Price normalization - turn a scraped price string into one comparable number

use once_cell::sync::Lazy;
use regex::Regex;

// Pre-compiled number pattern (ASCII digits only; \d would accept other scripts)
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("Invalid number regex pattern")
});

/// Currency words that can sit right next to the digits ("Rs.1,299", "US $12")
static CURRENCY_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:rs|inr|us|usd)\b\.?").expect("Invalid currency word regex pattern")
});

/// Thousands separators seen across marketplaces
const SEPARATORS: [char; 3] = [',', '\u{202f}', '\u{a0}'];

/// Currency marks stripped before scanning
const CURRENCY_SYMBOLS: [char; 5] = ['₹', '$', '€', '£', '¥'];

/// Normalize a raw price string into a single value.
///
/// Ranges ("$10 – $15") resolve to their lowest bound. Text without any
/// number yields `f64::INFINITY`, which callers treat as unparseable.
pub fn normalize_price(price_text: &str) -> f64 {
    let cleaned: String = price_text
        .chars()
        .filter(|c| !SEPARATORS.contains(c) && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let cleaned = CURRENCY_WORD_RE.replace_all(&cleaned, " ");

    NUMBER_RE
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .fold(f64::INFINITY, f64::min)
}

/// Whether a normalized price can be shown as an offer
pub fn is_usable(price: f64, ceiling: f64) -> bool {
    price.is_finite() && price > 0.0 && price <= ceiling
}

/// How a marketplace presents amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Whole currency units (INR sources)
    Whole,
    /// Two decimals (USD sources)
    Cents,
}

impl Rounding {
    pub fn apply(self, price: f64) -> f64 {
        match self {
            Rounding::Whole => price.round(),
            Rounding::Cents => (price * 100.0).round() / 100.0,
        }
    }

    /// Format a price with its currency symbol
    pub fn format(self, symbol: &str, price: f64) -> String {
        match self {
            Rounding::Whole => format!("{}{}", symbol, self.apply(price) as i64),
            Rounding::Cents => format!("{}{:.2}", symbol, self.apply(price)),
        }
    }
}
