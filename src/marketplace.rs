//! Marketplace dialects - where each store puts titles, prices and links
//!
//! Every marketplace renders search results with its own, frequently
//! changing class names. A `Dialect` holds the ordered selector lists and
//! the source-specific policies; all matching work is delegated to
//! `crate::locate`. When a store changes its markup, add the new selector
//! to the front of the relevant list and keep the old ones as fallbacks.

use clap::ValueEnum;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PricewiseError;
use crate::locate::{parse_selector, ContainerQuery, FieldLocator};
use crate::price::Rounding;
use crate::validate::{MainMatchPolicy, Query, StrictName};

/// Supported marketplaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Amazon,
    Flipkart,
    Ebay,
    Aliexpress,
    Snapdeal,
}

impl Marketplace {
    /// All marketplaces in comparison order
    pub const ALL: [Marketplace; 5] = [
        Marketplace::Amazon,
        Marketplace::Flipkart,
        Marketplace::Ebay,
        Marketplace::Aliexpress,
        Marketplace::Snapdeal,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Marketplace::Amazon => "amazon",
            Marketplace::Flipkart => "flipkart",
            Marketplace::Ebay => "ebay",
            Marketplace::Aliexpress => "aliexpress",
            Marketplace::Snapdeal => "snapdeal",
        }
    }

    pub fn dialect(self) -> &'static Dialect {
        match self {
            Marketplace::Amazon => &AMAZON,
            Marketplace::Flipkart => &FLIPKART,
            Marketplace::Ebay => &EBAY,
            Marketplace::Aliexpress => &ALIEXPRESS,
            Marketplace::Snapdeal => &SNAPDEAL,
        }
    }

    /// Search results URL for a query
    pub fn search_url(self, query: &Query) -> String {
        let encoded: Vec<String> = query
            .raw()
            .split_whitespace()
            .map(|w| urlencoding::encode(w).into_owned())
            .collect();
        let plus = encoded.join("+");

        match self {
            Marketplace::Amazon => format!("https://www.amazon.in/s?k={}", plus),
            Marketplace::Flipkart => format!(
                "https://www.flipkart.com/search?q={}&otracker=search&otracker1=search&marketplace=FLIPKART",
                plus
            ),
            Marketplace::Ebay => format!("https://www.ebay.com/sch/i.html?_nkw={}&_ipg=50", plus),
            Marketplace::Aliexpress => format!("https://www.aliexpress.com/w/wholesale-{}.html", plus),
            Marketplace::Snapdeal => format!(
                "https://www.snapdeal.com/search?keyword={}&sort=plrty",
                encoded.join("%20")
            ),
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name)
    }
}

impl FromStr for Marketplace {
    type Err = PricewiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "");
        Marketplace::ALL
            .into_iter()
            .find(|m| m.id() == wanted)
            .ok_or_else(|| PricewiseError::UnknownMarketplace(s.to_string()))
    }
}

/// Markup dialect and ranking policy of one marketplace
#[derive(Debug)]
pub struct Dialect {
    pub marketplace: Marketplace,
    /// Display name ("Amazon")
    pub name: &'static str,
    /// Origin used to absolutize path-relative links
    pub origin: &'static str,
    /// Native currency symbol
    pub currency: &'static str,
    pub rounding: Rounding,
    /// Prices above this are treated as misparsed
    pub price_ceiling: f64,
    pub containers: ContainerQuery,
    pub title: Vec<FieldLocator>,
    pub price: Vec<FieldLocator>,
    pub link: Vec<FieldLocator>,
    /// Stricter name rule applied at extraction time
    pub strict_name: Option<StrictName>,
    /// Default main-match policy (configurable per marketplace)
    pub main_match: MainMatchPolicy,
    /// Stop after this many usable candidates
    pub candidate_cap: Option<usize>,
    /// Run the raw text scan when no containers are found
    pub aggressive_fallback: bool,
    /// Also run it when containers exist but none yields a full candidate
    pub fallback_when_unresolved: bool,
    /// Links that point somewhere other than a product page
    pub reject_link: Option<fn(&str) -> bool>,
    /// Fetch through the scraping proxy when one is configured
    pub via_proxy: bool,
}

impl Dialect {
    /// Display form of a price in this marketplace's currency
    pub fn format_price(&self, price: f64) -> String {
        self.rounding.format(self.currency, price)
    }

    pub fn is_rejected_link(&self, url: &str) -> bool {
        self.reject_link.map(|reject| reject(url)).unwrap_or(false)
    }
}

fn structural(selectors: &[&str]) -> Vec<FieldLocator> {
    selectors.iter().map(|s| FieldLocator::structural(s)).collect()
}

/// Flipkart category pages look like listings but are not products
fn flipkart_category_page(url: &str) -> bool {
    url.contains("/pr?") && !url.contains("marketplace=FLIPKART")
}

static AMAZON: Lazy<Dialect> = Lazy::new(|| Dialect {
    marketplace: Marketplace::Amazon,
    name: "Amazon",
    origin: "https://www.amazon.in",
    currency: "₹",
    rounding: Rounding::Whole,
    price_ceiling: 1e7,
    containers: ContainerQuery {
        primary: parse_selector(".s-result-item"),
        price_anchor: Some(parse_selector(".a-price")),
    },
    title: structural(&[".a-text-normal", "h2 a span", "h2 span", "h2"]),
    price: structural(&[".a-price-range", ".a-price .a-offscreen", ".a-price-whole"]),
    link: structural(&["a.a-link-normal", "h2 a", "a[href]"]),
    strict_name: None,
    main_match: MainMatchPolicy::Off,
    candidate_cap: None,
    aggressive_fallback: true,
    fallback_when_unresolved: false,
    reject_link: None,
    via_proxy: false,
});

static FLIPKART: Lazy<Dialect> = Lazy::new(|| Dialect {
    marketplace: Marketplace::Flipkart,
    name: "Flipkart",
    origin: "https://www.flipkart.com",
    currency: "₹",
    rounding: Rounding::Whole,
    price_ceiling: 1e7,
    containers: ContainerQuery {
        primary: parse_selector("div._1AtVbE, div._2kHMtA, div._4ddWXP, div._1xHGtK"),
        price_anchor: Some(parse_selector("div._30jeq3, div._1_WHN1, div.Nx9bgj")),
    },
    title: vec![
        FieldLocator::structural("._4rR01T, .s1Q9rs, .IRpwTa, .VU-Ztz, [class~=\"6EbuvT\"], .KzDlHZ, .wjcEIp"),
        FieldLocator::text_scan("a", r"(?s)^.{16,}$"),
    ],
    price: structural(&["div._30jeq3, div._1_WHN1, div.Nx9bgj, div.CxhGGd"]),
    link: structural(&["a[href]"]),
    strict_name: Some(StrictName { qualifiers: &["pro", "max"] }),
    main_match: MainMatchPolicy::MostConcise,
    candidate_cap: None,
    aggressive_fallback: true,
    fallback_when_unresolved: true,
    reject_link: Some(flipkart_category_page),
    via_proxy: false,
});

static EBAY: Lazy<Dialect> = Lazy::new(|| Dialect {
    marketplace: Marketplace::Ebay,
    name: "eBay",
    origin: "https://www.ebay.com",
    currency: "$",
    rounding: Rounding::Cents,
    price_ceiling: 1e6,
    containers: ContainerQuery {
        primary: parse_selector(".s-item, .s-card"),
        price_anchor: Some(parse_selector(".s-item__price, .s-card__price")),
    },
    title: structural(&[".s-item__title", ".s-card__title"]),
    price: structural(&[".s-item__price", ".s-card__price"]),
    link: structural(&["a.s-item__link", "a.su-link", "a[href]"]),
    strict_name: None,
    main_match: MainMatchPolicy::Off,
    candidate_cap: None,
    aggressive_fallback: true,
    fallback_when_unresolved: false,
    reject_link: None,
    via_proxy: true,
});

static ALIEXPRESS: Lazy<Dialect> = Lazy::new(|| Dialect {
    marketplace: Marketplace::Aliexpress,
    name: "AliExpress",
    origin: "https://www.aliexpress.com",
    currency: "$",
    rounding: Rounding::Cents,
    price_ceiling: 1e6,
    containers: ContainerQuery {
        primary: parse_selector("div[data-widget-type=\"productCard\"]"),
        price_anchor: None,
    },
    // The card's link text doubles as its title
    title: structural(&["a[href]", "h3", "[class*=\"title\"]"]),
    price: vec![
        FieldLocator::structural("._37W_B"),
        FieldLocator::structural("._1WkRf"),
        FieldLocator::structural("._2cXOy"),
        FieldLocator::structural("._1LY7D"),
        FieldLocator::structural(".mGXnE"),
        FieldLocator::structural(".aSZFC_S1"),
        FieldLocator::tag("span"),
        FieldLocator::structural("div._12A8D"),
    ],
    link: structural(&["a[href]"]),
    strict_name: None,
    main_match: MainMatchPolicy::Off,
    candidate_cap: None,
    aggressive_fallback: true,
    fallback_when_unresolved: false,
    reject_link: None,
    via_proxy: true,
});

static SNAPDEAL: Lazy<Dialect> = Lazy::new(|| Dialect {
    marketplace: Marketplace::Snapdeal,
    name: "Snapdeal",
    origin: "https://www.snapdeal.com",
    currency: "₹",
    rounding: Rounding::Whole,
    price_ceiling: 1e7,
    containers: ContainerQuery {
        primary: parse_selector("div.product-tuple-listing"),
        price_anchor: Some(parse_selector(".product-price")),
    },
    title: structural(&[".product-title", "p[title]"]),
    price: structural(&[".product-price", ".product-desc-price"]),
    link: structural(&["a.dp-widget-link", "a[href]"]),
    strict_name: None,
    main_match: MainMatchPolicy::Off,
    candidate_cap: Some(8),
    aggressive_fallback: true,
    fallback_when_unresolved: false,
    reject_link: None,
    via_proxy: false,
});
