//! Ranking - turn raw candidates into a bounded, price-sorted shortlist

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, trace};
use url::Url;

use crate::listing::{Listing, RawCandidate};
use crate::marketplace::Dialect;
use crate::price::{is_usable, normalize_price};
use crate::validate::{MainMatchPolicy, Query, RelevanceRules};

pub const DEFAULT_TOP_K: usize = 3;

/// Knobs the caller controls; everything else comes from the dialect
#[derive(Debug, Clone)]
pub struct RankOptions {
    pub rules: RelevanceRules,
    pub main_match: MainMatchPolicy,
    pub top_k: usize,
}

impl RankOptions {
    /// Defaults for a dialect: shared deny-list, the dialect's own policy
    pub fn for_dialect(dialect: &Dialect) -> Self {
        Self {
            rules: RelevanceRules::default(),
            main_match: dialect.main_match,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Up to `k` listings, ascending by price, no duplicate (title, price)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Shortlist {
    listings: Vec<Listing>,
}

impl Shortlist {
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn cheapest(&self) -> Option<&Listing> {
        self.listings.first()
    }
}

/// Resolve a scraped href against the marketplace origin.
///
/// Absolute URLs pass through, protocol-relative ones get `https:`.
pub fn absolutize_link(href: &str, origin: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    Url::parse(origin)
        .and_then(|base| base.join(href))
        .map(String::from)
        .ok()
}

/// Build the shortlist for one marketplace.
///
/// Stages run in order: relevance validation, main-match narrowing,
/// price normalization with the ceiling check, link resolution, dedup by
/// (lowercased title, price), stable ascending sort, truncation to k.
pub fn build_shortlist(
    candidates: Vec<RawCandidate>,
    query: &Query,
    dialect: &Dialect,
    options: &RankOptions,
) -> Shortlist {
    let total = candidates.len();
    let relevant: Vec<RawCandidate> = candidates
        .into_iter()
        .filter(|c| {
            let ok = options.rules.is_valid(&c.title_text, query);
            if !ok {
                trace!("{}: rejected title '{}'", dialect.name, c.title_text);
            }
            ok
        })
        .collect();

    let relevant = options
        .main_match
        .apply(relevant, query, |c| c.title_text.as_str());

    let mut priced = Vec::new();
    for candidate in relevant {
        if let Some(cap) = dialect.candidate_cap {
            if priced.len() >= cap {
                break;
            }
        }

        let price = normalize_price(&candidate.price_text);
        if !is_usable(price, dialect.price_ceiling) {
            trace!("{}: unusable price '{}'", dialect.name, candidate.price_text);
            continue;
        }
        let Some(url) = absolutize_link(&candidate.link_href, dialect.origin) else {
            trace!("{}: unresolvable link '{}'", dialect.name, candidate.link_href);
            continue;
        };

        let title = candidate.title_text.trim().to_string();
        priced.push(Listing {
            in_stock: Listing::stock_from_title(&title),
            title,
            price,
            url,
        });
    }

    let mut seen = HashSet::new();
    let mut listings: Vec<Listing> = priced
        .into_iter()
        .filter(|l| seen.insert((l.title.to_lowercase(), l.price.to_bits())))
        .collect();

    // Stable: equal prices keep document order
    listings.sort_by(|a, b| a.price.total_cmp(&b.price));
    listings.truncate(options.top_k);

    debug!(
        "{}: {} of {} candidates shortlisted",
        dialect.name,
        listings.len(),
        total
    );
    Shortlist { listings }
}
