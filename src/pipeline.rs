//! Per-marketplace pipeline: document -> candidates -> shortlist
//!
//! Every failure inside a marketplace pipeline degrades to an empty
//! outcome with a reason; nothing here returns an error.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::extract::{extract, ExtractionMode};
use crate::listing::Listing;
use crate::marketplace::Marketplace;
use crate::rank::{build_shortlist, RankOptions, Shortlist, DEFAULT_TOP_K};
use crate::validate::{MainMatchPolicy, Query, RelevanceRules};

/// Supplies one search results document per marketplace
pub trait DocumentSource {
    /// `None` when the document could not be obtained
    fn fetch_document(&self, marketplace: Marketplace, query: &Query) -> Option<String>;
}

/// Pre-loaded documents, e.g. saved pages
impl DocumentSource for HashMap<Marketplace, String> {
    fn fetch_document(&self, marketplace: Marketplace, _query: &Query) -> Option<String> {
        self.get(&marketplace).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// No document was available
    FetchFailed,
    /// The page had no recognizable listings
    NoContainers,
    /// Listings were found but none survived validation and pricing
    AllFiltered,
}

impl EmptyReason {
    pub fn describe(self) -> &'static str {
        match self {
            EmptyReason::FetchFailed => "page could not be fetched",
            EmptyReason::NoContainers => "no listings found on the page",
            EmptyReason::AllFiltered => "no listing matched the query",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShortlistOutcome {
    Offers { offers: Shortlist },
    Empty { reason: EmptyReason },
}

/// Settings shared by every marketplace pipeline in a comparison
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub rules: RelevanceRules,
    pub top_k: usize,
    /// Overrides of each dialect's default main-match policy
    pub main_match: HashMap<Marketplace, MainMatchPolicy>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rules: RelevanceRules::default(),
            top_k: DEFAULT_TOP_K,
            main_match: HashMap::new(),
        }
    }
}

impl PipelineSettings {
    pub fn rank_options(&self, marketplace: Marketplace) -> RankOptions {
        RankOptions {
            rules: self.rules.clone(),
            main_match: self
                .main_match
                .get(&marketplace)
                .copied()
                .unwrap_or(marketplace.dialect().main_match),
            top_k: self.top_k,
        }
    }
}

/// What one marketplace pipeline saw and produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketplaceReport {
    pub marketplace: Marketplace,
    pub mode: ExtractionMode,
    pub containers: usize,
    pub candidates: usize,
    pub outcome: ShortlistOutcome,
}

impl MarketplaceReport {
    pub fn shortlist(&self) -> Option<&Shortlist> {
        match &self.outcome {
            ShortlistOutcome::Offers { offers } => Some(offers),
            ShortlistOutcome::Empty { .. } => None,
        }
    }

    /// Listings of the shortlist, empty when there were no offers
    pub fn listings(&self) -> &[Listing] {
        self.shortlist().map(Shortlist::listings).unwrap_or(&[])
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self.outcome {
            ShortlistOutcome::Empty { reason } => Some(reason),
            ShortlistOutcome::Offers { .. } => None,
        }
    }
}

/// Run one marketplace pipeline over an already obtained document
pub fn run_marketplace(
    marketplace: Marketplace,
    document: Option<&str>,
    query: &Query,
    settings: &PipelineSettings,
) -> MarketplaceReport {
    let Some(document) = document else {
        return MarketplaceReport {
            marketplace,
            mode: ExtractionMode::None,
            containers: 0,
            candidates: 0,
            outcome: ShortlistOutcome::Empty {
                reason: EmptyReason::FetchFailed,
            },
        };
    };

    let dialect = marketplace.dialect();
    let extraction = extract(document, dialect, query);
    let candidates = extraction.candidates.len();

    let outcome = if extraction.mode == ExtractionMode::None {
        ShortlistOutcome::Empty {
            reason: EmptyReason::NoContainers,
        }
    } else {
        let shortlist = build_shortlist(
            extraction.candidates,
            query,
            dialect,
            &settings.rank_options(marketplace),
        );
        if shortlist.is_empty() {
            ShortlistOutcome::Empty {
                reason: EmptyReason::AllFiltered,
            }
        } else {
            ShortlistOutcome::Offers { offers: shortlist }
        }
    };

    info!(
        "{}: mode={:?} containers={} candidates={} offers={}",
        dialect.name,
        extraction.mode,
        extraction.containers,
        candidates,
        match &outcome {
            ShortlistOutcome::Offers { offers } => offers.len(),
            ShortlistOutcome::Empty { .. } => 0,
        }
    );

    MarketplaceReport {
        marketplace,
        mode: extraction.mode,
        containers: extraction.containers,
        candidates,
        outcome,
    }
}

/// Compare a query across marketplaces, one sequential fetch each
pub fn compare<S: DocumentSource + ?Sized>(
    source: &S,
    marketplaces: &[Marketplace],
    query: &Query,
    settings: &PipelineSettings,
) -> Vec<MarketplaceReport> {
    marketplaces
        .iter()
        .map(|&marketplace| {
            let document = source.fetch_document(marketplace, query);
            if document.is_none() {
                warn!("{}: no document for '{}'", marketplace, query.raw());
            }
            run_marketplace(marketplace, document.as_deref(), query, settings)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_document_is_fetch_failed() {
        let report = run_marketplace(
            Marketplace::Amazon,
            None,
            &Query::new("iphone 15"),
            &PipelineSettings::default(),
        );
        assert_eq!(report.empty_reason(), Some(EmptyReason::FetchFailed));
        assert!(report.listings().is_empty());
    }

    #[test]
    fn test_blank_page_is_no_containers() {
        let report = run_marketplace(
            Marketplace::Snapdeal,
            Some("<html><body><h1>Oops</h1></body></html>"),
            &Query::new("iphone 15"),
            &PipelineSettings::default(),
        );
        assert_eq!(report.mode, ExtractionMode::None);
        assert_eq!(report.empty_reason(), Some(EmptyReason::NoContainers));
    }

    #[test]
    fn test_everything_filtered_is_all_filtered() {
        let page = r#"<html><body>
            <div class="product-tuple-listing">
                <a class="dp-widget-link" href="/product/case/1">
                <p class="product-title">iPhone 15 Silicone Case</p></a>
                <span class="product-price">Rs. 299</span>
            </div></body></html>"#;
        let report = run_marketplace(
            Marketplace::Snapdeal,
            Some(page),
            &Query::new("iphone 15"),
            &PipelineSettings::default(),
        );
        assert_eq!(report.mode, ExtractionMode::Structural);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.empty_reason(), Some(EmptyReason::AllFiltered));
    }

    #[test]
    fn test_main_match_override() {
        let mut settings = PipelineSettings::default();
        assert_eq!(
            settings.rank_options(Marketplace::Flipkart).main_match,
            MainMatchPolicy::MostConcise
        );
        settings.main_match.insert(Marketplace::Flipkart, MainMatchPolicy::Off);
        settings.main_match.insert(Marketplace::Ebay, MainMatchPolicy::MostConcise);
        assert_eq!(settings.rank_options(Marketplace::Flipkart).main_match, MainMatchPolicy::Off);
        assert_eq!(
            settings.rank_options(Marketplace::Ebay).main_match,
            MainMatchPolicy::MostConcise
        );
    }

    #[test]
    fn test_compare_uses_source_per_marketplace() {
        let mut pages = HashMap::new();
        pages.insert(
            Marketplace::Ebay,
            r#"<html><body><ul>
                <li class="s-item"><a class="s-item__link" href="https://www.ebay.com/itm/1">
                <div class="s-item__title">Apple iPhone 15 128GB Unlocked</div></a>
                <span class="s-item__price">$689.00</span></li>
            </ul></body></html>"#
                .to_string(),
        );

        let reports = compare(
            &pages,
            &[Marketplace::Amazon, Marketplace::Ebay],
            &Query::new("iphone 15"),
            &PipelineSettings::default(),
        );
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].empty_reason(), Some(EmptyReason::FetchFailed));
        assert_eq!(reports[1].listings().len(), 1);
        assert_eq!(reports[1].listings()[0].price, 689.0);

        let json = serde_json::to_value(&reports).unwrap();
        assert_eq!(json[0]["outcome"]["status"], "empty");
        assert_eq!(json[0]["outcome"]["reason"], "fetch_failed");
        assert_eq!(json[1]["outcome"]["status"], "offers");
        assert_eq!(json[1]["outcome"]["offers"][0]["price"], 689.0);
    }
}
