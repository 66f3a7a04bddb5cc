use scraper::Html;
use serde::Serialize;
use tracing::{debug, trace};

use crate::listing::RawCandidate;
use crate::locate::{
    discover_containers, find_link, find_price_text, find_text, scan_loose_listings, ContainerSource,
};
use crate::marketplace::Dialect;
use crate::validate::Query;

/// Which extraction path produced the candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Marketplace container selector matched
    Structural,
    /// Containers rebuilt from price elements
    PriceAnchored,
    /// Raw text scan for currency-marked prices
    Aggressive,
    /// Nothing recognizable on the page
    None,
}

/// Candidates extracted from one search results page
#[derive(Debug, Clone)]
pub struct Extraction {
    pub mode: ExtractionMode,
    /// Containers discovered before field resolution
    pub containers: usize,
    /// Complete candidates in document order
    pub candidates: Vec<RawCandidate>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Extract listing candidates from a marketplace results page.
///
/// A container contributes a candidate only when title, price and link all
/// resolve. Candidates keep document order. The strict-name rule and the
/// link reject rule of the dialect are applied here, before ranking.
pub fn extract(document: &str, dialect: &Dialect, query: &Query) -> Extraction {
    let html = Html::parse_document(document);

    let (mode, containers, candidates) = match discover_containers(&html, &dialect.containers) {
        Some((source, containers)) => {
            let mode = match source {
                ContainerSource::Structural => ExtractionMode::Structural,
                ContainerSource::PriceAnchored => ExtractionMode::PriceAnchored,
            };

            let candidates: Vec<RawCandidate> = containers
                .iter()
                .enumerate()
                .filter_map(|(i, container)| {
                    let title = find_text(*container, &dialect.title);
                    let price = find_price_text(*container, &dialect.price);
                    let link = find_link(*container, &dialect.link);
                    match (title, price, link) {
                        (Some(title), Some(price), Some(link)) => Some(RawCandidate::new(title, price, link)),
                        _ => {
                            trace!("{}: container {} is missing a field", dialect.name, i);
                            None
                        }
                    }
                })
                .collect();

            if candidates.is_empty() && dialect.fallback_when_unresolved {
                debug!(
                    "{}: {} containers but no complete candidate, scanning text",
                    dialect.name,
                    containers.len()
                );
                let loose = scan_loose_listings(&html);
                if loose.is_empty() {
                    (mode, containers.len(), loose)
                } else {
                    (ExtractionMode::Aggressive, containers.len(), loose)
                }
            } else {
                (mode, containers.len(), candidates)
            }
        }
        None if dialect.aggressive_fallback => {
            debug!("{}: no containers found, scanning text", dialect.name);
            let loose = scan_loose_listings(&html);
            if loose.is_empty() {
                (ExtractionMode::None, 0, loose)
            } else {
                (ExtractionMode::Aggressive, 0, loose)
            }
        }
        None => (ExtractionMode::None, 0, Vec::new()),
    };

    let before = candidates.len();
    let candidates: Vec<RawCandidate> = candidates
        .into_iter()
        .filter(|c| !dialect.is_rejected_link(&c.link_href))
        .filter(|c| {
            dialect
                .strict_name
                .map(|rule| rule.matches(&c.title_text, query))
                .unwrap_or(true)
        })
        .collect();

    if candidates.len() < before {
        debug!(
            "{}: dropped {} candidates by link or name rules",
            dialect.name,
            before - candidates.len()
        );
    }

    Extraction {
        mode,
        containers,
        candidates,
    }
}
