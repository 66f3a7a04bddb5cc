//! Selector Resolution - find listing containers and their fields in noisy markup
//!
//! Marketplace markup changes without notice, so no field is ever looked up
//! with a single selector. Each field has an ordered list of `FieldLocator`s
//! tried in declared priority order; the first locator whose match carries
//! usable content wins. Container discovery follows the same discipline:
//! a structural query first, then a query anchored on price elements, and
//! only when both find nothing, a raw text scan for currency-marked tokens.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::listing::RawCandidate;

/// Ancestor levels climbed from a loose price to build its container
const LOOSE_CONTAINER_LEVELS: usize = 3;

/// Ancestor levels searched for a link around a loose price
const LOOSE_LINK_LEVELS: usize = 4;

/// Loose titles must be longer than this many characters
const MIN_LOOSE_TITLE_CHARS: usize = 15;

/// Elements that may carry a loose title
const LOOSE_TITLE_TAGS: [&str; 8] = ["a", "h1", "h2", "h3", "h4", "p", "div", "span"];

/// Elements whose text is never listing content
const NON_CONTENT_TAGS: [&str; 5] = ["script", "style", "noscript", "template", "title"];

static CURRENCY_PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[₹$€£¥]\s?[0-9][0-9,]*(?:\.[0-9]+)?").expect("Invalid currency price regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex")
});

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("a[href]"));

static ANY_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("a"));

/// Parse a selector from a static dialect table.
///
/// Panics on an invalid selector; tables are fixed at compile time and
/// covered by tests.
pub fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector)
        .unwrap_or_else(|e| panic!("Invalid selector '{}': {:?}", selector, e))
}

/// Visible text of an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    WHITESPACE_RE.replace_all(&joined, " ").trim().to_string()
}

/// Text of an element with each text node trimmed and glued together.
///
/// Prices are often split over several nodes (`US $`, `12`, `.`, `34`),
/// which only read as one number without separators.
pub fn compact_text(element: ElementRef<'_>) -> String {
    let glued: String = element.text().map(str::trim).collect();
    WHITESPACE_RE.replace_all(&glued, " ").trim().to_string()
}

/// Non-empty href of an element
fn href_of(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
}

/// One way of locating a field inside a container
#[derive(Debug, Clone)]
pub enum FieldLocator {
    /// First element matched by a class/attribute selector
    Structural(Selector),
    /// First descendant element with the given tag name
    Tag(String),
    /// First element within `scope` whose text matches `pattern`
    TextScan { scope: Selector, pattern: Regex },
}

impl FieldLocator {
    pub fn structural(selector: &str) -> Self {
        FieldLocator::Structural(parse_selector(selector))
    }

    pub fn tag(name: &str) -> Self {
        FieldLocator::Tag(name.to_lowercase())
    }

    pub fn text_scan(scope: &str, pattern: &str) -> Self {
        FieldLocator::TextScan {
            scope: parse_selector(scope),
            pattern: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("Invalid text pattern '{}': {}", pattern, e)),
        }
    }

    /// Run this locator, returning its match only if `accept` approves it
    fn locate<'a, F>(&self, container: ElementRef<'a>, accept: &F) -> Option<ElementRef<'a>>
    where
        F: Fn(ElementRef<'a>) -> bool,
    {
        match self {
            FieldLocator::Structural(selector) => {
                container.select(selector).next().filter(|el| accept(*el))
            }
            FieldLocator::Tag(name) => container
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == name.as_str())
                .filter(|el| accept(*el)),
            FieldLocator::TextScan { scope, pattern } => container
                .select(scope)
                .find(|el| pattern.is_match(&element_text(*el)) && accept(*el)),
        }
    }
}

fn resolve<'a, F>(container: ElementRef<'a>, locators: &[FieldLocator], accept: F) -> Option<ElementRef<'a>>
where
    F: Fn(ElementRef<'a>) -> bool,
{
    locators.iter().enumerate().find_map(|(i, locator)| {
        let found = locator.locate(container, &accept);
        if found.is_some() && i > 0 {
            trace!("Field resolved by fallback locator #{}", i);
        }
        found
    })
}

/// First located element whose trimmed text is non-empty
pub fn find_field<'a>(container: ElementRef<'a>, locators: &[FieldLocator]) -> Option<ElementRef<'a>> {
    resolve(container, locators, |el| !element_text(el).is_empty())
}

/// Text of the first located element with non-empty text
pub fn find_text(container: ElementRef<'_>, locators: &[FieldLocator]) -> Option<String> {
    find_field(container, locators).map(element_text)
}

/// Price text of the first located element with non-empty text
pub fn find_price_text(container: ElementRef<'_>, locators: &[FieldLocator]) -> Option<String> {
    find_field(container, locators).map(compact_text)
}

/// href of the first located element carrying a non-empty href
pub fn find_link(container: ElementRef<'_>, locators: &[FieldLocator]) -> Option<String> {
    resolve(container, locators, |el| href_of(el).is_some()).and_then(href_of)
}

/// How listing containers were discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerSource {
    /// The marketplace's container selector matched
    Structural,
    /// Containers were rebuilt from price elements
    PriceAnchored,
}

/// Container discovery queries for one marketplace
#[derive(Debug, Clone)]
pub struct ContainerQuery {
    pub primary: Selector,
    /// Price elements whose nearest link-bearing `div` ancestor is a container
    pub price_anchor: Option<Selector>,
}

/// Discover listing containers in document order
pub fn discover_containers<'a>(
    document: &'a Html,
    query: &ContainerQuery,
) -> Option<(ContainerSource, Vec<ElementRef<'a>>)> {
    let primary: Vec<ElementRef<'a>> = document.select(&query.primary).collect();
    if !primary.is_empty() {
        debug!("Found {} structural containers", primary.len());
        return Some((ContainerSource::Structural, primary));
    }

    let anchor = query.price_anchor.as_ref()?;
    let mut seen = HashSet::new();
    let mut anchored = Vec::new();

    for price in document.select(anchor) {
        let container = price
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "div" && el.select(&ANY_LINK_SELECTOR).next().is_some());

        if let Some(container) = container {
            if seen.insert(container.id()) {
                anchored.push(container);
            }
        }
    }

    if anchored.is_empty() {
        return None;
    }

    debug!("Rebuilt {} containers from price elements", anchored.len());
    Some((ContainerSource::PriceAnchored, anchored))
}

/// Text that is itself a price rather than a product name
fn looks_like_price(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with(['₹', '$', '€', '£', '¥'])
        || CURRENCY_PRICE_RE
            .find(trimmed)
            .map(|m| m.start() == 0 && m.end() == trimmed.len())
            .unwrap_or(false)
}

fn in_head(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| el.value().name() == "head")
}

fn is_leaf(element: ElementRef<'_>) -> bool {
    !element.children().any(|child| child.value().is_element())
}

/// First leaf element under `container` that reads like a product name
fn loose_title(container: ElementRef<'_>) -> Option<String> {
    container
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| LOOSE_TITLE_TAGS.contains(&el.value().name()) && is_leaf(*el))
        .map(element_text)
        .find(|text| text.chars().count() > MIN_LOOSE_TITLE_CHARS && !looks_like_price(text))
}

/// First link on the price's ancestor chain or among its near relatives
fn loose_link(start: ElementRef<'_>) -> Option<String> {
    std::iter::once(start)
        .chain(start.ancestors().filter_map(ElementRef::wrap))
        .take(LOOSE_LINK_LEVELS + 1)
        .find_map(|el| {
            if el.value().name() == "a" {
                if let Some(href) = href_of(el) {
                    return Some(href);
                }
            }
            el.select(&LINK_SELECTOR).find_map(href_of)
        })
}

/// Last-resort extraction: scan document text for currency-marked prices
/// and assemble a loose candidate around each one.
pub fn scan_loose_listings(document: &Html) -> Vec<RawCandidate> {
    let mut candidates = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let Some(price) = CURRENCY_PRICE_RE.find(text) else {
            continue;
        };
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if NON_CONTENT_TAGS.contains(&parent.value().name()) || in_head(parent) {
            continue;
        }

        let mut container = parent;
        for _ in 0..LOOSE_CONTAINER_LEVELS {
            match container.parent().and_then(ElementRef::wrap) {
                Some(up) => container = up,
                None => break,
            }
        }

        let title = loose_title(container);
        let link = loose_link(parent);
        match (title, link) {
            (Some(title), Some(link)) => {
                trace!("Loose candidate '{}' at {}", title, price.as_str());
                candidates.push(RawCandidate::new(title, price.as_str().trim(), link));
            }
            _ => trace!("Skipping loose price {} without title or link", price.as_str()),
        }
    }

    debug!("Aggressive scan produced {} candidates", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(doc: &'a Html, selector: &str) -> ElementRef<'a> {
        doc.select(&parse_selector(selector)).next().unwrap()
    }

    #[test]
    fn test_find_field_skips_empty_matches() {
        let doc = Html::parse_document(
            r#"<div class="card"><span class="p1">  </span><span class="p2">$12</span></div>"#,
        );
        let card = first(&doc, ".card");
        let locators = vec![
            FieldLocator::structural(".p1"),
            FieldLocator::structural(".missing"),
            FieldLocator::structural(".p2"),
        ];
        assert_eq!(find_text(card, &locators), Some("$12".to_string()));
    }

    #[test]
    fn test_structural_checks_only_first_match() {
        let doc = Html::parse_document(
            r#"<div class="card"><b class="t"></b><b class="t">Second</b><i>Tag</i></div>"#,
        );
        let card = first(&doc, ".card");
        let locators = vec![FieldLocator::structural(".t"), FieldLocator::tag("I")];
        assert_eq!(find_text(card, &locators), Some("Tag".to_string()));
    }

    #[test]
    fn test_tag_locator_excludes_container_itself() {
        let doc = Html::parse_document(r#"<div class="card">Outer<div>Inner</div></div>"#);
        let card = first(&doc, ".card");
        assert_eq!(find_text(card, &[FieldLocator::tag("div")]), Some("Inner".to_string()));
    }

    #[test]
    fn test_text_scan_locator() {
        let doc = Html::parse_document(
            r#"<div class="card"><a href="/a">Short</a><a href="/b">Apple iPhone 15 (Blue, 128 GB)</a></div>"#,
        );
        let card = first(&doc, ".card");
        let locators = vec![FieldLocator::text_scan("a", r"(?s)^.{16,}$")];
        assert_eq!(
            find_text(card, &locators),
            Some("Apple iPhone 15 (Blue, 128 GB)".to_string())
        );
    }

    #[test]
    fn test_find_link_requires_href() {
        let doc = Html::parse_document(
            r#"<div class="card"><a class="l">No href</a><a class="l2" href=" /item/9 ">Go</a></div>"#,
        );
        let card = first(&doc, ".card");
        let locators = vec![FieldLocator::structural("a.l"), FieldLocator::structural("a.l2")];
        assert_eq!(find_link(card, &locators), Some("/item/9".to_string()));
    }

    #[test]
    fn test_find_field_none_when_all_fail() {
        let doc = Html::parse_document(r#"<div class="card"><p>text</p></div>"#);
        let card = first(&doc, ".card");
        assert!(find_field(card, &[FieldLocator::structural(".nope")]).is_none());
        assert!(find_field(card, &[]).is_none());
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Html::parse_document("<div class=\"t\">  Apple\n   <b>iPhone</b>\t15 </div>");
        assert_eq!(element_text(first(&doc, ".t")), "Apple iPhone 15");
    }

    #[test]
    fn test_discover_structural_containers() {
        let doc = Html::parse_document(
            r#"<div class="item">A</div><div class="other">B</div><div class="item">C</div>"#,
        );
        let query = ContainerQuery {
            primary: parse_selector(".item"),
            price_anchor: Some(parse_selector(".price")),
        };
        let (source, containers) = discover_containers(&doc, &query).unwrap();
        assert_eq!(source, ContainerSource::Structural);
        assert_eq!(containers.len(), 2);
    }

    #[test]
    fn test_discover_price_anchored_containers() {
        let doc = Html::parse_document(
            r#"<section>
                <div class="row"><a href="/p/1">Phone one</a><div class="wrap"><div class="price">₹100</div></div></div>
                <div class="row"><div class="price">₹200</div><div class="price">₹210</div><a href="/p/2">Phone two</a></div>
                <div class="row"><div class="price">₹300</div></div>
            </section>"#,
        );
        let query = ContainerQuery {
            primary: parse_selector(".item"),
            price_anchor: Some(parse_selector("div.price")),
        };
        let (source, containers) = discover_containers(&doc, &query).unwrap();
        assert_eq!(source, ContainerSource::PriceAnchored);
        // Two prices share the second row; the third row has no link
        assert_eq!(containers.len(), 2);
        assert!(containers.iter().all(|c| c.value().attr("class") == Some("row")));
    }

    #[test]
    fn test_discover_none_without_anchor() {
        let doc = Html::parse_document(r#"<div>Nothing here</div>"#);
        let query = ContainerQuery {
            primary: parse_selector(".item"),
            price_anchor: None,
        };
        assert!(discover_containers(&doc, &query).is_none());
    }

    #[test]
    fn test_loose_scan_builds_candidate() {
        let doc = Html::parse_document(
            r#"<html><body><div class="x"><a href="/item/1"><span>Great Phone — $199.00 Buy Now</span></a></div></body></html>"#,
        );
        let candidates = scan_loose_listings(&doc);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].price_text, "$199.00");
        assert_eq!(candidates[0].link_href, "/item/1");
        assert!(candidates[0].title_text.contains("Great Phone"));
    }

    #[test]
    fn test_loose_scan_prefers_name_over_price_text() {
        let doc = Html::parse_document(
            r#"<div><div><div class="tile">
                <a href="/p/55"><div class="name">Apple iPhone 15 (Black, 128 GB)</div></a>
                <div><div class="cost">₹69,900</div></div>
            </div></div></div>"#,
        );
        let candidates = scan_loose_listings(&doc);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title_text, "Apple iPhone 15 (Black, 128 GB)");
        assert_eq!(candidates[0].price_text, "₹69,900");
        assert_eq!(candidates[0].link_href, "/p/55");
    }

    #[test]
    fn test_loose_scan_ignores_scripts_and_linkless_prices() {
        let doc = Html::parse_document(
            r#"<html><head><script>var price = "$10";</script></head>
               <body><p>Shipping from $5.00 on all orders placed today</p></body></html>"#,
        );
        assert!(scan_loose_listings(&doc).is_empty());
    }

    #[test]
    fn test_looks_like_price() {
        assert!(looks_like_price("₹1,299"));
        assert!(looks_like_price("$ 12.50 each"));
        assert!(!looks_like_price("Great Phone — $199.00 Buy Now"));
    }

    #[test]
    fn test_compact_text_glues_split_price() {
        let doc = Html::parse_document(
            r#"<div class="p"><span>US $</span><span>12</span><span>.</span><span>34</span></div>"#,
        );
        let price = first(&doc, ".p");
        assert_eq!(compact_text(price), "US $12.34");
        assert_eq!(element_text(price), "US $ 12 . 34");
    }

    #[test]
    fn test_find_price_text_keeps_range_separator() {
        let doc = Html::parse_document(
            r#"<div class="card"><span class="price"><b>$10.00</b> - <b>$15.00</b></span></div>"#,
        );
        let card = first(&doc, ".card");
        let text = find_price_text(card, &[FieldLocator::structural(".price")]);
        assert_eq!(text.as_deref(), Some("$10.00-$15.00"));
    }

    #[test]
    fn test_loose_scan_ignores_head_title() {
        let doc = Html::parse_document(
            r#"<html><head><title>iPhone 15 deals from $99</title></head>
               <body><p>Apple iPhone 15 (Black, 128 GB) help centre</p><a href="/help">Help</a></body></html>"#,
        );
        assert!(scan_loose_listings(&doc).is_empty());
    }
}
