//! Cross-marketplace aggregation
//!
//! Flattens per-marketplace shortlists into one display list, tagging each
//! offer with a spending category and a recommendation derived from the
//! expense ledger. Ordering is inherited from the shortlists; this module
//! never re-ranks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::marketplace::Marketplace;
use crate::pipeline::MarketplaceReport;

pub const DEFAULT_CATEGORY: &str = "Shopping";

/// Price at least this far above the category average is flagged
const OVER_AVERAGE_RATIO: f64 = 1.1;
/// Price at or below this share of the average is a good deal
const UNDER_AVERAGE_RATIO: f64 = 0.9;
/// Remaining budget within this share of the limit triggers a warning
const NEAR_BUDGET_RATIO: f64 = 0.1;

/// Keywords mapping a listing title to a spending category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

pub fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Electronics",
            &[
                "phone", "iphone", "mobile", "laptop", "tablet", "camera", "tv", "earbuds",
                "headphone", "smartwatch", "charger",
            ],
        ),
        CategoryRule::new(
            "Clothing",
            &[
                "shoe", "sandal", "tshirt", "shirt", "jeans", "dress", "apparel", "cloth",
                "jacket", "hoodie", "sneaker",
            ],
        ),
        CategoryRule::new(
            "Groceries",
            &["grocery", "food", "snack", "beverage", "drink", "rice", "atta", "oil", "milk", "bread"],
        ),
        CategoryRule::new(
            "Home",
            &["mattress", "bedsheet", "pillow", "furniture", "sofa", "chair", "table", "curtain"],
        ),
        CategoryRule::new(
            "Beauty",
            &["cream", "serum", "lotion", "shampoo", "makeup", "lipstick", "conditioner"],
        ),
    ]
}

/// Ordered keyword table; the first rule with a matching keyword wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
    default: String,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(default_category_rules(), DEFAULT_CATEGORY)
    }
}

impl CategoryTable {
    pub fn new(rules: Vec<CategoryRule>, default: &str) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule {
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                name: rule.name,
            })
            .collect();
        Self {
            rules,
            default: default.to_string(),
        }
    }

    pub fn infer(&self, title: &str) -> &str {
        let lower = title.to_lowercase();
        if lower.trim().is_empty() {
            return &self.default;
        }
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|rule| rule.name.as_str())
            .unwrap_or(&self.default)
    }
}

/// Read-only spending figures keyed by category
pub trait Ledger {
    /// Average historical expense per category
    fn category_averages(&self) -> Result<HashMap<String, f64>>;
    /// Total spent in the given `YYYY-MM` month per category
    fn month_spend_by_category(&self, month: &str) -> Result<HashMap<String, f64>>;
    /// Configured monthly budget per category
    fn budgets(&self) -> Result<HashMap<String, f64>>;
}

/// Ledger figures captured once per comparison
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    pub averages: HashMap<String, f64>,
    pub spent_this_month: HashMap<String, f64>,
    pub budgets: HashMap<String, f64>,
}

impl LedgerSnapshot {
    pub fn load(ledger: &impl Ledger, month: &str) -> Result<Self> {
        Ok(Self {
            averages: ledger.category_averages()?,
            spent_this_month: ledger.month_spend_by_category(month)?,
            budgets: ledger.budgets()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecType {
    Good,
    Warn,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecommendation {
    pub category: String,
    pub rec_text: Option<String>,
    pub rec_type: RecType,
    pub budget_remaining: Option<f64>,
    pub budget_limit: Option<f64>,
}

/// Recommendation for buying `amount` worth of `title`.
///
/// A budget warning replaces any average-based message.
pub fn recommend(
    title: &str,
    amount: f64,
    table: &CategoryTable,
    ledger: &LedgerSnapshot,
    currency: &str,
) -> CategoryRecommendation {
    let category = table.infer(title).to_string();
    let average = ledger.averages.get(&category).copied().unwrap_or(0.0);
    let budget = ledger.budgets.get(&category).copied();
    let spent = ledger.spent_this_month.get(&category).copied().unwrap_or(0.0);
    let remaining = budget.map(|limit| (limit - spent).max(0.0));

    let mut rec_text = None;
    let mut rec_type = RecType::None;

    if average > 0.0 && amount > 0.0 {
        if amount >= OVER_AVERAGE_RATIO * average {
            let pct = ((amount - average) / average * 100.0).round() as i64;
            rec_text = Some(format!(
                "About {}% higher than your {} average ({}{}). Consider cheaper options.",
                pct, category, currency, average as i64
            ));
            rec_type = RecType::Warn;
        } else if amount <= UNDER_AVERAGE_RATIO * average {
            let pct = ((average - amount) / average * 100.0).round() as i64;
            rec_text = Some(format!(
                "Good deal! ~{}% below your {} average ({}{}).",
                pct, category, currency, average as i64
            ));
            rec_type = RecType::Good;
        }
    }

    if let (Some(remaining), Some(limit)) = (remaining, budget) {
        if amount > 0.0 {
            if amount > remaining {
                rec_text = Some(format!(
                    "Exceeds {} budget by {}{}. Remaining: {}{}",
                    category,
                    currency,
                    (amount - remaining) as i64,
                    currency,
                    remaining as i64
                ));
                rec_type = RecType::Warn;
            } else if remaining > 0.0 && remaining - amount <= NEAR_BUDGET_RATIO * limit {
                rec_text = Some(format!(
                    "Within {}{} of your {} budget.",
                    currency,
                    (remaining - amount) as i64,
                    category
                ));
                rec_type = RecType::Warn;
            }
        }
    }

    CategoryRecommendation {
        category,
        rec_text,
        rec_type,
        budget_remaining: remaining,
        budget_limit: budget,
    }
}

/// One offer ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedOffer {
    pub marketplace: Marketplace,
    pub store: &'static str,
    pub title: String,
    /// Amount after the marketplace's display rounding
    pub amount: f64,
    pub display_price: String,
    pub url: String,
    pub in_stock: bool,
    #[serde(flatten)]
    pub recommendation: CategoryRecommendation,
}

/// Flatten every report's shortlist, in report order then shortlist order
pub fn aggregate(
    reports: &[MarketplaceReport],
    table: &CategoryTable,
    ledger: &LedgerSnapshot,
    currency: &str,
) -> Vec<AggregatedOffer> {
    reports
        .iter()
        .flat_map(|report| {
            let dialect = report.marketplace.dialect();
            report.listings().iter().map(move |listing| {
                let amount = dialect.rounding.apply(listing.price);
                AggregatedOffer {
                    marketplace: report.marketplace,
                    store: dialect.name,
                    title: listing.title.clone(),
                    amount,
                    display_price: dialect.format_price(listing.price),
                    url: listing.url.clone(),
                    in_stock: listing.in_stock,
                    recommendation: recommend(&listing.title, amount, table, ledger, currency),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LedgerSnapshot {
        let mut s = LedgerSnapshot::default();
        s.averages.insert("Electronics".into(), 1000.0);
        s
    }

    #[test]
    fn test_infer_category_first_match_wins() {
        let table = CategoryTable::default();
        assert_eq!(table.infer("Apple iPhone 15"), "Electronics");
        assert_eq!(table.infer("Running Shoe"), "Clothing");
        // "phone" (Electronics) is listed before "table" (Home)
        assert_eq!(table.infer("Phone table stand"), "Electronics");
        assert_eq!(table.infer("Garden hose"), "Shopping");
        assert_eq!(table.infer("   "), "Shopping");
    }

    #[test]
    fn test_custom_table() {
        let table = CategoryTable::new(vec![CategoryRule::new("Books", &["Novel"])], "Misc");
        assert_eq!(table.infer("A novel about ships"), "Books");
        assert_eq!(table.infer("Apple iPhone 15"), "Misc");
    }

    #[test]
    fn test_warn_above_average() {
        let rec = recommend("Phone", 1250.0, &CategoryTable::default(), &snapshot(), "₹");
        assert_eq!(rec.rec_type, RecType::Warn);
        assert_eq!(
            rec.rec_text.as_deref(),
            Some("About 25% higher than your Electronics average (₹1000). Consider cheaper options.")
        );
        assert_eq!(rec.budget_remaining, None);
    }

    #[test]
    fn test_good_below_average() {
        let rec = recommend("Phone", 800.0, &CategoryTable::default(), &snapshot(), "₹");
        assert_eq!(rec.rec_type, RecType::Good);
        assert_eq!(
            rec.rec_text.as_deref(),
            Some("Good deal! ~20% below your Electronics average (₹1000).")
        );
    }

    #[test]
    fn test_near_average_has_no_message() {
        let rec = recommend("Phone", 1050.0, &CategoryTable::default(), &snapshot(), "₹");
        assert_eq!(rec.rec_type, RecType::None);
        assert!(rec.rec_text.is_none());
    }

    #[test]
    fn test_budget_exceeded_takes_priority() {
        let mut ledger = snapshot();
        ledger.budgets.insert("Electronics".into(), 2000.0);
        ledger.spent_this_month.insert("Electronics".into(), 1500.0);

        let rec = recommend("Phone", 800.0, &CategoryTable::default(), &ledger, "₹");
        assert_eq!(rec.rec_type, RecType::Warn);
        assert_eq!(
            rec.rec_text.as_deref(),
            Some("Exceeds Electronics budget by ₹300. Remaining: ₹500")
        );
        assert_eq!(rec.budget_remaining, Some(500.0));
        assert_eq!(rec.budget_limit, Some(2000.0));
    }

    #[test]
    fn test_near_budget_warning() {
        let mut ledger = LedgerSnapshot::default();
        ledger.budgets.insert("Electronics".into(), 1000.0);
        ledger.spent_this_month.insert("Electronics".into(), 200.0);

        let rec = recommend("Phone", 750.0, &CategoryTable::default(), &ledger, "₹");
        assert_eq!(rec.rec_text.as_deref(), Some("Within ₹50 of your Electronics budget."));
    }

    #[test]
    fn test_overspent_budget_clamps_remaining() {
        let mut ledger = LedgerSnapshot::default();
        ledger.budgets.insert("Home".into(), 100.0);
        ledger.spent_this_month.insert("Home".into(), 400.0);

        let rec = recommend("Sofa", 10.0, &CategoryTable::default(), &ledger, "$");
        assert_eq!(rec.budget_remaining, Some(0.0));
        assert_eq!(rec.rec_text.as_deref(), Some("Exceeds Home budget by $10. Remaining: $0"));
    }
}
