use colored::Colorize;

use pricewise::aggregate::{aggregate, AggregatedOffer, LedgerSnapshot, RecType};
use pricewise::config::Config;
use pricewise::db::{current_month, Database};
use pricewise::error::{PricewiseError, Result};
use pricewise::fetch::HttpSource;
use pricewise::marketplace::Marketplace;
use pricewise::pipeline::{compare, run_marketplace, MarketplaceReport};
use pricewise::validate::Query;
use tracing::warn;

use crate::utils::{truncate_str, use_color};

/// Compare a product across marketplaces
pub fn cmd_compare(query: &str, markets: Vec<Marketplace>, json: bool, no_ledger: bool) -> Result<()> {
    let config = Config::load()?;
    let query = Query::new(query);
    if query.is_empty() {
        return Err(PricewiseError::ConfigError("search query cannot be empty".into()));
    }

    let markets = if markets.is_empty() { config.marketplaces.clone() } else { markets };
    let source = HttpSource::new(&config.fetch);
    let reports = compare(&source, &markets, &query, &config.pipeline_settings());

    // A broken ledger must not hide the offers
    let ledger = if no_ledger {
        LedgerSnapshot::default()
    } else {
        match Database::open().and_then(|db| LedgerSnapshot::load(&db, &current_month())) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("ledger unavailable: {}", e);
                LedgerSnapshot::default()
            }
        }
    };

    let offers = aggregate(&reports, &config.category_table(), &ledger, &config.ledger_currency);

    if json {
        let output = serde_json::json!({
            "query": query.raw(),
            "marketplaces": reports,
            "offers": offers,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_reports(&query, &reports, &offers);
    Ok(())
}

/// Run one marketplace pipeline over a saved page
pub fn cmd_extract(market: Marketplace, file: &std::path::Path, query: &str, json: bool) -> Result<()> {
    let config = Config::load()?;
    let document = std::fs::read_to_string(file)?;
    let query = Query::new(query);
    let report = run_marketplace(market, Some(&document), &query, &config.pipeline_settings());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let offers = aggregate(
        std::slice::from_ref(&report),
        &config.category_table(),
        &LedgerSnapshot::default(),
        &config.ledger_currency,
    );
    println!(
        "Mode: {:?}, containers: {}, candidates: {}",
        report.mode, report.containers, report.candidates
    );
    print_reports(&query, std::slice::from_ref(&report), &offers);
    Ok(())
}

fn print_reports(query: &Query, reports: &[MarketplaceReport], offers: &[AggregatedOffer]) {
    let color = use_color();
    println!("\nResults for \"{}\":\n", query.raw());

    for report in reports {
        let name = report.marketplace.to_string();
        println!("  {}", if color { name.bold().to_string() } else { name });

        if let Some(reason) = report.empty_reason() {
            let text = format!("no offers ({})", reason.describe());
            println!("    {}\n", if color { text.dimmed().to_string() } else { text });
            continue;
        }

        for offer in offers.iter().filter(|o| o.marketplace == report.marketplace) {
            print_offer(offer, color);
        }
        println!();
    }
}

fn print_offer(offer: &AggregatedOffer, color: bool) {
    let price = if color {
        offer.display_price.green().bold().to_string()
    } else {
        offer.display_price.clone()
    };
    let stock = if offer.in_stock { "" } else { " [out of stock]" };
    println!("    {:>10}  {}{}", price, truncate_str(&offer.title, 70), stock);
    println!("                {}", offer.url);

    let rec = &offer.recommendation;
    if let Some(text) = &rec.rec_text {
        let line = format!("[{}] {}", rec.category, text);
        let line = match (color, rec.rec_type) {
            (true, RecType::Good) => line.green().to_string(),
            (true, RecType::Warn) => line.yellow().to_string(),
            _ => line,
        };
        println!("                {}", line);
    }
}
