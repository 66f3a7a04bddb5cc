//! Live tests against real marketplaces
//! These tests require network access and only report what they see

use pricewise::config::FetchSettings;
use pricewise::fetch::HttpSource;
use pricewise::marketplace::Marketplace;
use pricewise::pipeline::{run_marketplace, DocumentSource, PipelineSettings};
use pricewise::validate::Query;

fn report_live(marketplace: Marketplace, query: &str) {
    println!("\n=== {} / \"{}\" ===", marketplace, query);

    let source = HttpSource::new(&FetchSettings::default());
    let query = Query::new(query);
    let document = source.fetch_document(marketplace, &query);
    match &document {
        Some(html) => println!("  Fetched {} bytes", html.len()),
        None => println!("  FETCH FAILED"),
    }

    let report = run_marketplace(marketplace, document.as_deref(), &query, &PipelineSettings::default());
    println!(
        "  Mode: {:?}, containers: {}, candidates: {}",
        report.mode, report.containers, report.candidates
    );
    if let Some(reason) = report.empty_reason() {
        println!("  Empty: {}", reason.describe());
    }
    let dialect = marketplace.dialect();
    for listing in report.listings() {
        println!("    {:>10}  {}", dialect.format_price(listing.price), listing.title);
        println!("                {}", listing.url);
    }
}

#[test]
#[ignore] // Run with: cargo test live -- --ignored --nocapture
fn test_live_amazon() {
    report_live(Marketplace::Amazon, "iphone 15");
}

#[test]
#[ignore]
fn test_live_flipkart() {
    report_live(Marketplace::Flipkart, "iphone 15");
}

#[test]
#[ignore]
fn test_live_ebay() {
    report_live(Marketplace::Ebay, "iphone 15");
}

#[test]
#[ignore]
fn test_live_aliexpress() {
    report_live(Marketplace::Aliexpress, "tws earphones");
}

#[test]
#[ignore]
fn test_live_snapdeal() {
    report_live(Marketplace::Snapdeal, "water bottle");
}
