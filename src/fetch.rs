use std::time::Duration;

use tracing::{debug, warn};

use crate::config::FetchSettings;
use crate::error::{PricewiseError, Result};
use crate::marketplace::Marketplace;
use crate::pipeline::DocumentSource;
use crate::validate::Query;

/// Scraping proxy that renders pages for sites blocking plain clients
const SCRAPER_API_ENDPOINT: &str = "http://api.scraperapi.com";

/// Pages shorter than this are error stubs, not results
const MIN_DOCUMENT_BYTES: usize = 512;

/// Fetches marketplace search pages over HTTP
pub struct HttpSource {
    agent: ureq::Agent,
    user_agent: String,
    scraper_api_key: Option<String>,
}

impl HttpSource {
    pub fn new(settings: &FetchSettings) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            user_agent: settings.user_agent.clone(),
            scraper_api_key: settings.scraper_api_key.clone(),
        }
    }

    /// URL actually requested: the search page, or the proxy wrapping it
    pub fn request_url(&self, marketplace: Marketplace, query: &Query) -> String {
        let target = marketplace.search_url(query);
        match &self.scraper_api_key {
            Some(key) if marketplace.dialect().via_proxy => format!(
                "{}?api_key={}&url={}",
                SCRAPER_API_ENDPOINT,
                urlencoding::encode(key),
                urlencoding::encode(&target)
            ),
            _ => target,
        }
    }

    /// Fetch a page body
    pub fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Accept", "text/html,application/xhtml+xml")
            .call()?;
        let html = response.into_body().read_to_string()?;

        if html.len() < MIN_DOCUMENT_BYTES {
            return Err(PricewiseError::FetchError(format!(
                "response too short ({} bytes)",
                html.len()
            )));
        }
        Ok(html)
    }
}

impl DocumentSource for HttpSource {
    fn fetch_document(&self, marketplace: Marketplace, query: &Query) -> Option<String> {
        let url = self.request_url(marketplace, query);
        debug!("{}: fetching {}", marketplace, marketplace.search_url(query));

        match self.fetch_page(&url) {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("{}: fetch failed: {}", marketplace, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_without_proxy() {
        let source = HttpSource::new(&FetchSettings::default());
        let query = Query::new("iphone 15");
        assert_eq!(
            source.request_url(Marketplace::Ebay, &query),
            "https://www.ebay.com/sch/i.html?_nkw=iphone+15&_ipg=50"
        );
    }

    #[test]
    fn test_request_url_with_proxy_only_where_needed() {
        let settings = FetchSettings {
            scraper_api_key: Some("k3y".into()),
            ..FetchSettings::default()
        };
        let source = HttpSource::new(&settings);
        let query = Query::new("iphone 15");

        let ebay = source.request_url(Marketplace::Ebay, &query);
        assert!(ebay.starts_with("http://api.scraperapi.com?api_key=k3y&url=https%3A%2F%2Fwww.ebay.com"));
        assert_eq!(
            source.request_url(Marketplace::Amazon, &query),
            "https://www.amazon.in/s?k=iphone+15"
        );
    }
}
