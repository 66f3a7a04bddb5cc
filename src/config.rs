use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::aggregate::{default_category_rules, CategoryRule, CategoryTable, DEFAULT_CATEGORY};
use crate::error::{PricewiseError, Result};
use crate::marketplace::Marketplace;
use crate::pipeline::PipelineSettings;
use crate::rank::DEFAULT_TOP_K;
use crate::validate::{MainMatchPolicy, RelevanceRules, DEFAULT_DENY_LIST};

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Browser-like User-Agent; marketplaces serve stripped pages to bots
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Global pricewise configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Offers kept per marketplace
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Marketplaces compared when none are given on the command line
    #[serde(default = "default_marketplaces")]
    pub marketplaces: Vec<Marketplace>,

    /// Title terms that mark accessories and bundles
    #[serde(default = "default_deny_list")]
    pub deny_list: Vec<String>,

    /// Category used when no keyword matches
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Currency symbol used in ledger recommendations
    #[serde(default = "default_ledger_currency")]
    pub ledger_currency: String,

    /// Per-marketplace main-match policy, keyed by marketplace id
    #[serde(default)]
    pub main_match: HashMap<String, MainMatchPolicy>,

    #[serde(default)]
    pub fetch: FetchSettings,

    /// Keyword table for category inference, first match wins
    #[serde(default = "default_category_rules")]
    pub categories: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Scraping proxy key for marketplaces that block direct requests
    #[serde(default)]
    pub scraper_api_key: Option<String>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_marketplaces() -> Vec<Marketplace> {
    Marketplace::ALL.to_vec()
}

fn default_deny_list() -> Vec<String> {
    DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_ledger_currency() -> String {
    "₹".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            scraper_api_key: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            marketplaces: default_marketplaces(),
            deny_list: default_deny_list(),
            default_category: default_category(),
            ledger_currency: default_ledger_currency(),
            main_match: HashMap::new(),
            fetch: FetchSettings::default(),
            categories: default_category_rules(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        if let Ok(key) = std::env::var("PRICEWISE_SCRAPER_API_KEY") {
            if !key.trim().is_empty() {
                config.fetch.scraper_api_key = Some(key.trim().to_string());
            }
        }
        Ok(config)
    }

    /// Parse and check a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(PricewiseError::ConfigError("top_k must be at least 1".into()));
        }
        for key in self.main_match.keys() {
            key.parse::<Marketplace>()
                .map_err(|_| PricewiseError::ConfigError(format!("unknown marketplace in main_match: {}", key)))?;
        }
        if self.fetch.timeout_secs == 0 {
            return Err(PricewiseError::ConfigError("fetch.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PricewiseError::ConfigError(e.to_string()))
    }

    /// Settings for the marketplace pipelines
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let main_match = self
            .main_match
            .iter()
            .filter_map(|(key, policy)| key.parse::<Marketplace>().ok().map(|m| (m, *policy)))
            .collect();

        PipelineSettings {
            rules: RelevanceRules::new(&self.deny_list),
            top_k: self.top_k,
            main_match,
        }
    }

    pub fn category_table(&self) -> CategoryTable {
        CategoryTable::new(self.categories.clone(), &self.default_category)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "pricewise")
            .ok_or_else(|| PricewiseError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "pricewise")
            .ok_or_else(|| PricewiseError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the ledger database path
    ///
    /// Supports PRICEWISE_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("PRICEWISE_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("ledger.db"))
    }
}
