use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::marketplace::Marketplace;

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "pricewise")]
#[command(author, version, about = "Compare marketplace prices and check them against your budget", long_about = None)]
#[command(after_help = r#"Examples:
  pricewise compare "iphone 15"                     Compare across all marketplaces
  pricewise compare "iphone 15" -m amazon -m ebay   Only some marketplaces
  pricewise extract flipkart saved.html "iphone 15" Run one marketplace on a saved page
  pricewise expense add 799 --category Electronics  Record a purchase
  pricewise budget set Electronics 50000            Monthly budget for a category
"#)]
pub struct Cli {
    /// Show diagnostic logs (extraction modes, dropped listings)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare prices for a product across marketplaces
    Compare {
        /// Product to search for
        query: String,

        /// Marketplace to include (repeatable; default from config)
        #[arg(short, long = "market", value_enum)]
        markets: Vec<Marketplace>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Skip ledger-based recommendations
        #[arg(long)]
        no_ledger: bool,
    },

    /// Run one marketplace pipeline on a saved results page
    Extract {
        /// Marketplace whose markup the page uses
        #[arg(value_enum)]
        market: Marketplace,

        /// Saved HTML file
        file: PathBuf,

        /// Product that was searched for
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage recorded expenses
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Manage monthly category budgets
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Amount spent
        amount: f64,

        /// Spending category
        #[arg(short, long, default_value = "Other")]
        category: String,

        /// Date (YYYY-MM-DD), default today
        #[arg(short, long)]
        date: Option<String>,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,

        /// Payment method (cash, card, UPI, ...)
        #[arg(short, long)]
        payment: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change fields of an expense
    Edit {
        /// Expense id
        id: i64,

        #[arg(long)]
        amount: Option<f64>,

        #[arg(short, long)]
        category: Option<String>,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        note: Option<String>,

        #[arg(short, long)]
        payment: Option<String>,
    },

    /// Delete an expense
    Delete {
        /// Expense id
        id: i64,
    },

    /// Totals by category and by month
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set the monthly budget of a category
    Set {
        category: String,
        limit: f64,
    },

    /// Show budgets with this month's spending
    List {
        /// Month (YYYY-MM), default current
        #[arg(long)]
        month: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print config and ledger file locations
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compare_with_markets() {
        let cli = Cli::parse_from(["pricewise", "compare", "iphone 15", "-m", "ebay", "-m", "flipkart", "--json"]);
        match cli.command {
            Commands::Compare { query, markets, json, no_ledger } => {
                assert_eq!(query, "iphone 15");
                assert_eq!(markets, vec![Marketplace::Ebay, Marketplace::Flipkart]);
                assert!(json);
                assert!(!no_ledger);
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["pricewise", "budget", "list", "-v"]);
        assert!(cli.verbose);
    }
}
