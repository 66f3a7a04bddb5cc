//! pricewise - compare marketplace prices against your own spending

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pricewise::cli::{BudgetCommands, Cli, Commands, ConfigCommands, ExpenseCommands};
use pricewise::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\nHint: {}", hint);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--json` output stays clean
fn init_logging(verbose: bool) {
    let default = if verbose { "warn,pricewise=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compare {
            query,
            markets,
            json,
            no_ledger,
        } => commands::cmd_compare(&query, markets, json, no_ledger),

        Commands::Extract {
            market,
            file,
            query,
            json,
        } => commands::cmd_extract(market, &file, &query, json),

        Commands::Expense(cmd) => match cmd {
            ExpenseCommands::Add {
                amount,
                category,
                date,
                note,
                payment,
            } => commands::cmd_expense_add(amount, &category, date, note, payment),
            ExpenseCommands::List { json } => commands::cmd_expense_list(json),
            ExpenseCommands::Edit {
                id,
                amount,
                category,
                date,
                note,
                payment,
            } => commands::cmd_expense_edit(id, amount, category, date, note, payment),
            ExpenseCommands::Delete { id } => commands::cmd_expense_delete(id),
            ExpenseCommands::Summary { json } => commands::cmd_expense_summary(json),
        },

        Commands::Budget(cmd) => match cmd {
            BudgetCommands::Set { category, limit } => commands::cmd_budget_set(&category, limit),
            BudgetCommands::List { month, json } => commands::cmd_budget_list(month, json),
        },

        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::cmd_config_show(),
            ConfigCommands::Path => commands::cmd_config_path(),
        },

        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
