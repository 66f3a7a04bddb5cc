use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

use pricewise::cli::{Cli, CompletionShell};
use pricewise::config::Config;
use pricewise::error::Result;

/// Print the effective configuration
pub fn cmd_config_show() -> Result<()> {
    let config = Config::load()?;
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn cmd_config_path() -> Result<()> {
    let config_path = Config::config_path()?;
    let exists = if config_path.exists() { "" } else { " (not created, using defaults)" };
    println!("Config: {}{}", config_path.display(), exists);
    println!("Ledger: {}", Config::db_path()?.display());
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "pricewise", &mut io::stdout());
    Ok(())
}
