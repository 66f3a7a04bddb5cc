use chrono::Local;
use colored::Colorize;

use pricewise::db::{current_month, parse_date, Database, NewExpense};
use pricewise::error::{PricewiseError, Result};

use crate::utils::{truncate_str, use_color};

/// Record an expense
pub fn cmd_expense_add(
    amount: f64,
    category: &str,
    date: Option<String>,
    note: Option<String>,
    payment: Option<String>,
) -> Result<()> {
    let date = match date {
        Some(d) => parse_date(&d)?,
        None => Local::now().date_naive(),
    };
    let expense = NewExpense::new(date, category, amount, note.as_deref(), payment.as_deref())?;
    let db = Database::open()?;
    let id = db.insert_expense(&expense)?;
    println!("Recorded expense #{}: {:.2} in {} on {}", id, expense.amount, expense.category, expense.date);
    Ok(())
}

pub fn cmd_expense_list(json: bool) -> Result<()> {
    let db = Database::open()?;
    let expenses = db.list_expenses()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&expenses)?);
        return Ok(());
    }

    if expenses.is_empty() {
        println!("No expenses recorded. Run `pricewise expense add` to add one.");
        return Ok(());
    }

    let color = use_color();
    println!("\nExpenses:\n");
    for e in &expenses {
        let id = format!("#{}", e.id);
        println!(
            "  {:>5}  {}  {:>10.2}  {:<12}  {:<8}  {}",
            if color { id.dimmed().to_string() } else { id },
            e.date,
            e.amount,
            truncate_str(&e.category, 12),
            truncate_str(&e.payment_method, 8),
            truncate_str(&e.note, 40)
        );
    }
    println!("\n  Total: {:.2}", db.total_spent()?);
    Ok(())
}

/// Change only the fields that were given
pub fn cmd_expense_edit(
    id: i64,
    amount: Option<f64>,
    category: Option<String>,
    date: Option<String>,
    note: Option<String>,
    payment: Option<String>,
) -> Result<()> {
    let db = Database::open()?;
    let current = db
        .get_expense(id)?
        .ok_or(PricewiseError::ExpenseNotFound(id))?;

    let date = match date {
        Some(d) => parse_date(&d)?,
        None => current.date,
    };
    let updated = NewExpense::new(
        date,
        category.as_deref().unwrap_or(&current.category),
        amount.unwrap_or(current.amount),
        Some(note.as_deref().unwrap_or(&current.note)),
        Some(payment.as_deref().unwrap_or(&current.payment_method)),
    )?;
    db.update_expense(id, &updated)?;
    println!("Updated expense #{}", id);
    Ok(())
}

pub fn cmd_expense_delete(id: i64) -> Result<()> {
    let db = Database::open()?;
    db.delete_expense(id)?;
    println!("Deleted expense #{}", id);
    Ok(())
}

pub fn cmd_expense_summary(json: bool) -> Result<()> {
    let db = Database::open()?;
    let summary = db.summary()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let color = use_color();
    let heading = |s: &str| if color { s.bold().to_string() } else { s.to_string() };

    println!("\n{}\n", heading("By category"));
    for c in &summary.by_category {
        println!("  {:<16} {:>12.2}  ({} expenses)", c.category, c.total, c.count);
    }
    println!("\n{}\n", heading("By month"));
    for m in &summary.by_month {
        println!("  {:<16} {:>12.2}", m.month, m.total);
    }
    println!("\n  Total: {:.2}", summary.total);
    Ok(())
}

pub fn cmd_budget_set(category: &str, limit: f64) -> Result<()> {
    let db = Database::open()?;
    db.upsert_budget(category, limit)?;
    println!("Budget for {} set to {:.2} per month", category.trim(), limit);
    Ok(())
}

pub fn cmd_budget_list(month: Option<String>, json: bool) -> Result<()> {
    let db = Database::open()?;
    let month = month.unwrap_or_else(current_month);
    let budgets = db.list_budgets(&month)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&budgets)?);
        return Ok(());
    }

    if budgets.is_empty() {
        println!("No budgets set. Run `pricewise budget set <CATEGORY> <LIMIT>`.");
        return Ok(());
    }

    let color = use_color();
    println!("\nBudgets for {}:\n", month);
    for b in &budgets {
        let remaining = format!("{:.2} left", b.remaining);
        let remaining = match (color, b.remaining) {
            (true, r) if r <= 0.0 => remaining.red().to_string(),
            (true, r) if r <= 0.1 * b.monthly_limit => remaining.yellow().to_string(),
            (true, _) => remaining.green().to_string(),
            (false, _) => remaining,
        };
        println!(
            "  {:<16} {:>10.2} / {:<10.2} {}",
            b.category, b.spent, b.monthly_limit, remaining
        );
    }
    Ok(())
}
