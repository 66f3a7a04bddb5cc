use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::aggregate::Ledger;
use crate::config::Config;
use crate::error::{PricewiseError, Result};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const FALLBACK_LABEL: &str = "Other";

/// `YYYY-MM` key of a date
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

pub fn current_month() -> String {
    month_key(Local::now().date_naive())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| PricewiseError::InvalidDate(text.to_string()))
}

/// A recorded expense
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub note: String,
    pub payment_method: String,
}

/// Fields of an expense before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub note: String,
    pub payment_method: String,
}

impl NewExpense {
    /// Validate and fill defaults: blank category or payment method become "Other"
    pub fn new(
        date: NaiveDate,
        category: &str,
        amount: f64,
        note: Option<&str>,
        payment_method: Option<&str>,
    ) -> Result<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PricewiseError::InvalidAmount(amount.to_string()));
        }
        let label = |s: &str| {
            let s = s.trim();
            if s.is_empty() {
                FALLBACK_LABEL.to_string()
            } else {
                s.to_string()
            }
        };
        Ok(Self {
            date,
            category: label(category),
            amount,
            note: note.unwrap_or("").trim().to_string(),
            payment_method: label(payment_method.unwrap_or("")),
        })
    }
}

/// A budget with this month's spending against it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub category: String,
    pub monthly_limit: f64,
    pub spent: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total: f64,
    pub by_category: Vec<CategoryTotal>,
    pub by_month: Vec<MonthTotal>,
}

/// Expense ledger connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the ledger at the configured location
    pub fn open() -> Result<Self> {
        Self::open_at(&Config::db_path()?)
    }

    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(db_path)?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory ledger
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self { conn })
    }

    // ========== Expense operations ==========

    pub fn insert_expense(&self, expense: &NewExpense) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO expenses (date, category, amount, note, payment_method)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                expense.date.format(DATE_FORMAT).to_string(),
                expense.category,
                expense.amount,
                expense.note,
                expense.payment_method,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, category, amount, note, payment_method FROM expenses WHERE id = ?1",
                params![id],
                expense_row,
            )
            .optional()?;
        row.map(into_expense).transpose()
    }

    /// All expenses, newest first
    pub fn list_expenses(&self) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, category, amount, note, payment_method
             FROM expenses ORDER BY date DESC, id DESC",
        )?;
        let rows = stmt.query_map([], expense_row)?;

        let mut expenses = Vec::new();
        for row in rows {
            expenses.push(into_expense(row?)?);
        }
        Ok(expenses)
    }

    pub fn update_expense(&self, id: i64, expense: &NewExpense) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE expenses SET date = ?1, category = ?2, amount = ?3, note = ?4, payment_method = ?5
             WHERE id = ?6",
            params![
                expense.date.format(DATE_FORMAT).to_string(),
                expense.category,
                expense.amount,
                expense.note,
                expense.payment_method,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(PricewiseError::ExpenseNotFound(id));
        }
        Ok(())
    }

    pub fn delete_expense(&self, id: i64) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(PricewiseError::ExpenseNotFound(id));
        }
        Ok(())
    }

    pub fn total_spent(&self) -> Result<f64> {
        let total: f64 = self
            .conn
            .query_row("SELECT COALESCE(SUM(amount), 0) FROM expenses", [], |row| row.get(0))?;
        Ok(total)
    }

    // ========== Budget operations ==========

    /// Create or replace the monthly budget of a category
    pub fn upsert_budget(&self, category: &str, monthly_limit: f64) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(PricewiseError::ConfigError("budget category cannot be empty".into()));
        }
        if !monthly_limit.is_finite() || monthly_limit < 0.0 {
            return Err(PricewiseError::InvalidAmount(monthly_limit.to_string()));
        }
        self.conn.execute(
            "INSERT INTO budgets (category, monthly_limit) VALUES (?1, ?2)
             ON CONFLICT(category) DO UPDATE SET monthly_limit = excluded.monthly_limit",
            params![category, monthly_limit],
        )?;
        Ok(())
    }

    /// Budgets with spending for the given `YYYY-MM` month
    pub fn list_budgets(&self, month: &str) -> Result<Vec<BudgetStatus>> {
        let spent = self.month_spend_by_category(month)?;
        let mut stmt = self
            .conn
            .prepare("SELECT category, monthly_limit FROM budgets ORDER BY category")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;

        let mut budgets = Vec::new();
        for row in rows {
            let (category, monthly_limit) = row?;
            let spent = spent.get(&category).copied().unwrap_or(0.0);
            budgets.push(BudgetStatus {
                remaining: (monthly_limit - spent).max(0.0),
                category,
                monthly_limit,
                spent,
            });
        }
        Ok(budgets)
    }

    // ========== Reports ==========

    pub fn summary(&self) -> Result<LedgerSummary> {
        let mut stmt = self.conn.prepare(
            "SELECT category, SUM(amount), COUNT(*) FROM expenses
             GROUP BY category ORDER BY SUM(amount) DESC, category",
        )?;
        let by_category = stmt
            .query_map([], |row| {
                Ok(CategoryTotal {
                    category: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT substr(date, 1, 7) AS month, SUM(amount) FROM expenses
             GROUP BY month ORDER BY month",
        )?;
        let by_month = stmt
            .query_map([], |row| {
                Ok(MonthTotal {
                    month: row.get(0)?,
                    total: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(LedgerSummary {
            total: self.total_spent()?,
            by_category,
            by_month,
        })
    }

    fn values_by_category(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<HashMap<String, f64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        let mut map = HashMap::new();
        for row in rows {
            let (category, value) = row?;
            map.insert(category, value);
        }
        Ok(map)
    }
}

impl Ledger for Database {
    fn category_averages(&self) -> Result<HashMap<String, f64>> {
        self.values_by_category("SELECT category, AVG(amount) FROM expenses GROUP BY category", &[])
    }

    fn month_spend_by_category(&self, month: &str) -> Result<HashMap<String, f64>> {
        self.values_by_category(
            "SELECT category, SUM(amount) FROM expenses WHERE substr(date, 1, 7) = ?1 GROUP BY category",
            &[&month],
        )
    }

    fn budgets(&self) -> Result<HashMap<String, f64>> {
        self.values_by_category("SELECT category, monthly_limit FROM budgets", &[])
    }
}

type ExpenseRow = (i64, String, String, f64, String, String);

fn expense_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_expense((id, date, category, amount, note, payment_method): ExpenseRow) -> Result<Expense> {
    Ok(Expense {
        id,
        date: parse_date(&date)?,
        category,
        amount,
        note,
        payment_method,
    })
}
