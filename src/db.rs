use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::config::Config;
use crate::error::{FeescopeError, Result};

/// Sites listed in analytics
const TOP_SITES_LIMIT: usize = 5;

/// Safely convert a Unix timestamp to DateTime<Utc>, falling back to current time if invalid
fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// A saved analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// Per-site hidden-fee statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub site: String,
    pub count: u64,
    pub total_fees: f64,
    pub average_percentage: u32,
}

/// Aggregates over every recorded scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_scans: u64,
    pub total_hidden_fees: f64,
    pub average_hidden_percentage: u32,
    /// Sites with hidden charges, worst first
    pub top_offending_sites: Vec<SiteStats>,
    /// Scan counts keyed by `YYYY-MM`
    pub scans_by_month: BTreeMap<String, u64>,
}

/// Tag a result with site and fee classes
pub fn categorize(result: &AnalysisResult) -> Vec<String> {
    let site = result.site.to_lowercase();
    let has_any = |needles: &[&str]| needles.iter().any(|n| site.contains(n));

    let mut categories = Vec::new();
    if has_any(&["amazon", "flipkart", "myntra"]) {
        categories.push("E-commerce");
    }
    if has_any(&["zomato", "swiggy"]) || (site.contains("uber") && site.contains("eats")) {
        categories.push("Food Delivery");
    }
    if has_any(&["makemytrip", "goibibo", "booking", "airbnb"]) {
        categories.push("Travel");
    }
    if has_any(&["bookmyshow", "netflix", "spotify"]) {
        categories.push("Entertainment");
    }

    if result.convenience_fee > 0.0 {
        categories.push("Convenience Fee");
    }
    if result.delivery_fee > 0.0 {
        categories.push("Delivery Fee");
    }
    if result.taxes > 0.0 {
        categories.push("Taxes");
    }

    if categories.is_empty() {
        categories.push("Other");
    }
    categories.into_iter().map(String::from).collect()
}

/// History and analytics store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the database
    pub fn open() -> Result<Self> {
        let db_path = Config::db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&db_path)?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self { conn })
    }

    // ========== Scan operations ==========

    /// Record an emitted result for analytics
    pub fn record_scan(&self, result: &AnalysisResult) -> Result<()> {
        self.conn.execute(
            "INSERT INTO scans (site, hidden_charges, hidden_percentage, scanned_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                result.site,
                result.hidden_charges,
                result.hidden_percentage as i64,
                result.analyzed_at.timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Aggregate every recorded scan
    pub fn analytics(&self) -> Result<Analytics> {
        let (total_scans, total_hidden_fees, avg_pct): (i64, f64, Option<f64>) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hidden_charges), 0.0), AVG(hidden_percentage) FROM scans",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT site, COUNT(*), SUM(hidden_charges), AVG(hidden_percentage)
             FROM scans WHERE hidden_charges > 0
             GROUP BY site ORDER BY SUM(hidden_charges) DESC, site ASC LIMIT ?1",
        )?;
        let sites = stmt.query_map(params![TOP_SITES_LIMIT as i64], |row| {
            Ok(SiteStats {
                site: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
                total_fees: row.get(2)?,
                average_percentage: row.get::<_, f64>(3)?.round() as u32,
            })
        })?;
        let top_offending_sites = sites.collect::<std::result::Result<Vec<_>, _>>()?;

        let mut scans_by_month = BTreeMap::new();
        let mut stmt = self.conn.prepare("SELECT scanned_at FROM scans")?;
        let stamps = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        for stamp in stamps {
            let month = timestamp_to_datetime(stamp?).format("%Y-%m").to_string();
            *scans_by_month.entry(month).or_insert(0) += 1;
        }

        Ok(Analytics {
            total_scans: total_scans as u64,
            total_hidden_fees,
            average_hidden_percentage: avg_pct.map(|p| p.round() as u32).unwrap_or(0),
            top_offending_sites,
            scans_by_month,
        })
    }

    // ========== Transaction operations ==========

    /// Save a result to history, keeping only the newest `max_items`
    pub fn save_transaction(&self, result: &AnalysisResult, max_items: usize) -> Result<Transaction> {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            categories: categorize(result),
            result: result.clone(),
        };

        self.conn.execute(
            "INSERT INTO transactions (id, recorded_at, analyzed_at, site, page_title, base_price,
             delivery_fee, convenience_fee, taxes, other_fees, total, hidden_charges,
             hidden_percentage, currency_symbol, categories, breakdown)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                transaction.id.to_string(),
                transaction.recorded_at.timestamp(),
                result.analyzed_at.timestamp(),
                result.site,
                result.page_title,
                result.base_price,
                result.delivery_fee,
                result.convenience_fee,
                result.taxes,
                result.other_fees,
                result.total,
                result.hidden_charges,
                result.hidden_percentage as i64,
                result.currency_symbol,
                serde_json::to_string(&transaction.categories)?,
                serde_json::to_string(&result.breakdown)?,
            ],
        )?;

        self.conn.execute(
            "DELETE FROM transactions WHERE id NOT IN (
                SELECT id FROM transactions ORDER BY recorded_at DESC, rowid DESC LIMIT ?1
             )",
            params![max_items as i64],
        )?;

        Ok(transaction)
    }

    /// Saved transactions, newest first
    pub fn list_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recorded_at, analyzed_at, site, page_title, base_price, delivery_fee,
             convenience_fee, taxes, other_fees, total, hidden_charges, hidden_percentage,
             currency_symbol, categories, breakdown
             FROM transactions ORDER BY recorded_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let id: String = row.get(0)?;
            let categories: String = row.get(14)?;
            let breakdown: String = row.get(15)?;
            Ok(Transaction {
                id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
                recorded_at: timestamp_to_datetime(row.get(1)?),
                categories: serde_json::from_str(&categories).unwrap_or_default(),
                result: AnalysisResult {
                    analyzed_at: timestamp_to_datetime(row.get(2)?),
                    site: row.get(3)?,
                    page_title: row.get(4)?,
                    base_price: row.get(5)?,
                    delivery_fee: row.get(6)?,
                    convenience_fee: row.get(7)?,
                    taxes: row.get(8)?,
                    other_fees: row.get(9)?,
                    total: row.get(10)?,
                    hidden_charges: row.get(11)?,
                    hidden_percentage: row.get::<_, i64>(12)? as u32,
                    currency_symbol: row.get(13)?,
                    breakdown: serde_json::from_str(&breakdown).unwrap_or_default(),
                },
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Delete a transaction by full id or unique id prefix
    pub fn delete_transaction(&self, id_or_prefix: &str) -> Result<Uuid> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM transactions WHERE id = ?1 OR id LIKE ?1 || '%'")?;
        let ids = stmt
            .query_map(params![id_or_prefix], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let id = match ids.as_slice() {
            [only] => only.clone(),
            [] => return Err(FeescopeError::TransactionNotFound(id_or_prefix.to_string())),
            _ => {
                return Err(FeescopeError::TransactionNotFound(format!(
                    "{} (prefix matches {} transactions)",
                    id_or_prefix,
                    ids.len()
                )))
            }
        };

        self.conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        Ok(Uuid::parse_str(&id).unwrap_or_default())
    }

    /// Remove all history and analytics
    pub fn clear_history(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM transactions; DELETE FROM scans;")?;
        Ok(())
    }
}
