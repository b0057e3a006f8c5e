use colored::Colorize;
use inquire::Confirm;

use feescope::db::Store;
use feescope::error::{FeescopeError, Result};

use crate::utils::{money, truncate_str};

/// Show saved transactions, newest first
pub fn cmd_history(limit: usize, json: bool) -> Result<()> {
    let store = Store::open()?;
    let transactions = store.list_transactions(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No saved transactions. Run `feescope analyze <page> --save` to record one.");
        return Ok(());
    }

    println!("\nSaved transactions:\n");
    for tx in &transactions {
        let r = &tx.result;
        let hidden = if r.hidden_charges > 0.0 {
            format!("+{} ({}%)", money(&r.currency_symbol, r.hidden_charges), r.hidden_percentage)
                .red()
                .to_string()
        } else {
            "no hidden fees".green().to_string()
        };
        println!(
            "  {} | {} | {} | total {} | {}",
            tx.id.to_string()[..8].dimmed(),
            tx.recorded_at.format("%Y-%m-%d %H:%M"),
            truncate_str(&r.site, 30),
            money(&r.currency_symbol, r.total),
            hidden
        );
        println!("    {}", tx.categories.join(", ").dimmed());
    }
    println!();

    Ok(())
}

/// Delete one saved transaction
pub fn cmd_forget(id: &str) -> Result<()> {
    let store = Store::open()?;
    let deleted = store.delete_transaction(id)?;
    println!("Deleted transaction {}", deleted);
    Ok(())
}

/// Delete all history and analytics
pub fn cmd_clear(skip_confirm: bool) -> Result<()> {
    if !skip_confirm {
        let confirm = Confirm::new("Delete all saved transactions and analytics?")
            .with_default(false)
            .prompt()
            .map_err(|e| FeescopeError::ConfigError(e.to_string()))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let store = Store::open()?;
    store.clear_history()?;
    println!("History cleared.");
    Ok(())
}

/// Show hidden-fee analytics
pub fn cmd_stats(json: bool) -> Result<()> {
    let store = Store::open()?;
    let analytics = store.analytics()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    if analytics.total_scans == 0 {
        println!("No scans recorded yet.");
        return Ok(());
    }

    println!("\n{}\n", "Hidden-fee analytics".bold());
    println!("  Scans:                  {}", analytics.total_scans);
    println!("  Hidden fees found:      {}", feescope::price::format_amount(analytics.total_hidden_fees));
    println!("  Average hidden share:   {}%", analytics.average_hidden_percentage);

    if !analytics.top_offending_sites.is_empty() {
        println!("\n  {}", "Top offending sites".bold());
        for site in &analytics.top_offending_sites {
            println!(
                "    {:<30} {:>4} scans  {:>10}  avg {}%",
                truncate_str(&site.site, 30),
                site.count,
                feescope::price::format_amount(site.total_fees),
                site.average_percentage
            );
        }
    }

    if !analytics.scans_by_month.is_empty() {
        println!("\n  {}", "Scans by month".bold());
        for (month, count) in &analytics.scans_by_month {
            println!("    {}  {}", month, count);
        }
    }
    println!();

    Ok(())
}
