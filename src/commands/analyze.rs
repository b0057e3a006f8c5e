use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;

use feescope::analysis::{analyze_document, AnalysisError, AnalysisResult, EngineMessage, PageMeta};
use feescope::config::{Config, NotifyTarget};
use feescope::db::{Store, Transaction};
use feescope::error::{FeescopeError, Result};
use feescope::fetch::PageSource;
use feescope::monitor::{self, MonitorOptions, ResultSink};
use feescope::node::HtmlDocument;
use feescope::notify::{describe_target, send_notification, NotificationPayload};
use feescope::payment::{payment_options, suggest_cheaper_method, PaymentSuggestion};

use crate::utils::{money, parse_linger, truncate_str};

/// Prints results, records them, and forwards the first disclosure
struct Reporter {
    json: bool,
    store: Store,
    record_scans: bool,
    save: bool,
    max_history: usize,
    notify: Option<NotifyTarget>,
}

impl Reporter {
    fn new(config: &Config, json: bool, save: bool, record_scans: bool) -> Result<Self> {
        let notify = if config.enable_notifications {
            config.default_notify.clone()
        } else {
            None
        };
        Ok(Self {
            json,
            store: Store::open()?,
            record_scans,
            save,
            max_history: config.max_history_items,
            notify,
        })
    }

    fn print_message(&self, message: &EngineMessage) -> Result<()> {
        write_message(&mut io::stdout().lock(), message)
    }
}

/// One JSON line per message; a closed stdout is a sink failure
fn write_message<W: Write>(out: &mut W, message: &EngineMessage) -> Result<()> {
    let line = serde_json::to_string(message)?;
    writeln!(out, "{}", line)
        .and_then(|_| out.flush())
        .map_err(|e| FeescopeError::SinkError(format!("could not write result: {}", e)))
}

impl ResultSink for Reporter {
    fn publish(&mut self, result: &AnalysisResult) -> Result<()> {
        if self.record_scans {
            self.store.record_scan(result)?;
        }
        let saved = if self.save && result.has_pricing() {
            Some(self.store.save_transaction(result, self.max_history)?)
        } else {
            None
        };

        if self.json {
            self.print_message(&EngineMessage::HiddenFeesDetected(result.clone()))
        } else {
            print_result(result, saved.as_ref());
            Ok(())
        }
    }

    fn publish_error(&mut self, error: &AnalysisError) {
        if self.json {
            if let Err(e) = self.print_message(&EngineMessage::AnalysisError(error.clone())) {
                eprintln!("{}: {}", "output error".red(), e);
            }
        } else {
            println!("\n{}: {}", "analysis error".red(), error.error);
        }
    }

    fn disclose(&mut self, result: &AnalysisResult) {
        let Some(target) = &self.notify else {
            return;
        };
        let payload = NotificationPayload::from_result(result);
        match send_notification(target, &payload) {
            Ok(()) => {
                if !self.json {
                    println!("  {} Notified {}", "✓".green(), describe_target(target));
                }
            }
            Err(e) => eprintln!("  {}: {}", "notification failed".red(), e),
        }
    }
}

fn print_line(label: &str, symbol: &str, amount: f64) {
    if amount > 0.0 {
        println!("  {:<18} {:>12}", label, money(symbol, amount));
    }
}

/// Render one result for humans
fn print_result(result: &AnalysisResult, saved: Option<&Transaction>) {
    let title = if result.page_title.is_empty() {
        String::new()
    } else {
        format!(" ({})", truncate_str(&result.page_title, 50))
    };
    println!("\n{} {}{}", "Checkout".cyan().bold(), result.site, title.dimmed());

    if !result.has_pricing() {
        println!("  {}", "No pricing information detected.".dimmed());
        return;
    }

    let sym = &result.currency_symbol;
    println!("{}", "─".repeat(40).dimmed());
    print_line("Base price", sym, result.base_price);
    print_line("Delivery fee", sym, result.delivery_fee);
    print_line("Convenience fee", sym, result.convenience_fee);
    print_line("Taxes", sym, result.taxes);
    print_line("Other fees", sym, result.other_fees);
    println!("{}", "─".repeat(40).dimmed());
    println!("{}", format!("  {:<18} {:>12}", "Total", money(sym, result.total)).bold());

    if result.hidden_charges > 0.0 {
        println!(
            "\n  {} {} ({}%) on top of the listed price",
            "Hidden charges:".red().bold(),
            money(sym, result.hidden_charges),
            result.hidden_percentage
        );
    } else {
        println!("\n  {}", "No hidden charges.".green());
    }

    if let Some(tx) = saved {
        println!("  Saved as {}", tx.id.to_string()[..8].dimmed());
    }
}

fn print_suggestion(suggestion: &PaymentSuggestion, symbol: &str) {
    println!(
        "\n  {} Paying with {} instead of {} saves {}",
        "Tip:".yellow().bold(),
        suggestion.better,
        suggestion.current,
        money(symbol, suggestion.savings)
    );
}

/// Run a single immediate analysis pass
pub fn cmd_analyze(
    source: &str,
    site: Option<String>,
    json: bool,
    save: bool,
    record_scans: bool,
) -> Result<()> {
    let config = Config::load()?;
    let source = PageSource::parse(source)?;
    let site = site.unwrap_or_else(|| source.default_site());
    let page = source.load()?;
    let doc = HtmlDocument::parse(&page.html);

    let mut reporter = Reporter::new(&config, json, save, record_scans)?;
    let result = analyze_document(&doc, &site, &config.rules, &config.default_currency);

    match reporter.publish(&result) {
        Ok(()) => {
            if result.is_noteworthy() {
                reporter.disclose(&result);
            }
        }
        Err(e) => {
            let meta = PageMeta::from_document(&doc, &site, &config.default_currency);
            reporter.publish_error(&AnalysisError::new(&meta, &e));
        }
    }

    if !json {
        if let Some(suggestion) = suggest_cheaper_method(&payment_options(&doc.root())) {
            print_suggestion(&suggestion, &result.currency_symbol);
        }
        println!();
    }

    Ok(())
}

/// Watch a page until it settles, re-analyzing on significant changes
pub fn cmd_monitor(
    source: &str,
    site: Option<String>,
    json: bool,
    save: bool,
    linger: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let mut source = PageSource::parse(source)?;
    if matches!(source, PageSource::Stdin) {
        return Err(FeescopeError::SourceError(
            "stdin yields a single snapshot; use `feescope analyze -` instead".into(),
        ));
    }

    let linger = match linger {
        Some(s) => parse_linger(&s)?,
        None => config.timing.linger(),
    };
    let options = MonitorOptions {
        site: site.unwrap_or_else(|| source.default_site()),
        trigger: config.timing.trigger_config(),
        mutation_scan: config.timing.mutation_scan(),
        linger,
        rules: config.rules.clone(),
        default_currency: config.default_currency.clone(),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| FeescopeError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    if !json {
        println!("\n{} {}", "Monitoring".cyan().bold(), options.site);
        println!("Press {} to stop", "Ctrl+C".yellow());
    }

    let mut reporter = Reporter::new(&config, json, save, true)?;
    let report = monitor::run(&mut source, &mut reporter, &options, &running)?;

    if !json {
        let ending = if report.interrupted { "stopped" } else { "settled" };
        println!(
            "\n{} after {} pass{}",
            ending.dimmed(),
            report.passes,
            if report.passes == 1 { "" } else { "es" }
        );
    }

    Ok(())
}
