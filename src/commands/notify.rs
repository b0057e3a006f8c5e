use chrono::Utc;
use colored::Colorize;

use feescope::analysis::{AnalysisResult, PageMeta, PriceBreakdownEntry};
use feescope::config::{Config, NotifyTarget};
use feescope::error::{FeescopeError, Result};
use feescope::notify::{describe_target, send_notification, NotificationPayload};

/// Set the notification target
pub fn cmd_notify_set(
    ntfy: Option<String>,
    slack: Option<String>,
    discord: Option<String>,
    command: Option<String>,
    disable: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if disable {
        config.enable_notifications = false;
        config.save()?;
        println!("Notifications disabled.");
        return Ok(());
    }

    let target = if let Some(topic) = ntfy {
        // Accept a full topic URL as well as a bare topic
        match topic.rsplit_once('/') {
            Some((server, name)) if topic.starts_with("http") => NotifyTarget::Ntfy {
                topic: name.to_string(),
                server: Some(server.to_string()),
            },
            _ => NotifyTarget::Ntfy { topic, server: None },
        }
    } else if let Some(webhook_url) = slack {
        NotifyTarget::Slack { webhook_url }
    } else if let Some(webhook_url) = discord {
        NotifyTarget::Discord { webhook_url }
    } else if let Some(command) = command {
        NotifyTarget::Command { command }
    } else {
        return Err(FeescopeError::ConfigError(
            "Pass one of --ntfy, --slack, --discord or --command".into(),
        ));
    };

    println!("Notification target: {}", describe_target(&target));
    config.default_notify = Some(target);
    config.enable_notifications = true;
    config.save()?;
    println!("Notification settings saved. Run `feescope notify test` to try it.");
    Ok(())
}

/// Show current notification settings
pub fn cmd_notify_show() -> Result<()> {
    let config = Config::load()?;

    println!("\nNotification Settings\n");

    match &config.default_notify {
        Some(target) => println!("  Target: {}", describe_target(target)),
        None => {
            println!("  No notification target configured.");
            println!("  Run `feescope notify set` to configure notifications.");
        }
    }

    let status = if config.enable_notifications {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("  Status: {}", status);

    if let Ok(path) = Config::config_path() {
        println!("\n  Config file: {}", path.display());
    }

    Ok(())
}

/// Send a test notification
pub fn cmd_notify_test() -> Result<()> {
    let config = Config::load()?;

    let Some(target) = &config.default_notify else {
        println!("\nNo notification target configured.");
        println!("Run `feescope notify set` to configure notifications.");
        return Ok(());
    };

    println!("\nSending test notification...");

    let meta = PageMeta {
        site: "shop.example.com".to_string(),
        page_title: "Test checkout".to_string(),
        currency_symbol: config.default_currency.clone(),
    };
    let sample = AnalysisResult {
        base_price: 499.0,
        delivery_fee: 40.0,
        total: 539.0,
        hidden_charges: 40.0,
        hidden_percentage: 8,
        analyzed_at: Utc::now(),
        breakdown: vec![PriceBreakdownEntry {
            label: "Delivery Fee".to_string(),
            amount: 40.0,
            source_snippet: String::new(),
            is_hidden: true,
        }],
        ..AnalysisResult::empty(&meta)
    };

    match send_notification(target, &NotificationPayload::from_result(&sample)) {
        Ok(()) => println!("  Test notification sent successfully!"),
        Err(e) => println!("  Failed to send notification: {}", e),
    }

    Ok(())
}
