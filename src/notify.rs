use std::fs::OpenOptions;
use std::io::Write;
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::analysis::AnalysisResult;
use crate::config::{Config, NotifyTarget};
use crate::error::{FeescopeError, Result};
use crate::price::format_amount;

/// Notification payload sent to all targets
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub site: String,
    pub hidden_charges: f64,
    pub hidden_percentage: u32,
    pub currency_symbol: String,
    pub result: AnalysisResult,
    pub detected_at: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            title: format_notification_title(result),
            message: format_notification_message(result),
            site: result.site.clone(),
            hidden_charges: result.hidden_charges,
            hidden_percentage: result.hidden_percentage,
            currency_symbol: result.currency_symbol.clone(),
            result: result.clone(),
            detected_at: Utc::now(),
        }
    }
}

pub fn format_notification_title(result: &AnalysisResult) -> String {
    if result.hidden_charges > 0.0 {
        "Hidden Fees Detected!".to_string()
    } else {
        "No Hidden Fees Found".to_string()
    }
}

pub fn format_notification_message(result: &AnalysisResult) -> String {
    if result.hidden_charges > 0.0 {
        format!(
            "Extra {}% ({}{}) in hidden charges found on {}",
            result.hidden_percentage,
            result.currency_symbol,
            format_amount(result.hidden_charges),
            result.site
        )
    } else {
        format!(
            "Total of {}{} on {} matches the listed price",
            result.currency_symbol,
            format_amount(result.total),
            result.site
        )
    }
}

fn target_type(target: &NotifyTarget) -> &'static str {
    match target {
        NotifyTarget::Command { .. } => "command",
        NotifyTarget::Ntfy { .. } => "ntfy",
        NotifyTarget::Slack { .. } => "slack",
        NotifyTarget::Discord { .. } => "discord",
    }
}

/// Human-readable description of a target
pub fn describe_target(target: &NotifyTarget) -> String {
    match target {
        NotifyTarget::Command { command } => format!("command: {}", command),
        NotifyTarget::Ntfy { topic, server } => format!(
            "ntfy: {}/{}",
            server.as_deref().unwrap_or("https://ntfy.sh"),
            topic
        ),
        NotifyTarget::Slack { .. } => "slack webhook".to_string(),
        NotifyTarget::Discord { .. } => "discord webhook".to_string(),
    }
}

/// Log notification to file for later review
fn log_notification(payload: &NotificationPayload, target_type: &str) {
    let Ok(data_dir) = Config::data_dir() else {
        return;
    };
    if std::fs::create_dir_all(&data_dir).is_err() {
        return;
    }
    let log_path = data_dir.join("notifications.log");
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let log_entry = format!(
            "\n{}\n{}\nSite: {} | Target: {}\nTitle: {}\n{}\n{}\n",
            "=".repeat(60),
            payload.detected_at.format("%Y-%m-%d %H:%M:%S UTC"),
            payload.site,
            target_type,
            payload.title,
            "-".repeat(40),
            payload.message,
        );
        if let Err(e) = file.write_all(log_entry.as_bytes()) {
            warn!(error = %e, "could not append to notifications.log");
        }
    }
}

/// Send a notification to the specified target
pub fn send_notification(target: &NotifyTarget, payload: &NotificationPayload) -> Result<()> {
    log_notification(payload, target_type(target));

    match target {
        NotifyTarget::Command { command } => send_command(command, payload),
        NotifyTarget::Ntfy { topic, server } => send_ntfy(topic, server.as_deref(), payload),
        NotifyTarget::Slack { webhook_url } => send_slack(webhook_url, payload),
        NotifyTarget::Discord { webhook_url } => send_discord(webhook_url, payload),
    }
}

/// Send notification via custom command (JSON on stdin)
fn send_command(command: &str, payload: &NotificationPayload) -> Result<()> {
    let json = serde_json::to_string(payload)?;

    let mut child = Command::new("sh")
        .args(["-c", command])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(ref mut stdin) = child.stdin {
        stdin.write_all(json.as_bytes())?;
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FeescopeError::NotificationError(format!(
            "Command failed: {}",
            stderr
        )));
    }

    Ok(())
}

/// Send notification via ntfy
fn send_ntfy(topic: &str, server: Option<&str>, payload: &NotificationPayload) -> Result<()> {
    let server = server.unwrap_or("https://ntfy.sh");
    let url = format!("{}/{}", server.trim_end_matches('/'), topic);

    let tags = if payload.hidden_charges > 0.0 { "warning" } else { "white_check_mark" };

    ureq::post(&url)
        .header("Title", &payload.title)
        .header("Priority", "default")
        .header("Tags", tags)
        .send(&payload.message)?;

    Ok(())
}

/// Send notification via Slack webhook
fn send_slack(webhook_url: &str, payload: &NotificationPayload) -> Result<()> {
    let slack_payload = serde_json::json!({
        "text": format!("*{}*\n{}", payload.title, payload.message),
        "blocks": [
            {
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": payload.title
                }
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": payload.message
                }
            }
        ]
    });

    ureq::post(webhook_url)
        .header("Content-Type", "application/json")
        .send_json(&slack_payload)?;

    Ok(())
}

/// Send notification via Discord webhook
fn send_discord(webhook_url: &str, payload: &NotificationPayload) -> Result<()> {
    let color = if payload.hidden_charges > 0.0 { 0xFF4444 } else { 0x4CAF50 };
    let discord_payload = serde_json::json!({
        "embeds": [
            {
                "title": payload.title,
                "description": payload.message,
                "color": color,
                "timestamp": payload.detected_at.to_rfc3339(),
                "footer": {
                    "text": "feescope"
                }
            }
        ]
    });

    ureq::post(webhook_url)
        .header("Content-Type", "application/json")
        .send_json(&discord_payload)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PageMeta;

    fn result(hidden: f64, pct: u32) -> AnalysisResult {
        let meta = PageMeta {
            site: "www.swiggy.com".into(),
            page_title: String::new(),
            currency_symbol: "₹".into(),
        };
        AnalysisResult {
            base_price: 499.0,
            total: 499.0 + hidden,
            hidden_charges: hidden,
            hidden_percentage: pct,
            ..AnalysisResult::empty(&meta)
        }
    }

    #[test]
    fn test_hidden_fee_wording() {
        let payload = NotificationPayload::from_result(&result(40.0, 8));
        assert_eq!(payload.title, "Hidden Fees Detected!");
        assert_eq!(
            payload.message,
            "Extra 8% (₹40) in hidden charges found on www.swiggy.com"
        );
    }

    #[test]
    fn test_clean_checkout_wording() {
        let payload = NotificationPayload::from_result(&result(0.0, 0));
        assert_eq!(payload.title, "No Hidden Fees Found");
        assert!(payload.message.contains("₹499"));
    }

    #[test]
    fn test_describe_target() {
        let target = NotifyTarget::Ntfy {
            topic: "fees".into(),
            server: None,
        };
        assert_eq!(describe_target(&target), "ntfy: https://ntfy.sh/fees");
        assert_eq!(target_type(&target), "ntfy");
    }

    #[test]
    fn test_payload_serializes_result() {
        let payload = NotificationPayload::from_result(&result(40.0, 8));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["result"]["hiddenCharges"], 40.0);
        assert_eq!(json["hidden_percentage"], 8);
    }
}
