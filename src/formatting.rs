// src/formatting.rs

use crate::core::{AlertRecord, LabelSet};
use chrono::{DateTime, Utc};

/// How many alerts the chat summaries list before collapsing the rest.
pub const SUMMARY_LIST_LIMIT: usize = 5;

/// Display format shared by every timestamp in rendered messages.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Picks the emoji for an alert. A resolved status wins over any severity.
pub fn alert_emoji(severity: &str, status: &str) -> &'static str {
    if status == "resolved" {
        "✅"
    } else if severity == "critical" {
        "🚨"
    } else if severity == "warning" {
        "⚠️"
    } else if severity == "info" {
        "ℹ️"
    } else {
        "🔔"
    }
}

/// Slack attachment color, using Slack's named keywords where they exist.
pub fn slack_color(severity: &str, status: &str) -> &'static str {
    if status == "resolved" {
        "good"
    } else if severity == "critical" {
        "danger"
    } else if severity == "warning" {
        "warning"
    } else {
        "#808080"
    }
}

/// Discord embed color as a decimal RGB value.
pub fn discord_color(severity: &str, status: &str) -> u32 {
    if status == "resolved" {
        3066993 // green
    } else if severity == "critical" {
        15158332 // red
    } else if severity == "warning" {
        16776960 // yellow
    } else {
        8421504 // gray
    }
}

/// Teams `themeColor` as a hex string without the leading `#`.
pub fn teams_color(severity: &str, status: &str) -> &'static str {
    if status == "resolved" {
        "2eb886"
    } else if severity == "critical" {
        "d63031"
    } else if severity == "warning" {
        "fdcb6e"
    } else {
        "636e72"
    }
}

/// Formats an upstream RFC 3339 timestamp for display.
///
/// Absent or empty values render as `N/A`. Values that do not parse are
/// shown unchanged rather than dropped.
pub fn format_timestamp(timestamp: Option<&str>) -> String {
    match timestamp {
        None | Some("") => "N/A".to_string(),
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string(),
            Err(_) => raw.to_string(),
        },
    }
}

/// Renders a label or annotation map as indented `key: value` lines.
pub fn format_key_values(values: &LabelSet) -> String {
    if values.is_empty() {
        return "  (none)".to_string();
    }

    values
        .iter()
        .map(|(key, value)| format!("  {}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per alert for the chat summaries, capped at
/// [`SUMMARY_LIST_LIMIT`] with a trailing count of the remainder.
pub fn summary_lines(alerts: &[AlertRecord]) -> Vec<String> {
    let mut lines: Vec<String> = alerts
        .iter()
        .take(SUMMARY_LIST_LIMIT)
        .map(|alert| {
            format!(
                "{} {} ({})",
                alert_emoji(alert.severity(), alert.status_str()),
                alert.alert_name(),
                alert.severity()
            )
        })
        .collect();

    if alerts.len() > SUMMARY_LIST_LIMIT {
        lines.push(format!(
            "... and {} more alerts",
            alerts.len() - SUMMARY_LIST_LIMIT
        ));
    }

    lines
}
