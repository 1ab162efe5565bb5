//! Configuration management for alertrelay
//!
//! This module defines the main `Config` struct and its per-channel
//! sub-structs. It uses the `figment` crate to layer, from lowest to highest
//! precedence: built-in defaults, an optional `alertrelay.toml` file, the
//! flat environment variables older deployments use (`SLACK_WEBHOOK_URL`,
//! `PAGERDUTY_SEVERITY_MAP`, ...), `ALERTRELAY_`-prefixed nested environment
//! variables and finally command-line flags.

use crate::cli::Cli;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Used when `--config` is not given. A missing file is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "alertrelay.toml";

pub const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// Flat environment variable names and the config keys they populate.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("EMAIL_ENABLED", "email.enabled"),
    ("SNS_TOPIC_ARN", "email.topic_arn"),
    ("SLACK_ENABLED", "slack.enabled"),
    ("SLACK_WEBHOOK_URL", "slack.webhook_url"),
    ("SLACK_CHANNEL", "slack.channel"),
    ("SLACK_USERNAME", "slack.username"),
    ("DISCORD_ENABLED", "discord.enabled"),
    ("DISCORD_WEBHOOK_URL", "discord.webhook_url"),
    ("DISCORD_USERNAME", "discord.username"),
    ("TEAMS_ENABLED", "teams.enabled"),
    ("TEAMS_WEBHOOK_URL", "teams.webhook_url"),
    ("PAGERDUTY_ENABLED", "pagerduty.enabled"),
    ("PAGERDUTY_INTEGRATION_KEY", "pagerduty.integration_key"),
    ("PAGERDUTY_SEVERITY_MAP", "pagerduty.severity_map"),
];

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    #[serde(deserialize_with = "string_or_scalar")]
    pub log_level: String,
    /// Configuration for the inbound webhook server.
    pub server: ServerConfig,
    /// Configuration for the Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
    /// Settings shared by every outbound HTTP call.
    pub http: HttpConfig,
    /// Email delivery through an SNS topic.
    pub email: EmailConfig,
    pub slack: SlackConfig,
    pub discord: DiscordConfig,
    pub teams: TeamsConfig,
    pub pagerduty: PagerDutyConfig,
}

/// Configuration for the inbound webhook server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The address the webhook server listens on.
    pub listen_address: SocketAddr,
}

/// Configuration for metrics.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to record metrics and serve them on `/metrics`.
    #[serde(deserialize_with = "flexible_bool")]
    pub enabled: bool,
}

/// Settings for outbound webhook and PagerDuty calls.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Treat non-2xx responses as a failed send. Off by default: a channel
    /// counts as sent as soon as the request completes.
    #[serde(deserialize_with = "flexible_bool")]
    pub fail_on_error_status: bool,
}

/// Configuration for email alerts published to SNS.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmailConfig {
    #[serde(deserialize_with = "flexible_bool")]
    pub enabled: bool,
    /// ARN of the SNS topic the email subscribers listen on.
    #[serde(deserialize_with = "string_or_scalar")]
    pub topic_arn: String,
    /// AWS region override. The SDK's default chain is used when unset.
    #[serde(
        default,
        deserialize_with = "optional_string_or_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub region: Option<String>,
}

/// Configuration for Slack alerts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SlackConfig {
    #[serde(deserialize_with = "flexible_bool")]
    pub enabled: bool,
    /// The Slack incoming webhook URL.
    #[serde(deserialize_with = "string_or_scalar")]
    pub webhook_url: String,
    #[serde(deserialize_with = "string_or_scalar")]
    pub channel: String,
    #[serde(deserialize_with = "string_or_scalar")]
    pub username: String,
}

/// Configuration for Discord alerts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DiscordConfig {
    #[serde(deserialize_with = "flexible_bool")]
    pub enabled: bool,
    #[serde(deserialize_with = "string_or_scalar")]
    pub webhook_url: String,
    #[serde(deserialize_with = "string_or_scalar")]
    pub username: String,
}

/// Configuration for Microsoft Teams alerts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TeamsConfig {
    #[serde(deserialize_with = "flexible_bool")]
    pub enabled: bool,
    #[serde(deserialize_with = "string_or_scalar")]
    pub webhook_url: String,
}

/// Configuration for PagerDuty events.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PagerDutyConfig {
    #[serde(deserialize_with = "flexible_bool")]
    pub enabled: bool,
    /// Events v2 integration (routing) key.
    #[serde(deserialize_with = "string_or_scalar")]
    pub integration_key: String,
    /// Maps Prometheus severities to PagerDuty severities. Severities
    /// missing from the map are passed through unchanged.
    #[serde(deserialize_with = "severity_map")]
    pub severity_map: HashMap<String, String>,
    #[serde(deserialize_with = "string_or_scalar")]
    pub events_url: String,
}

impl EmailConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.topic_arn.is_empty()
    }
}

impl SlackConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.webhook_url.is_empty()
    }
}

impl DiscordConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.webhook_url.is_empty()
    }
}

impl TeamsConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.webhook_url.is_empty()
    }
}

impl PagerDutyConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.integration_key.is_empty()
    }

    /// Applies the severity map, falling back to the original value.
    pub fn map_severity<'a>(&'a self, severity: &'a str) -> &'a str {
        self.severity_map
            .get(severity)
            .map(String::as_str)
            .unwrap_or(severity)
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// # Arguments
    /// * `cli` - Parsed command-line arguments. `cli.config` selects the TOML
    ///   file; the remaining flags override every other source.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(legacy_env())
            // e.g. ALERTRELAY_SLACK__WEBHOOK_URL=https://hooks.slack.com/...
            .merge(Env::prefixed("ALERTRELAY_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| format!("invalid configuration (file: {})", config_path.display()))?;
        Ok(config)
    }
}

/// Reads the unprefixed variables listed in [`LEGACY_ENV_KEYS`].
fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
    })
}

/// Accepts a boolean or a string. Strings are `true` only when they equal
/// `"true"` ignoring case, so `"False"`, `"no"` or `""` all disable. Any
/// other type is an error.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    let flag = Flag::deserialize(deserializer).map_err(|_| {
        <D::Error as de::Error>::custom("expected a boolean or a \"true\"/\"false\" string")
    })?;

    match flag {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => Ok(text.trim().eq_ignore_ascii_case("true")),
    }
}

/// A scalar that may arrive typed. Environment values that look like numbers
/// or booleans are parsed as such before they reach a string field.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(text) => text,
            Scalar::Bool(flag) => flag.to_string(),
            Scalar::Unsigned(number) => number.to_string(),
            Scalar::Signed(number) => number.to_string(),
            Scalar::Float(number) => number.to_string(),
        }
    }
}

/// Reads a string field, accepting numbers and booleans as their text.
fn string_or_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer)
        .map(String::from)
        .map_err(|_| <D::Error as de::Error>::custom("expected a string, number or boolean"))
}

fn optional_string_or_scalar<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<Scalar>::deserialize(deserializer)
        .map(|value| value.map(String::from))
        .map_err(|_| <D::Error as de::Error>::custom("expected a string, number or boolean"))
}

/// Accepts either a table or a JSON object encoded as a string, which is how
/// the map arrives through a single environment variable.
fn severity_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SeverityMap {
        Table(HashMap<String, String>),
        Json(String),
    }

    match SeverityMap::deserialize(deserializer)? {
        SeverityMap::Table(map) => Ok(map),
        SeverityMap::Json(text) if text.trim().is_empty() => Ok(HashMap::new()),
        SeverityMap::Json(text) => serde_json::from_str(&text).map_err(|e| {
            de::Error::custom(format!("severity_map is not a JSON object of strings: {}", e))
        }),
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: SocketAddr::from(([0, 0, 0, 0], 9095)),
            },
            metrics: MetricsConfig { enabled: true },
            http: HttpConfig {
                timeout_seconds: 10,
                fail_on_error_status: false,
            },
            email: EmailConfig {
                enabled: false,
                topic_arn: String::new(),
                region: None,
            },
            slack: SlackConfig {
                enabled: false,
                webhook_url: String::new(),
                channel: "#alerts".to_string(),
                username: "Prometheus".to_string(),
            },
            discord: DiscordConfig {
                enabled: false,
                webhook_url: String::new(),
                username: "Prometheus".to_string(),
            },
            teams: TeamsConfig {
                enabled: false,
                webhook_url: String::new(),
            },
            pagerduty: PagerDutyConfig {
                enabled: false,
                integration_key: String::new(),
                severity_map: HashMap::new(),
                events_url: PAGERDUTY_EVENTS_URL.to_string(),
            },
        }
    }
}
