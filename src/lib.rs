//! alertrelay - relays Prometheus Alertmanager webhooks to email, chat and
//! PagerDuty.
//!
//! This library provides the alert model, the per-channel renderers and
//! notifiers, the dispatcher and the HTTP surface used by the binary.

pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod server;
pub mod webhook;

// Re-export core types for convenience
pub use crate::core::*;
