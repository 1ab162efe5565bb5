//! # Internal Metrics Module
//!
//! Installs the Prometheus recorder behind the `metrics` facade. Call sites
//! record through the `metrics::counter!` and `metrics::histogram!` macros
//! directly; when no recorder is installed those calls are no-ops.
//!
//! The rendered exposition is served by the webhook server on `/metrics`
//! through the returned [`PrometheusHandle`].

use crate::config::MetricsConfig;
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Registers descriptions for every metric the service records.
pub fn describe_metrics() {
    metrics::describe_counter!("webhooks_received_total", Unit::Count, "Total number of webhook invocations received.");
    metrics::describe_counter!("webhooks_rejected_total", Unit::Count, "Total number of webhook invocations rejected because the body could not be parsed.");
    metrics::describe_counter!("alerts_processed_total", Unit::Count, "Total number of alerts received across all accepted webhooks.");
    metrics::describe_counter!("notifications_sent_total", Unit::Count, "Total number of batches delivered, labeled by channel.");
    metrics::describe_counter!("notifications_failed_total", Unit::Count, "Total number of batches that failed to deliver, labeled by channel.");
    metrics::describe_histogram!(
        "dispatch_duration_seconds",
        Unit::Seconds,
        "The time taken to send one batch to every enabled channel."
    );
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the global recorder.
    ///
    /// Returns `None` when metrics are disabled or the recorder could not be
    /// installed. The service keeps running without metrics in both cases.
    pub fn build(self) -> Option<PrometheusHandle> {
        if !self.config.enabled {
            info!("Metrics disabled.");
            return None;
        }

        let builder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        ) {
            Ok(builder) => builder,
            Err(e) => {
                error!("Invalid histogram buckets: {}", e);
                return None;
            }
        };

        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return None;
        }

        describe_metrics();
        Some(handle)
    }
}
