//! Prometheus metrics for booking activity.
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so library code and tests can call the recorders
//! freely. The server installs the Prometheus recorder once at startup and
//! serves [`PrometheusHandle::render`] on `/metrics`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;
use venue_booking_core::review::ReviewOutcome;

/// Failure to set up the Prometheus exporter.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The exporter rejected its configuration.
    #[error("failed to build metrics exporter: {0}")]
    Build(String),
    /// A global recorder is already installed.
    #[error("failed to install metrics recorder: {0}")]
    Install(String),
}

/// Install the Prometheus recorder and describe every metric.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    describe_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Register descriptions for all booking metrics.
pub fn describe_metrics() {
    describe_counter!(
        "booking_requests_total",
        "Pending bookings created by submissions"
    );
    describe_counter!(
        "booking_reviews_total",
        "Completed reviews, labelled by outcome"
    );
    describe_histogram!(
        "booking_review_duration_seconds",
        "Time spent executing a review including conflict replays"
    );
    describe_counter!(
        "review_conflict_retries_total",
        "Reviews replayed after a venue version conflict"
    );
    describe_counter!(
        "venue_ledger_prunes_total",
        "Venue documents rewritten by read-time pruning"
    );
    describe_counter!(
        "venue_write_degraded_total",
        "Reviews whose venue write failed after the booking was updated"
    );
    describe_counter!(
        "attachment_upload_failures_total",
        "Attachment uploads that fell back to no attachment"
    );
}

/// Recorders for booking metrics.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Bookings created by one submission.
    pub fn record_submission(count: usize) {
        counter!("booking_requests_total").increment(count as u64);
    }

    /// A finished review and how long it took.
    pub fn record_review(outcome: &ReviewOutcome, duration: Duration) {
        counter!("booking_reviews_total", "outcome" => outcome.label()).increment(1);
        histogram!("booking_review_duration_seconds").record(duration.as_secs_f64());
    }

    /// A review replayed after a version conflict.
    pub fn record_conflict_retry() {
        counter!("review_conflict_retries_total").increment(1);
    }

    /// A venue rewritten by read-time pruning.
    pub fn record_prune() {
        counter!("venue_ledger_prunes_total").increment(1);
    }

    /// A venue write that failed after its booking was stored.
    pub fn record_degraded_write() {
        counter!("venue_write_degraded_total").increment(1);
    }

    /// An attachment upload that failed.
    pub fn record_attachment_failure() {
        counter!("attachment_upload_failures_total").increment(1);
    }
}
