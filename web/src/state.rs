//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use venue_booking_runtime::BookingService;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    service: Arc<BookingService>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State serving `service`, without a metrics endpoint.
    #[must_use]
    pub const fn new(service: Arc<BookingService>) -> Self {
        Self {
            service,
            metrics: None,
        }
    }

    /// Serve `handle` on `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The booking service.
    #[must_use]
    pub fn service(&self) -> &BookingService {
        &self.service
    }

    /// The Prometheus handle, when a recorder is installed.
    #[must_use]
    pub const fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}
