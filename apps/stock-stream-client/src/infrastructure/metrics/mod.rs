//! Prometheus Metrics Module
//!
//! Exposes client metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Counts of frames received by type and discarded by reason
//! - **Connection**: Current connection state, reconnects, config frames
//! - **Retention**: Retained record count and records lost to capacity
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! functions are no-ops until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::streaming::ConnectionState;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the already installed handle.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Frame counters
    describe_counter!(
        "stock_stream_frames_received_total",
        "Total feed frames decoded, by message type"
    );
    describe_counter!(
        "stock_stream_frames_discarded_total",
        "Total feed frames discarded, by reason"
    );

    // Connection
    describe_gauge!(
        "stock_stream_connection_state",
        "Connection state (0=disconnected, 1=connecting, 2=connected, 3=errored)"
    );
    describe_counter!(
        "stock_stream_reconnects_total",
        "Total reconnects scheduled after abnormal closes"
    );
    describe_counter!(
        "stock_stream_config_frames_sent_total",
        "Total configuration frames sent"
    );

    // Retention
    describe_gauge!(
        "stock_stream_retained_records",
        "Number of records currently retained"
    );
    describe_counter!(
        "stock_stream_records_dropped_total",
        "Total records dropped or evicted by the capacity rule"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a decoded frame.
pub fn record_frame_received(message_type: &'static str) {
    counter!(
        "stock_stream_frames_received_total",
        "message_type" => message_type
    )
    .increment(1);
}

/// Record a discarded frame.
pub fn record_frame_discarded(reason: &'static str) {
    counter!(
        "stock_stream_frames_discarded_total",
        "reason" => reason
    )
    .increment(1);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("stock_stream_connection_state").set(state.as_gauge());
}

/// Record a scheduled reconnect.
pub fn record_reconnect_scheduled() {
    counter!("stock_stream_reconnects_total").increment(1);
}

/// Record a configuration frame sent.
pub fn record_config_frame_sent() {
    counter!("stock_stream_config_frames_sent_total").increment(1);
}

/// Update the retained record gauge.
pub fn set_retained_records(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("stock_stream_retained_records").set(count as f64);
}

/// Record records lost to the capacity rule.
pub fn record_dropped_by_capacity(count: usize) {
    counter!("stock_stream_records_dropped_total").increment(count as u64);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_frame_received("price_update");
        record_frame_discarded("malformed");
        set_connection_state(ConnectionState::Connected);
        record_reconnect_scheduled();
        record_config_frame_sent();
        set_retained_records(3);
        record_dropped_by_capacity(1);
    }

    #[test]
    fn init_metrics_is_idempotent() {
        let first = init_metrics().unwrap();
        let second = init_metrics().unwrap();

        record_reconnect_scheduled();

        assert!(first.render().contains("stock_stream_reconnects_total"));
        assert!(get_metrics_handle().is_some());
        drop(second);
    }
}
