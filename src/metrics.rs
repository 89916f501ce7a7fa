//! Prometheus metrics for the function handlers, the email pipeline and the query cache.
//!
//! Metric names follow `nanny_{area}_{name}_total` for counters.

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

macro_rules! area_counter {
    ($area:literal, $name:literal) => {
        concat!("nanny_", $area, "_", $name, "_total")
    };
}

/// Install the Prometheus exporter. Idempotent.
///
/// Listens on `NANNY_METRICS_PORT` (default 9898).
pub fn init_metrics() {
    INIT.call_once(|| {
        let port: u16 = std::env::var("NANNY_METRICS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9898);
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
        }
    });
}

/// Counters for the serverless function endpoints
pub struct FunctionMetrics;

impl FunctionMetrics {
    pub fn record_invocation(function: &'static str) {
        ::metrics::counter!(area_counter!("functions", "invocations"), "function" => function).increment(1);
    }

    pub fn record_failure(function: &'static str) {
        ::metrics::counter!(area_counter!("functions", "failures"), "function" => function).increment(1);
    }

    pub fn record_email_sent() {
        ::metrics::counter!(area_counter!("email", "sent")).increment(1);
    }

    pub fn record_email_failed() {
        ::metrics::counter!(area_counter!("email", "failed")).increment(1);
    }

    pub fn record_webhook_event(event_type: &str) {
        ::metrics::counter!(area_counter!("webhook", "events"), "type" => event_type.to_string()).increment(1);
    }
}

/// Counters for the query batcher
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn record_hit() {
        ::metrics::counter!(area_counter!("cache", "hits")).increment(1);
    }

    pub fn record_joined() {
        ::metrics::counter!(area_counter!("cache", "joined_in_flight")).increment(1);
    }

    pub fn record_miss() {
        ::metrics::counter!(area_counter!("cache", "misses")).increment(1);
    }
}
