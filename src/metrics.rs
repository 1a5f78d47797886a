//! Metrics and telemetry for the sankey endpoint
//!
//! Prometheus metrics registered in the default registry and exposed by
//! `GET /metrics`.

use crate::error::{Error, ErrorKind, Result};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    /// Sankey requests by outcome
    pub static ref SANKEY_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "sankey_requests_total",
        "Sankey requests by outcome",
        &["status"]
    ).unwrap();

    /// Store round-trip duration
    pub static ref SANKEY_QUERY_DURATION: Histogram = register_histogram!(
        "sankey_query_duration_seconds",
        "Sankey store query latency in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();

    /// Links per produced graph
    pub static ref SANKEY_GRAPH_LINKS: Histogram = register_histogram!(
        "sankey_graph_links",
        "Number of links in produced sankey graphs",
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]
    ).unwrap();
}

/// Outcome label for a finished request
pub fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => match e.kind() {
            ErrorKind::Client => "client_error",
            ErrorKind::Upstream => "upstream_error",
            ErrorKind::Internal => "internal_error",
        },
    }
}

/// Record a finished request
#[inline]
pub fn record_request(status: &str) {
    SANKEY_REQUESTS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a store round-trip
#[inline]
pub fn record_query_duration(elapsed: Duration) {
    SANKEY_QUERY_DURATION.observe(elapsed.as_secs_f64());
}

/// Record the size of a produced graph
#[inline]
pub fn record_graph_links(links: usize) {
    SANKEY_GRAPH_LINKS.observe(links as f64);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| Error::Serialization(format!("failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| Error::Serialization(format!("metrics contain invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&Ok::<(), Error>(())), "ok");
        assert_eq!(
            outcome_label::<()>(&Err(Error::invalid("limit"))),
            "client_error"
        );
        assert_eq!(
            outcome_label::<()>(&Err(Error::Store(crate::error::StoreError::Timeout))),
            "upstream_error"
        );
    }

    #[test]
    fn test_gather_contains_request_counter() {
        record_request("ok");
        record_graph_links(3);
        let text = gather_metrics().unwrap();
        assert!(text.contains("sankey_requests_total"));
        assert!(text.contains("sankey_graph_links"));
    }
}
