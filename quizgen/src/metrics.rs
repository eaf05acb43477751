//! Quiz service metrics for Prometheus.
//!
//! Metrics live in the default prometheus registry and are exposed on `/internal/metrics` when
//! `enable_metrics` is set.

use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, IntCounterVec, TextEncoder, register_histogram, register_int_counter_vec};

/// Counter of quiz requests by outcome (generated, fallback, error)
static QUIZ_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "quizgen_quiz_outcomes_total",
        "Total quiz generation requests by outcome",
        &["outcome"]
    )
    .expect("Failed to register quizgen_quiz_outcomes_total metric")
});

/// Histogram for the upstream chat completion call
/// Buckets: 250ms, 500ms, 1s, 2s, 5s, 10s, 20s, 30s, 60s, 120s
static UPSTREAM_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "quizgen_upstream_request_duration_seconds",
        "Duration of upstream chat completion requests (seconds)",
        vec![0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register quizgen_upstream_request_duration_seconds metric")
});

/// Counter for requests rejected before reaching the upstream
static NOTES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "quizgen_notes_rejected_total",
        "Total quiz requests rejected while reading notes",
        &["reason"]
    )
    .expect("Failed to register quizgen_notes_rejected_total metric")
});

/// Record the outcome of a quiz request that reached the upstream
pub fn record_quiz_outcome(outcome: &str) {
    QUIZ_OUTCOMES.with_label_values(&[outcome]).inc();
}

/// Record how long one upstream call took
pub fn record_upstream_duration(seconds: f64) {
    UPSTREAM_DURATION_SECONDS.observe(seconds);
}

/// Record a request rejected while reading notes
pub fn record_notes_rejected(reason: &str) {
    NOTES_REJECTED.with_label_values(&[reason]).inc();
}

/// Render every registered metric in the Prometheus text format
pub async fn render() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response()
}
