/// Metrics and telemetry
///
/// Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Decision engine outcomes and analysis health
/// - Record transitions and best-effort side effects
/// - Escalation alerts and queue depth
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Encoder, Gauge, Histogram, HistogramVec,
    IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Analysis Metrics ==========

    /// Initial routing decisions by action
    pub static ref MODERATION_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_decisions_total",
        "Initial routing decisions by action",
        &["action"]
    )
    .unwrap();

    /// Content analysis failures (fail-safe applied)
    pub static ref ANALYSIS_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "moderation_analysis_failures_total",
        "Content analysis calls that failed or timed out"
    )
    .unwrap();

    /// Content analysis latency
    pub static ref ANALYSIS_DURATION_SECONDS: Histogram = register_histogram!(
        "moderation_analysis_duration_seconds",
        "Content analysis latencies in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== Record Metrics ==========

    /// Reviewer transitions by target state and result
    pub static ref MODERATION_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_transitions_total",
        "Reviewer transitions by target state and result",
        &["target", "result"]
    )
    .unwrap();

    /// Failed asset moves/deletes, notifications and alerts
    pub static ref SIDE_EFFECT_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_side_effect_failures_total",
        "Best-effort side effects that failed",
        &["kind"]
    )
    .unwrap();

    /// Rejected records removed after retention
    pub static ref RECORDS_PURGED_TOTAL: IntCounter = register_int_counter!(
        "moderation_records_purged_total",
        "Rejected records deleted after their retention period"
    )
    .unwrap();

    // ========== Queue Metrics ==========

    /// Open records (pending + under-review)
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        "moderation_queue_depth",
        "Records awaiting a moderator decision"
    )
    .unwrap();

    /// Escalation alerts by severity
    pub static ref ESCALATION_ALERTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_escalation_alerts_total",
        "Escalation alerts raised by severity",
        &["severity"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record an initial routing decision
pub fn record_decision(action: &str) {
    MODERATION_DECISIONS_TOTAL.with_label_values(&[action]).inc();
}

/// Record one content analysis call
pub fn record_analysis(duration: f64, success: bool) {
    ANALYSIS_DURATION_SECONDS.observe(duration);
    if !success {
        ANALYSIS_FAILURES_TOTAL.inc();
    }
}

/// Record a reviewer transition attempt
pub fn record_transition(target: &str, result: &str) {
    MODERATION_TRANSITIONS_TOTAL
        .with_label_values(&[target, result])
        .inc();
}

/// Record a failed best-effort side effect
pub fn record_side_effect_failure(kind: &str) {
    SIDE_EFFECT_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

/// Record an escalation alert
pub fn record_escalation_alert(severity: &str) {
    ESCALATION_ALERTS_TOTAL.with_label_values(&[severity]).inc();
}

/// Record purged records
pub fn record_purged(count: u64) {
    RECORDS_PURGED_TOTAL.inc_by(count);
}

/// Set the open-queue gauge
pub fn set_queue_depth(depth: i64) {
    QUEUE_DEPTH.set(depth);
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}
