//! Prometheus metrics for the worker.

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder with an HTTP listener on `port`.
pub fn init_metrics(port: u16) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .install()
        .map_err(|e| WorkerError::config_error(format!("Failed to install Prometheus exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "trailer_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "trailer_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "trailer_job_duration_seconds";
    pub const CACHE_HITS_TOTAL: &str = "trailer_cache_hits_total";
    pub const GROUNDING_SOURCE_TOTAL: &str = "trailer_grounding_source_total";
    pub const STAGE_ATTEMPTS_TOTAL: &str = "trailer_stage_attempts_total";
    pub const QC_GATE_TOTAL: &str = "trailer_qc_gate_total";
    pub const ASSEMBLY_MODE_TOTAL: &str = "trailer_assembly_mode_total";
    pub const CALLBACKS_FAILED_TOTAL: &str = "trailer_callbacks_failed_total";
}

/// Record a completed job; `partial` when fewer than all scenes were used.
pub fn record_job_completed(partial: bool, duration_secs: f64) {
    let labels = [("partial", partial.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS).record(duration_secs);
}

pub fn record_job_failed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

/// Record which grounding source produced the facts (`catalog`, `offline`, `minimal`).
pub fn record_grounding_source(source: &str) {
    let kind = source.split(':').next().unwrap_or(source);
    let labels = [("source", kind.to_string())];
    counter!(names::GROUNDING_SOURCE_TOTAL, &labels).increment(1);
}

/// Record one generation attempt of a stage.
pub fn record_stage_attempt(stage: &str, success: bool) {
    let labels = [
        ("stage", stage.to_string()),
        ("outcome", if success { "success" } else { "failure" }.to_string()),
    ];
    counter!(names::STAGE_ATTEMPTS_TOTAL, &labels).increment(1);
}

pub fn record_qc_gate(gate: &str, status: &str) {
    let labels = [("gate", gate.to_string()), ("status", status.to_string())];
    counter!(names::QC_GATE_TOTAL, &labels).increment(1);
}

pub fn record_assembly_mode(mode: &str) {
    let labels = [("mode", mode.to_string())];
    counter!(names::ASSEMBLY_MODE_TOTAL, &labels).increment(1);
}

pub fn record_callback_failed() {
    counter!(names::CALLBACKS_FAILED_TOTAL).increment(1);
}
