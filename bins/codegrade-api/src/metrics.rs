// Prometheus metrics for the evaluation service

use async_trait::async_trait;
use codegrade_common::types::{ExecutionRequest, ExecutionResult};
use codegrade_common::EngineResult;
use codegrade_engine::CodeExecutor;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref EVALUATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codegrade_evaluations_total",
        "Completed evaluations by mode",
        &["mode"]
    )
    .expect("metric can be registered");

    pub static ref EVALUATION_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codegrade_evaluation_failures_total",
        "Failed evaluate and run calls by error kind",
        &["kind"]
    )
    .expect("metric can be registered");

    pub static ref EXECUTION_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "codegrade_execution_calls_total",
        "Calls to the execution service by outcome",
        &["outcome"]
    )
    .expect("metric can be registered");

    pub static ref EVALUATION_DURATION: Histogram = register_histogram!(
        "codegrade_evaluation_duration_seconds",
        "Wall time of evaluate calls",
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("metric can be registered");
}

/// Render every registered metric in the text exposition format
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Wraps an executor and counts its calls by outcome
pub struct MeteredExecutor<E> {
    inner: E,
}

impl<E> MeteredExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<E: CodeExecutor> CodeExecutor for MeteredExecutor<E> {
    async fn execute(&self, request: &ExecutionRequest) -> EngineResult<ExecutionResult> {
        let result = self.inner.execute(request).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        EXECUTION_CALLS_TOTAL.with_label_values(&[outcome]).inc();
        result
    }
}
