// HTTP route handlers for the CodeGrade API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use codegrade_common::types::ProblemDraft;
use codegrade_common::EngineError;
use codegrade_engine::access::SubmissionScope;
use codegrade_engine::EvaluationOutcome;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentActor;
use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub code: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub code: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stdin: String,
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("Invalid {} id format", what)))
}

/// Source text is passed through as-is; only a missing or empty value is rejected
fn require_code(value: Option<String>) -> ApiResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation("code is required")),
    }
}

fn require_language(value: Option<String>) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::validation("language is required")),
    }
}

fn record_failure(err: &EngineError) {
    metrics::EVALUATION_FAILURES_TOTAL.with_label_values(&[err.kind()]).inc();
}

/// GET /health - Liveness probe
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

/// GET /languages - Configured language names
pub async fn list_languages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "languages": state.orchestrator.languages().names() }))
}

/// POST /problems - Create a problem (teachers only)
pub async fn create_problem(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    payload: Result<Json<ProblemDraft>, JsonRejection>,
) -> ApiResult<Response> {
    let draft = parse_body(payload)?;
    let problem = state.orchestrator.create_problem(draft, &actor).await?;
    Ok((StatusCode::CREATED, Json(problem)).into_response())
}

/// GET /problems - All problems, newest first
pub async fn list_problems(
    State(state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
) -> ApiResult<Response> {
    let problems = state.orchestrator.list_problems().await?;
    Ok(Json(problems).into_response())
}

/// GET /problems/:id
pub async fn get_problem(
    State(state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
    Path(problem_id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&problem_id, "problem")?;
    let problem = state.orchestrator.get_problem(&id).await?;
    Ok(Json(problem).into_response())
}

/// DELETE /problems/:id (teachers only)
pub async fn delete_problem(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(problem_id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&problem_id, "problem")?;
    state.orchestrator.delete_problem(&id, &actor).await?;
    Ok(Json(json!({ "message": "Problem deleted successfully" })).into_response())
}

/// POST /problems/:id/submit - Evaluate code against every test case
///
/// Teachers receive a preview (200); students receive the stored submission (201).
pub async fn submit_solution(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(problem_id): Path<String>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let id = parse_id(&problem_id, "problem")?;
    let body = parse_body(payload)?;
    let code = require_code(body.code)?;
    let language = require_language(body.language)?;

    let timer = metrics::EVALUATION_DURATION.start_timer();
    let outcome = state
        .orchestrator
        .evaluate(&id, &code, &language, &actor)
        .await
        .map_err(|e| {
            record_failure(&e);
            e
        })?;
    timer.observe_duration();

    metrics::EVALUATIONS_TOTAL.with_label_values(&[outcome.mode()]).inc();
    info!(
        problem_id = %id,
        mode = outcome.mode(),
        passed = outcome.passed(),
        total = outcome.total(),
        "Evaluation served"
    );

    let status = match outcome {
        EvaluationOutcome::Preview(_) => StatusCode::OK,
        EvaluationOutcome::Submitted(_) => StatusCode::CREATED,
    };
    Ok((status, Json(outcome)).into_response())
}

/// GET /problems/:id/submissions (teachers only)
pub async fn list_problem_submissions(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(problem_id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&problem_id, "problem")?;
    let submissions = state
        .orchestrator
        .list_submissions(SubmissionScope::Problem(id), &actor)
        .await?;
    Ok(Json(submissions).into_response())
}

/// POST /run - Execute once with caller stdin; nothing is stored
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let body = parse_body(payload)?;
    let code = require_code(body.code)?;
    let language = require_language(body.language)?;

    let result = state
        .orchestrator
        .run(&code, &language, &body.stdin)
        .await
        .map_err(|e| {
            record_failure(&e);
            e
        })?;
    Ok(Json(result).into_response())
}

/// GET /submissions (teachers only)
pub async fn list_all_submissions(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Response> {
    let submissions = state.orchestrator.list_submissions(SubmissionScope::All, &actor).await?;
    Ok(Json(submissions).into_response())
}

/// GET /submissions/mine
pub async fn list_my_submissions(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Response> {
    let submissions = state.orchestrator.list_submissions(SubmissionScope::Mine, &actor).await?;
    Ok(Json(submissions).into_response())
}

/// GET /submissions/:id
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(submission_id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&submission_id, "submission")?;
    let submission = state.orchestrator.get_submission(&id, &actor).await?;
    Ok(Json(submission).into_response())
}

/// GET /judge/selftest - Round trip to the execution service (teachers only)
pub async fn judge_selftest(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Response> {
    let result = state.orchestrator.self_test(&actor).await?;
    Ok(Json(result).into_response())
}
