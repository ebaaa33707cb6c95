use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/languages", get(handlers::list_languages))
        .route("/problems", post(handlers::create_problem).get(handlers::list_problems))
        .route(
            "/problems/:id",
            get(handlers::get_problem).delete(handlers::delete_problem),
        )
        .route("/problems/:id/submit", post(handlers::submit_solution))
        .route("/problems/:id/submissions", get(handlers::list_problem_submissions))
        .route("/run", post(handlers::run_code))
        .route("/submissions", get(handlers::list_all_submissions))
        .route("/submissions/mine", get(handlers::list_my_submissions))
        .route("/submissions/:id", get(handlers::get_submission))
        .route("/judge/selftest", get(handlers::judge_selftest))
}
