//! Storage capabilities consumed by the engine.
//!
//! Backends are async and interchangeable: production uses the Redis
//! implementation in [`crate::redis`], tests use in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::types::{Problem, Submission};

/// Selection of submissions to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionFilter {
    All,
    Problem(Uuid),
    Student(Uuid),
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        match self {
            SubmissionFilter::All => true,
            SubmissionFilter::Problem(id) => submission.problem == *id,
            SubmissionFilter::Student(id) => submission.student == *id,
        }
    }
}

#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn create_problem(&self, problem: Problem) -> EngineResult<Problem>;

    /// Fails with `NotFound` when the id does not resolve
    async fn get_problem(&self, id: &Uuid) -> EngineResult<Problem>;

    /// Newest first
    async fn list_problems(&self) -> EngineResult<Vec<Problem>>;

    /// Fails with `NotFound` when the id does not resolve
    async fn delete_problem(&self, id: &Uuid) -> EngineResult<()>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a submission. The write is atomic: either the record and all
    /// its index entries exist afterwards, or none of them do.
    async fn create_submission(&self, submission: Submission) -> EngineResult<Submission>;

    /// Newest first
    async fn list_submissions(&self, filter: &SubmissionFilter) -> EngineResult<Vec<Submission>>;

    async fn get_submission(&self, id: &Uuid) -> EngineResult<Submission>;
}
