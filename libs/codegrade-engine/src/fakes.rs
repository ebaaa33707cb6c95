//! In-memory fakes for every collaborator of the engine.
//!
//! `MemoryProblemStore` and `MemorySubmissionStore` satisfy the store
//! contracts without Redis; `ScriptedExecutor` replaces the execution
//! service with deterministic, recorded responses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codegrade_common::store::{ProblemStore, SubmissionFilter, SubmissionStore};
use codegrade_common::types::{ExecutionRequest, ExecutionResult, Problem, Submission};
use codegrade_common::{EngineError, EngineResult};
use tokio::sync::Mutex;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Problems kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryProblemStore {
    problems: Mutex<Vec<Problem>>,
}

impl MemoryProblemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_problems(problems: Vec<Problem>) -> Self {
        let store = Self::new();
        *store.problems.lock().await = problems;
        store
    }
}

#[async_trait]
impl ProblemStore for MemoryProblemStore {
    async fn create_problem(&self, problem: Problem) -> EngineResult<Problem> {
        self.problems.lock().await.push(problem.clone());
        Ok(problem)
    }

    async fn get_problem(&self, id: &Uuid) -> EngineResult<Problem> {
        self.problems
            .lock()
            .await
            .iter()
            .find(|p| p.id == *id)
            .cloned()
            .ok_or_else(|| EngineError::problem_not_found(id))
    }

    async fn list_problems(&self) -> EngineResult<Vec<Problem>> {
        let mut problems: Vec<Problem> = self.problems.lock().await.iter().rev().cloned().collect();
        problems.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(problems)
    }

    async fn delete_problem(&self, id: &Uuid) -> EngineResult<()> {
        let mut problems = self.problems.lock().await;
        let before = problems.len();
        problems.retain(|p| p.id != *id);
        if problems.len() == before {
            return Err(EngineError::problem_not_found(id));
        }
        Ok(())
    }
}

/// Submissions kept in insertion order
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    submissions: Mutex<Vec<Submission>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.submissions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn all(&self) -> Vec<Submission> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn create_submission(&self, submission: Submission) -> EngineResult<Submission> {
        self.submissions.lock().await.push(submission.clone());
        Ok(submission)
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> EngineResult<Vec<Submission>> {
        let mut matching: Vec<Submission> = self
            .submissions
            .lock()
            .await
            .iter()
            .rev()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn get_submission(&self, id: &Uuid) -> EngineResult<Submission> {
        self.submissions
            .lock()
            .await
            .iter()
            .find(|s| s.id == *id)
            .cloned()
            .ok_or_else(|| EngineError::submission_not_found(id))
    }
}

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

type Script = dyn Fn(usize, &ExecutionRequest) -> EngineResult<ExecutionResult> + Send + Sync;

/// Execution service double.
///
/// Every request is recorded in arrival order. The response for call `n`
/// (zero-based) comes from the script. Each call yields to the runtime once
/// so overlapping calls would be observable through `max_in_flight`.
pub struct ScriptedExecutor {
    script: Arc<Script>,
    requests: Mutex<Vec<ExecutionRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl ScriptedExecutor {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &ExecutionRequest) -> EngineResult<ExecutionResult> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::from_millis(1),
        }
    }

    /// Program that prints its stdin back
    pub fn echo() -> Self {
        Self::new(|_, request| Ok(ExecutionResult::with_output(request.stdin.clone(), "")))
    }

    /// Answer call `n` with `stdouts[n]`; calls beyond the list see the service as down
    pub fn with_stdouts(stdouts: Vec<&str>) -> Self {
        let stdouts: Vec<String> = stdouts.into_iter().map(str::to_string).collect();
        Self::new(move |call, _| match stdouts.get(call) {
            Some(out) => Ok(ExecutionResult::with_output(out.clone(), "")),
            None => Err(EngineError::ServiceUnavailable("no scripted response".to_string())),
        })
    }

    /// Echo stdin, but fail call `failing_call` with a collaborator error
    pub fn failing_on_call(failing_call: usize) -> Self {
        Self::new(move |call, request| {
            if call == failing_call {
                Err(EngineError::ServiceUnavailable("connection reset".to_string()))
            } else {
                Ok(ExecutionResult::with_output(request.stdin.clone(), ""))
            }
        })
    }

    pub async fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Highest number of concurrently running calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::engine::CodeExecutor for ScriptedExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> EngineResult<ExecutionResult> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call = {
            let mut requests = self.requests.lock().await;
            requests.push(request.clone());
            requests.len() - 1
        };

        tokio::time::sleep(self.latency).await;
        let response = (self.script)(call, request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
