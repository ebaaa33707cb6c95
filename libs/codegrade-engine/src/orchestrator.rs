/// Evaluation Orchestrator - High-Level Coordination
///
/// **Responsibility:**
/// Coordinate stores, execution engine and evaluator to implement
/// `evaluate` (graded or preview run against a problem's test cases) and
/// `run` (single-shot quick feedback), plus the policy-gated accessors the
/// request layer needs.
///
/// **Pipeline for `evaluate`:**
/// 1. Resolve language name → execution-service id (fails closed)
/// 2. Resolve the problem and its ordered test cases
/// 3. Execute test cases strictly one after another, in stored order
/// 4. Judge and aggregate via the evaluator
/// 5. Teachers get a preview; students get a persisted submission
///
/// The call is all-or-nothing: a collaborator failure on any case aborts
/// before anything is aggregated or stored. No retries, no fan-out.

use std::sync::Arc;
use std::time::Instant;

use codegrade_common::config::LanguageTable;
use codegrade_common::store::{ProblemStore, SubmissionStore};
use codegrade_common::types::{
    Actor, Aggregate, ExecutionRequest, ExecutionResult, Problem, ProblemDraft, Submission, TestCase,
    TestCaseOutcome,
};
use codegrade_common::{EngineError, EngineResult};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::access::{self, SubmissionScope};
use crate::engine::CodeExecutor;
use crate::evaluator;

/// Language and program used by the execution-service self-test
pub const SELF_TEST_LANGUAGE: &str = "python";
pub const SELF_TEST_SOURCE: &str = "print(1+2)";
pub const SELF_TEST_EXPECTED: &str = "3";

/// Whether a self-test response carries the expected answer
pub fn self_test_passed(result: &ExecutionResult) -> bool {
    evaluator::normalize_output(result.stdout()) == SELF_TEST_EXPECTED
}

/// Result of `evaluate`, tagged by which branch the caller's role selected
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EvaluationOutcome {
    /// Nothing was stored
    Preview(Aggregate),
    /// The stored submission, echoed back
    Submitted(Submission),
}

impl EvaluationOutcome {
    pub fn mode(&self) -> &'static str {
        match self {
            EvaluationOutcome::Preview(_) => "preview",
            EvaluationOutcome::Submitted(_) => "submitted",
        }
    }

    pub fn passed(&self) -> u32 {
        match self {
            EvaluationOutcome::Preview(aggregate) => aggregate.passed,
            EvaluationOutcome::Submitted(submission) => submission.passed,
        }
    }

    pub fn total(&self) -> u32 {
        match self {
            EvaluationOutcome::Preview(aggregate) => aggregate.total,
            EvaluationOutcome::Submitted(submission) => submission.total,
        }
    }

    pub fn details(&self) -> &[TestCaseOutcome] {
        match self {
            EvaluationOutcome::Preview(aggregate) => &aggregate.details,
            EvaluationOutcome::Submitted(submission) => &submission.details,
        }
    }
}

/// Run `code` against every test case, one at a time, in the given order.
///
/// Case k+1 is dispatched only after case k's result is known. A content
/// mismatch is recorded and the loop continues; a collaborator error
/// aborts immediately and discards every result gathered so far.
pub async fn execute_test_cases(
    executor: &dyn CodeExecutor,
    code: &str,
    language_id: u32,
    test_cases: &[TestCase],
) -> EngineResult<Aggregate> {
    let mut details = Vec::with_capacity(test_cases.len());

    for (idx, test_case) in test_cases.iter().enumerate() {
        let request = ExecutionRequest {
            source_code: code.to_string(),
            language_id,
            stdin: test_case.input.clone(),
        };

        let raw = executor.execute(&request).await.map_err(|e| {
            error!(
                test_num = idx + 1,
                total = test_cases.len(),
                error = %e,
                "Execution failed; aborting evaluation"
            );
            e
        })?;

        let outcome = evaluator::evaluate_test(test_case, raw);
        debug!(test_num = idx + 1, ok = outcome.ok, "Test case judged");
        details.push(outcome);
    }

    Ok(evaluator::aggregate_results(details))
}

/// Resolve `language` and execute `code` once with the given stdin.
///
/// An unknown language fails before the executor is called.
pub async fn run_once(
    executor: &dyn CodeExecutor,
    languages: &LanguageTable,
    code: &str,
    language: &str,
    stdin: &str,
) -> EngineResult<ExecutionResult> {
    let language_id = languages.resolve(language)?;
    let request = ExecutionRequest {
        source_code: code.to_string(),
        language_id,
        stdin: stdin.to_string(),
    };

    debug!(source_size = code.len(), stdin_size = stdin.len(), "Quick run");
    executor.execute(&request).await
}

pub struct Orchestrator {
    executor: Arc<dyn CodeExecutor>,
    problems: Arc<dyn ProblemStore>,
    submissions: Arc<dyn SubmissionStore>,
    languages: Arc<LanguageTable>,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn CodeExecutor>,
        problems: Arc<dyn ProblemStore>,
        submissions: Arc<dyn SubmissionStore>,
        languages: Arc<LanguageTable>,
    ) -> Self {
        Self {
            executor,
            problems,
            submissions,
            languages,
        }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    /// Evaluate `code` against all test cases of a problem
    #[instrument(skip(self, code, actor), fields(role = %actor.role, actor_id = %actor.id))]
    pub async fn evaluate(
        &self,
        problem_id: &Uuid,
        code: &str,
        language: &str,
        actor: &Actor,
    ) -> EngineResult<EvaluationOutcome> {
        let language_id = self.languages.resolve(language)?;
        let problem = self.problems.get_problem(problem_id).await?;

        info!(
            test_cases = problem.test_cases.len(),
            source_size = code.len(),
            "Starting evaluation"
        );
        let start = Instant::now();

        let aggregate = execute_test_cases(self.executor.as_ref(), code, language_id, &problem.test_cases).await?;

        let outcome = if access::can_preview(actor) {
            EvaluationOutcome::Preview(aggregate)
        } else {
            let submission = Submission::new(actor.id, problem.id, language, code, aggregate);
            EvaluationOutcome::Submitted(self.submissions.create_submission(submission).await?)
        };

        info!(
            mode = outcome.mode(),
            passed = outcome.passed(),
            total = outcome.total(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Evaluation complete"
        );

        Ok(outcome)
    }

    /// Single execution with caller-supplied stdin; touches no test case or store
    #[instrument(skip(self, code, stdin))]
    pub async fn run(&self, code: &str, language: &str, stdin: &str) -> EngineResult<ExecutionResult> {
        run_once(self.executor.as_ref(), &self.languages, code, language, stdin).await
    }

    /// Connectivity check against the execution service
    pub async fn self_test(&self, actor: &Actor) -> EngineResult<ExecutionResult> {
        access::ensure_can_manage_problems(actor)?;
        self.run(SELF_TEST_SOURCE, SELF_TEST_LANGUAGE, "").await
    }

    pub async fn create_problem(&self, draft: ProblemDraft, actor: &Actor) -> EngineResult<Problem> {
        access::ensure_can_manage_problems(actor)?;
        if draft.title.trim().is_empty() {
            return Err(EngineError::Validation("title is required".to_string()));
        }

        let problem = self.problems.create_problem(draft.into_problem(actor.id)).await?;
        info!(
            problem_id = %problem.id,
            test_cases = problem.test_cases.len(),
            "Problem created"
        );
        Ok(problem)
    }

    pub async fn list_problems(&self) -> EngineResult<Vec<Problem>> {
        self.problems.list_problems().await
    }

    pub async fn get_problem(&self, id: &Uuid) -> EngineResult<Problem> {
        self.problems.get_problem(id).await
    }

    pub async fn delete_problem(&self, id: &Uuid, actor: &Actor) -> EngineResult<()> {
        access::ensure_can_manage_problems(actor)?;
        self.problems.delete_problem(id).await?;
        info!(problem_id = %id, "Problem deleted");
        Ok(())
    }

    pub async fn list_submissions(&self, scope: SubmissionScope, actor: &Actor) -> EngineResult<Vec<Submission>> {
        let filter = access::visible_submissions(actor, scope)?;
        self.submissions.list_submissions(&filter).await
    }

    pub async fn get_submission(&self, id: &Uuid, actor: &Actor) -> EngineResult<Submission> {
        let submission = self.submissions.get_submission(id).await?;
        access::ensure_can_view_submission(actor, &submission)?;
        Ok(submission)
    }
}
