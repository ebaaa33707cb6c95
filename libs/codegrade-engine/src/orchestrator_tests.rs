/// Behavioural tests for the evaluation pipeline
///
/// All collaborators are fakes, so these cover:
/// 1. Ordering and sequencing of execution calls
/// 2. Role branching (preview vs. persisted submission)
/// 3. All-or-nothing behaviour on collaborator failure
/// 4. Failure classification for unknown languages and problems

#[cfg(test)]
mod evaluation_tests {
    use std::sync::Arc;

    use codegrade_common::config::LanguageTable;
    use codegrade_common::store::{SubmissionFilter, SubmissionStore};
    use codegrade_common::types::{Actor, ExecutionResult, Problem, ProblemDraft, TestCase};
    use codegrade_common::EngineError;
    use serde_json::json;
    use uuid::Uuid;

    use crate::access::SubmissionScope;
    use crate::fakes::{MemoryProblemStore, MemorySubmissionStore, ScriptedExecutor};
    use crate::orchestrator::{self_test_passed, EvaluationOutcome, Orchestrator};

    struct Harness {
        orchestrator: Orchestrator,
        executor: Arc<ScriptedExecutor>,
        submissions: Arc<MemorySubmissionStore>,
    }

    fn problem_with(cases: &[(&str, &str)]) -> Problem {
        ProblemDraft {
            title: "Adder".to_string(),
            test_cases: cases
                .iter()
                .map(|(input, output)| TestCase {
                    input: input.to_string(),
                    output: output.to_string(),
                })
                .collect(),
            ..Default::default()
        }
        .into_problem(Uuid::new_v4())
    }

    async fn harness(problems: Vec<Problem>, executor: ScriptedExecutor) -> Harness {
        let executor = Arc::new(executor);
        let submissions = Arc::new(MemorySubmissionStore::new());
        let orchestrator = Orchestrator::new(
            executor.clone(),
            Arc::new(MemoryProblemStore::with_problems(problems).await),
            submissions.clone(),
            Arc::new(LanguageTable::builtin()),
        );
        Harness {
            orchestrator,
            executor,
            submissions,
        }
    }

    #[tokio::test]
    async fn test_details_follow_stored_case_order() {
        let problem = problem_with(&[("1", "1"), ("2", "2"), ("3", "3"), ("4", "4")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;

        let outcome = h
            .orchestrator
            .evaluate(&problem.id, "echo", "python", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(outcome.total(), 4);
        assert_eq!(outcome.details().len(), 4);
        let inputs: Vec<&str> = outcome.details().iter().map(|d| d.input.as_str()).collect();
        assert_eq!(inputs, vec!["1", "2", "3", "4"]);

        let stdins: Vec<String> = h.executor.requests().await.into_iter().map(|r| r.stdin).collect();
        assert_eq!(stdins, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_cases_never_overlap() {
        let problem = problem_with(&[("a", "a"), ("b", "b"), ("c", "c"), ("d", "d"), ("e", "e")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;

        h.orchestrator
            .evaluate(&problem.id, "echo", "c", &Actor::student(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(h.executor.call_count().await, 5);
        assert_eq!(h.executor.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_code_and_language_id() {
        let problem = problem_with(&[("5", "5")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;

        h.orchestrator
            .evaluate(&problem.id, "int main(){}", "cpp", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap();

        let requests = h.executor.requests().await;
        assert_eq!(requests[0].source_code, "int main(){}");
        assert_eq!(requests[0].language_id, 54);
        assert_eq!(requests[0].stdin, "5");
    }

    #[tokio::test]
    async fn test_passed_counts_ok_details() {
        let problem = problem_with(&[("", "1"), ("", "2"), ("", "3")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::with_stdouts(vec!["1", "0", "3\n"])).await;

        let outcome = h
            .orchestrator
            .evaluate(&problem.id, "code", "java", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap();

        let ok_count = outcome.details().iter().filter(|d| d.ok).count() as u32;
        assert_eq!(outcome.passed(), 2);
        assert_eq!(outcome.passed(), ok_count);
        assert!(outcome.passed() <= outcome.total());
    }

    #[tokio::test]
    async fn test_mismatch_does_not_stop_remaining_cases() {
        let problem = problem_with(&[("", "x"), ("", "y"), ("", "z")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::with_stdouts(vec!["wrong", "wrong", "z"])).await;

        let outcome = h
            .orchestrator
            .evaluate(&problem.id, "code", "python", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(h.executor.call_count().await, 3);
        let oks: Vec<bool> = outcome.details().iter().map(|d| d.ok).collect();
        assert_eq!(oks, vec![false, false, true]);
    }

    #[tokio::test]
    async fn test_teacher_gets_preview_without_submission() {
        let problem = problem_with(&[("2 3", "5\n"), ("1 1", "3")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::with_stdouts(vec!["5", "2"])).await;

        let outcome = h
            .orchestrator
            .evaluate(&problem.id, "code", "python", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(matches!(outcome, EvaluationOutcome::Preview(_)));
        assert_eq!(outcome.passed(), 1);
        assert_eq!(outcome.total(), 2);
        assert!(h.submissions.is_empty().await);
    }

    #[tokio::test]
    async fn test_student_gets_exactly_one_submission() {
        let problem = problem_with(&[("2 3", "5\n"), ("1 1", "3")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::with_stdouts(vec!["5", "2"])).await;
        let student = Actor::student(Uuid::new_v4());

        let outcome = h
            .orchestrator
            .evaluate(&problem.id, "a, b = ...", "python", &student)
            .await
            .unwrap();

        let submission = match &outcome {
            EvaluationOutcome::Submitted(submission) => submission.clone(),
            other => panic!("expected submitted outcome, got {:?}", other),
        };
        assert_eq!(outcome.passed(), 1);
        assert_eq!(outcome.total(), 2);

        let stored = h.submissions.all().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], submission);
        assert_eq!(stored[0].student, student.id);
        assert_eq!(stored[0].problem, problem.id);
        assert_eq!(stored[0].language, "python");
        assert_eq!(stored[0].code, "a, b = ...");
        assert_eq!(stored[0].details, outcome.details().to_vec());
    }

    #[tokio::test]
    async fn test_outcome_wire_shape() {
        let problem = problem_with(&[("", "1")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::with_stdouts(vec!["1", "1"])).await;

        let preview = h
            .orchestrator
            .evaluate(&problem.id, "c", "python", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap();
        let preview = serde_json::to_value(&preview).unwrap();
        assert_eq!(preview["mode"], json!("preview"));
        assert_eq!(preview["passed"], json!(1));
        assert_eq!(preview["total"], json!(1));
        assert_eq!(preview["details"][0]["actual"], json!("1"));

        let submitted = h
            .orchestrator
            .evaluate(&problem.id, "c", "python", &Actor::student(Uuid::new_v4()))
            .await
            .unwrap();
        let submitted = serde_json::to_value(&submitted).unwrap();
        assert_eq!(submitted["mode"], json!("submitted"));
        assert_eq!(submitted["passed"], json!(1));
        assert!(submitted["id"].is_string());
    }

    #[tokio::test]
    async fn test_identical_runs_yield_identical_aggregates() {
        let problem = problem_with(&[("1", "1"), ("2", "3")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;
        let teacher = Actor::teacher(Uuid::new_v4());

        let first = h.orchestrator.evaluate(&problem.id, "c", "python", &teacher).await.unwrap();
        let second = h.orchestrator.evaluate(&problem.id, "c", "python", &teacher).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_before_any_call() {
        let problem = problem_with(&[("", "")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;

        let err = h
            .orchestrator
            .evaluate(&problem.id, "puts 1", "ruby", &Actor::student(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::UnsupportedLanguage(ref l) if l == "ruby"));
        assert_eq!(h.executor.call_count().await, 0);
        assert!(h.submissions.is_empty().await);
    }

    #[tokio::test]
    async fn test_failure_mid_run_is_all_or_nothing() {
        let problem = problem_with(&[("1", "1"), ("2", "2"), ("3", "3")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::failing_on_call(1)).await;

        let err = h
            .orchestrator
            .evaluate(&problem.id, "echo", "python", &Actor::student(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ServiceUnavailable(_)));
        // third case never dispatched
        assert_eq!(h.executor.call_count().await, 2);
        assert!(h.submissions.is_empty().await);
    }

    #[tokio::test]
    async fn test_timeout_propagates_unchanged() {
        let problem = problem_with(&[("1", "1")]);
        let executor = ScriptedExecutor::new(|_, _| Err(EngineError::Timeout(20)));
        let h = harness(vec![problem.clone()], executor).await;

        let err = h
            .orchestrator
            .evaluate(&problem.id, "echo", "python", &Actor::teacher(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Timeout(20)));
    }

    #[tokio::test]
    async fn test_missing_problem_is_not_found_for_every_role() {
        let h = harness(vec![], ScriptedExecutor::echo()).await;
        let missing = Uuid::new_v4();

        for actor in [Actor::teacher(Uuid::new_v4()), Actor::student(Uuid::new_v4())] {
            let err = h.orchestrator.evaluate(&missing, "x", "python", &actor).await.unwrap_err();
            assert!(matches!(err, EngineError::NotFound { .. }));
        }
        assert_eq!(h.executor.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_problem_without_cases_yields_empty_aggregate() {
        let problem = problem_with(&[]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;

        let outcome = h
            .orchestrator
            .evaluate(&problem.id, "x", "python", &Actor::student(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(outcome.passed(), 0);
        assert_eq!(outcome.total(), 0);
        assert_eq!(h.submissions.len().await, 1);
    }

    #[tokio::test]
    async fn test_run_returns_raw_result() {
        let executor = ScriptedExecutor::new(|_, request| {
            let mut fields = serde_json::Map::new();
            fields.insert("stdout".into(), json!(format!("got {}", request.stdin)));
            fields.insert("stderr".into(), json!(null));
            fields.insert("memory".into(), json!(1024));
            Ok(ExecutionResult::from_map(fields))
        });
        let h = harness(vec![], executor).await;

        let result = h.orchestrator.run("code", "javascript", "42").await.unwrap();

        assert_eq!(result.stdout(), "got 42");
        assert_eq!(result.get("memory"), Some(&json!(1024)));
        let requests = h.executor.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].language_id, 63);
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_language() {
        let h = harness(vec![], ScriptedExecutor::echo()).await;
        let err = h.orchestrator.run("code", "cobol", "").await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedLanguage(_)));
        assert_eq!(h.executor.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_run_propagates_collaborator_failure() {
        let h = harness(vec![], ScriptedExecutor::failing_on_call(0)).await;
        let err = h.orchestrator.run("code", "python", "").await.unwrap_err();
        assert!(matches!(err, EngineError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_self_test_is_teacher_only() {
        let h = harness(vec![], ScriptedExecutor::with_stdouts(vec!["3\n"])).await;

        let err = h.orchestrator.self_test(&Actor::student(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let result = h.orchestrator.self_test(&Actor::teacher(Uuid::new_v4())).await.unwrap();
        assert_eq!(result.stdout(), "3\n");
        assert_eq!(h.executor.requests().await[0].source_code, "print(1+2)");
        assert!(self_test_passed(&result));
    }

    #[test]
    fn test_self_test_answer_check() {
        assert!(self_test_passed(&ExecutionResult::with_output("3", "")));
        assert!(self_test_passed(&ExecutionResult::with_output(" 3\n", "")));
        assert!(!self_test_passed(&ExecutionResult::with_output("4\n", "")));
        assert!(!self_test_passed(&ExecutionResult::default()));
    }

    #[tokio::test]
    async fn test_problem_management_policy() {
        let h = harness(vec![], ScriptedExecutor::echo()).await;
        let teacher = Actor::teacher(Uuid::new_v4());
        let student = Actor::student(Uuid::new_v4());
        let draft = ProblemDraft {
            title: "Reverse".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            h.orchestrator.create_problem(draft.clone(), &student).await,
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            h.orchestrator
                .create_problem(ProblemDraft { title: "  ".into(), ..Default::default() }, &teacher)
                .await,
            Err(EngineError::Validation(_))
        ));

        let problem = h.orchestrator.create_problem(draft, &teacher).await.unwrap();
        assert_eq!(problem.created_by, teacher.id);
        assert_eq!(h.orchestrator.list_problems().await.unwrap().len(), 1);

        assert!(matches!(
            h.orchestrator.delete_problem(&problem.id, &student).await,
            Err(EngineError::Forbidden(_))
        ));
        h.orchestrator.delete_problem(&problem.id, &teacher).await.unwrap();
        assert!(matches!(
            h.orchestrator.get_problem(&problem.id).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_submission_reads_respect_ownership() {
        let problem = problem_with(&[("1", "1")]);
        let h = harness(vec![problem.clone()], ScriptedExecutor::echo()).await;
        let alice = Actor::student(Uuid::new_v4());
        let bob = Actor::student(Uuid::new_v4());
        let teacher = Actor::teacher(Uuid::new_v4());

        h.orchestrator.evaluate(&problem.id, "x", "python", &alice).await.unwrap();
        h.orchestrator.evaluate(&problem.id, "y", "python", &bob).await.unwrap();

        let mine = h.orchestrator.list_submissions(SubmissionScope::Mine, &alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].student, alice.id);

        assert!(matches!(
            h.orchestrator.list_submissions(SubmissionScope::All, &alice).await,
            Err(EngineError::Forbidden(_))
        ));
        let all = h.orchestrator.list_submissions(SubmissionScope::All, &teacher).await.unwrap();
        assert_eq!(all.len(), 2);
        let for_problem = h
            .orchestrator
            .list_submissions(SubmissionScope::Problem(problem.id), &teacher)
            .await
            .unwrap();
        assert_eq!(for_problem.len(), 2);

        let bobs = h
            .submissions
            .list_submissions(&SubmissionFilter::Student(bob.id))
            .await
            .unwrap();
        assert!(matches!(
            h.orchestrator.get_submission(&bobs[0].id, &alice).await,
            Err(EngineError::Forbidden(_))
        ));
        assert_eq!(h.orchestrator.get_submission(&bobs[0].id, &bob).await.unwrap(), bobs[0]);
        assert_eq!(h.orchestrator.get_submission(&bobs[0].id, &teacher).await.unwrap(), bobs[0]);
        assert!(matches!(
            h.orchestrator.get_submission(&Uuid::new_v4(), &teacher).await,
            Err(EngineError::NotFound { .. })
        ));
    }
}
