/// Test Evaluator - Language-Agnostic Verdict Logic
///
/// **Core Responsibility:**
/// Compare raw execution output against a test case's expected output and
/// fold per-case verdicts into an aggregate.
///
/// **Critical Properties:**
/// - Knows nothing about the execution service
/// - Knows nothing about storage
/// - Pure functions: (test case, raw result) → verdict; verdicts → aggregate
///
/// **Normalization Rules (Applied to All Languages):**
/// - Trim leading and trailing whitespace on both sides: YES
/// - Collapse internal whitespace: NO
/// - Case sensitivity: YES (exact match required)
/// - Numeric tolerance: NO

use codegrade_common::types::{Aggregate, ExecutionResult, TestCase, TestCaseOutcome};

/// Normalize output string for comparison
///
/// **Preserves:**
/// - Internal whitespace
/// - Case
/// - Empty lines within content
pub fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Judge a single test case against the raw execution result
pub fn evaluate_test(test_case: &TestCase, raw: ExecutionResult) -> TestCaseOutcome {
    let expected = normalize_output(&test_case.output).to_string();
    let actual = normalize_output(raw.stdout()).to_string();
    let ok = actual == expected;

    TestCaseOutcome {
        input: test_case.input.clone(),
        expected,
        actual,
        ok,
        raw,
    }
}

/// Fold verdicts into an aggregate. `details` keeps the given order.
pub fn aggregate_results(details: Vec<TestCaseOutcome>) -> Aggregate {
    let passed = details.iter().filter(|outcome| outcome.ok).count() as u32;

    Aggregate {
        passed,
        total: details.len() as u32,
        details,
    }
}
