pub mod access;
pub mod engine;
pub mod evaluator;
pub mod fakes;
pub mod orchestrator;

#[cfg(test)]
mod orchestrator_tests;

pub use engine::{CodeExecutor, Judge0Engine};
pub use orchestrator::{execute_test_cases, run_once, EvaluationOutcome, Orchestrator};
