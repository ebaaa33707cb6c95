use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Caller role as forwarded by the gateway; parsing is exact and case-sensitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Teacher,
    Student,
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Teacher" => Ok(Role::Teacher),
            "Student" => Ok(Role::Student),
            other => Err(EngineError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => write!(f, "Teacher"),
            Role::Student => write!(f, "Student"),
        }
    }
}

/// Authenticated caller as forwarded by the request-handling layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn teacher(id: Uuid) -> Self {
        Self { id, role: Role::Teacher }
    }

    pub fn student(id: Uuid) -> Self {
        Self { id, role: Role::Student }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

/// A coding exercise. Test case order is significant: it is the order in
/// which cases are executed and reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// language name -> starter source
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by a teacher when creating a problem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl ProblemDraft {
    pub fn into_problem(self, created_by: Uuid) -> Problem {
        Problem {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            starter_code: self.starter_code,
            test_cases: self.test_cases,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// One call to the execution service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
}

/// Raw response of the execution service.
///
/// Kept as an opaque JSON object so every field the service reports is
/// preserved for auditing. Only `stdout` and `stderr` are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionResult(Map<String, Value>);

impl ExecutionResult {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a result carrying only captured output
    pub fn with_output(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("stdout".to_string(), Value::String(stdout.into()));
        fields.insert("stderr".to_string(), Value::String(stderr.into()));
        Self(fields)
    }

    /// Captured stdout; missing or null reads as empty
    pub fn stdout(&self) -> &str {
        self.text_field("stdout")
    }

    /// Captured stderr; missing or null reads as empty
    pub fn stderr(&self) -> &str {
        self.text_field("stderr")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn text_field(&self, name: &str) -> &str {
        self.0.get(name).and_then(Value::as_str).unwrap_or("")
    }
}

/// Verdict of a single test case. `expected` and `actual` are stored trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseOutcome {
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub ok: bool,
    pub raw: ExecutionResult,
}

/// Summary of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub passed: u32,
    pub total: u32,
    pub details: Vec<TestCaseOutcome>,
}

/// Durable record of a student's graded attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub student: Uuid,
    pub problem: Uuid,
    pub language: String,
    pub code: String,
    pub passed: u32,
    pub total: u32,
    pub details: Vec<TestCaseOutcome>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(student: Uuid, problem: Uuid, language: &str, code: &str, aggregate: Aggregate) -> Self {
        Self {
            id: Uuid::new_v4(),
            student,
            problem,
            language: language.to_string(),
            code: code.to_string(),
            passed: aggregate.passed,
            total: aggregate.total,
            details: aggregate.details,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing_is_exact() {
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("Student".parse::<Role>().unwrap(), Role::Student);
        assert!("teacher".parse::<Role>().is_err());
        assert!(matches!("Admin".parse::<Role>(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_execution_result_preserves_unknown_fields() {
        let raw = json!({
            "stdout": "3\n",
            "stderr": null,
            "time": "0.01",
            "status": { "id": 3, "description": "Accepted" }
        });
        let result: ExecutionResult = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(result.stdout(), "3\n");
        assert_eq!(result.stderr(), "");
        assert_eq!(result.get("time"), Some(&json!("0.01")));
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }

    #[test]
    fn test_execution_result_missing_stdout_reads_empty() {
        let result: ExecutionResult = serde_json::from_value(json!({ "compile_output": "oops" })).unwrap();
        assert_eq!(result.stdout(), "");
    }

    #[test]
    fn test_problem_defaults_optional_fields() {
        let problem: Problem = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "title": "Sum",
            "created_by": Uuid::new_v4(),
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(problem.description.is_empty());
        assert!(problem.starter_code.is_empty());
        assert!(problem.test_cases.is_empty());
    }

    #[test]
    fn test_submission_copies_aggregate() {
        let aggregate = Aggregate {
            passed: 1,
            total: 2,
            details: vec![],
        };
        let student = Uuid::new_v4();
        let problem = Uuid::new_v4();
        let submission = Submission::new(student, problem, "python", "print(1)", aggregate);

        assert_eq!(submission.student, student);
        assert_eq!(submission.problem, problem);
        assert_eq!(submission.passed, 1);
        assert_eq!(submission.total, 2);
        assert_eq!(submission.language, "python");
    }
}
