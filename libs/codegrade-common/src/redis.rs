use crate::error::{EngineError, EngineResult};
use crate::store::{ProblemStore, SubmissionFilter, SubmissionStore};
use crate::types::{Problem, Submission};
use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Redis key layout - documents are JSON strings, indexes are sorted sets
/// scored by a global insertion counter so listings come back newest first

pub const PROBLEM_PREFIX: &str = "codegrade:problem";
pub const SUBMISSION_PREFIX: &str = "codegrade:submission";
pub const PROBLEMS_INDEX: &str = "codegrade:problems";
pub const SUBMISSIONS_INDEX: &str = "codegrade:submissions";
pub const SEQUENCE_KEY: &str = "codegrade:seq";

pub fn problem_key(id: &Uuid) -> String {
    format!("{}:{}", PROBLEM_PREFIX, id)
}

pub fn submission_key(id: &Uuid) -> String {
    format!("{}:{}", SUBMISSION_PREFIX, id)
}

pub fn problem_submissions_key(problem_id: &Uuid) -> String {
    format!("{}:problem:{}", SUBMISSIONS_INDEX, problem_id)
}

pub fn student_submissions_key(student_id: &Uuid) -> String {
    format!("{}:student:{}", SUBMISSIONS_INDEX, student_id)
}

/// Index holding the submissions selected by `filter`
pub fn submission_index(filter: &SubmissionFilter) -> String {
    match filter {
        SubmissionFilter::All => SUBMISSIONS_INDEX.to_string(),
        SubmissionFilter::Problem(id) => problem_submissions_key(id),
        SubmissionFilter::Student(id) => student_submissions_key(id),
    }
}

/// Problem and submission storage backed by Redis
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> EngineResult<Self> {
        let client = ::redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    /// Next index score; strictly increasing across every writer
    async fn next_sequence(&self) -> EngineResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(SEQUENCE_KEY, 1).await?)
    }

    /// Fetch the documents referenced by an index, newest first.
    /// Ids whose document has vanished are skipped.
    async fn load_indexed<T: DeserializeOwned>(&self, index: &str, prefix: &str) -> EngineResult<Vec<T>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrevrange(index, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = ::redis::pipe();
        for id in &ids {
            pipe.get(format!("{}:{}", prefix, id));
        }
        let payloads: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        payloads
            .into_iter()
            .flatten()
            .map(|payload| serde_json::from_str(&payload).map_err(EngineError::from))
            .collect()
    }
}

#[async_trait]
impl ProblemStore for RedisStore {
    async fn create_problem(&self, problem: Problem) -> EngineResult<Problem> {
        let payload = serde_json::to_string(&problem)?;
        let member = problem.id.to_string();
        let score = self.next_sequence().await?;
        let mut conn = self.conn.clone();

        ::redis::pipe()
            .atomic()
            .set(problem_key(&problem.id), payload)
            .ignore()
            .zadd(PROBLEMS_INDEX, &member, score)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(problem)
    }

    async fn get_problem(&self, id: &Uuid) -> EngineResult<Problem> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(problem_key(id)).await?;

        match payload {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Err(EngineError::problem_not_found(id)),
        }
    }

    async fn list_problems(&self) -> EngineResult<Vec<Problem>> {
        self.load_indexed(PROBLEMS_INDEX, PROBLEM_PREFIX).await
    }

    async fn delete_problem(&self, id: &Uuid) -> EngineResult<()> {
        let mut conn = self.conn.clone();
        let (deleted, _): (i64, i64) = ::redis::pipe()
            .atomic()
            .del(problem_key(id))
            .zrem(PROBLEMS_INDEX, id.to_string())
            .query_async(&mut conn)
            .await?;

        if deleted == 0 {
            return Err(EngineError::problem_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for RedisStore {
    async fn create_submission(&self, submission: Submission) -> EngineResult<Submission> {
        let payload = serde_json::to_string(&submission)?;
        let member = submission.id.to_string();
        let score = self.next_sequence().await?;
        let mut conn = self.conn.clone();

        // MULTI/EXEC: document and every index land together or not at all
        ::redis::pipe()
            .atomic()
            .set(submission_key(&submission.id), payload)
            .ignore()
            .zadd(SUBMISSIONS_INDEX, &member, score)
            .ignore()
            .zadd(problem_submissions_key(&submission.problem), &member, score)
            .ignore()
            .zadd(student_submissions_key(&submission.student), &member, score)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(submission)
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> EngineResult<Vec<Submission>> {
        self.load_indexed(&submission_index(filter), SUBMISSION_PREFIX).await
    }

    async fn get_submission(&self, id: &Uuid) -> EngineResult<Submission> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(submission_key(id)).await?;

        match payload {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Err(EngineError::submission_not_found(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Aggregate, ProblemDraft, TestCase};

    #[test]
    fn test_document_keys() {
        let id = Uuid::new_v4();
        assert_eq!(problem_key(&id), format!("codegrade:problem:{}", id));
        assert_eq!(submission_key(&id), format!("codegrade:submission:{}", id));
    }

    #[test]
    fn test_index_keys_are_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(submission_index(&SubmissionFilter::All), "codegrade:submissions");
        assert_eq!(
            submission_index(&SubmissionFilter::Problem(id)),
            format!("codegrade:submissions:problem:{}", id)
        );
        assert_eq!(
            submission_index(&SubmissionFilter::Student(id)),
            format!("codegrade:submissions:student:{}", id)
        );
        assert_ne!(
            submission_index(&SubmissionFilter::Problem(id)),
            submission_index(&SubmissionFilter::Student(id))
        );
    }

    async fn connect() -> RedisStore {
        RedisStore::connect("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_problem_lifecycle() {
        let store = connect().await;
        let problem = ProblemDraft {
            title: "Echo".to_string(),
            test_cases: vec![TestCase { input: "1".into(), output: "1".into() }],
            ..Default::default()
        }
        .into_problem(Uuid::new_v4());

        store.create_problem(problem.clone()).await.unwrap();
        assert_eq!(store.get_problem(&problem.id).await.unwrap(), problem);
        assert!(store.list_problems().await.unwrap().iter().any(|p| p.id == problem.id));

        store.delete_problem(&problem.id).await.unwrap();
        assert!(matches!(
            store.get_problem(&problem.id).await,
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_problem(&problem.id).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_submission_indexes() {
        let store = connect().await;
        let student = Uuid::new_v4();
        let problem = Uuid::new_v4();
        let aggregate = Aggregate { passed: 0, total: 0, details: vec![] };
        let submission = Submission::new(student, problem, "python", "pass", aggregate);

        store.create_submission(submission.clone()).await.unwrap();

        assert_eq!(store.get_submission(&submission.id).await.unwrap(), submission);
        let by_student = store.list_submissions(&SubmissionFilter::Student(student)).await.unwrap();
        assert_eq!(by_student, vec![submission.clone()]);
        let by_problem = store.list_submissions(&SubmissionFilter::Problem(problem)).await.unwrap();
        assert_eq!(by_problem, vec![submission]);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_same_instant_submissions_list_newest_first() {
        let store = connect().await;
        let student = Uuid::new_v4();
        let problem = Uuid::new_v4();
        let aggregate = Aggregate { passed: 0, total: 0, details: vec![] };

        let first = Submission::new(student, problem, "python", "first", aggregate.clone());
        let mut second = Submission::new(student, problem, "python", "second", aggregate);
        second.created_at = first.created_at;

        store.create_submission(first.clone()).await.unwrap();
        store.create_submission(second.clone()).await.unwrap();

        let listed = store.list_submissions(&SubmissionFilter::Student(student)).await.unwrap();
        assert_eq!(listed, vec![second, first]);
    }
}
