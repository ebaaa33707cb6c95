//! Authorization predicates. Pure: no I/O, no state.

use codegrade_common::store::SubmissionFilter;
use codegrade_common::types::{Actor, Role, Submission};
use codegrade_common::{EngineError, EngineResult};
use uuid::Uuid;

/// Which submissions a caller asks to see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionScope {
    /// The caller's own submissions
    Mine,
    All,
    Problem(Uuid),
}

pub fn can_create_or_delete_problem(actor: &Actor) -> bool {
    actor.role == Role::Teacher
}

/// Teachers evaluate in preview mode and never produce a durable record
pub fn can_preview(actor: &Actor) -> bool {
    actor.role == Role::Teacher
}

pub fn ensure_can_manage_problems(actor: &Actor) -> EngineResult<()> {
    if can_create_or_delete_problem(actor) {
        Ok(())
    } else {
        Err(EngineError::Forbidden("Only teachers can create or delete problems".to_string()))
    }
}

/// Translate a requested scope into the store filter the caller may use
pub fn visible_submissions(actor: &Actor, scope: SubmissionScope) -> EngineResult<SubmissionFilter> {
    match (scope, actor.role) {
        (SubmissionScope::Mine, _) => Ok(SubmissionFilter::Student(actor.id)),
        (SubmissionScope::All, Role::Teacher) => Ok(SubmissionFilter::All),
        (SubmissionScope::Problem(id), Role::Teacher) => Ok(SubmissionFilter::Problem(id)),
        (_, Role::Student) => Err(EngineError::Forbidden(
            "Students can only view their own submissions".to_string(),
        )),
    }
}

pub fn ensure_can_view_submission(actor: &Actor, submission: &Submission) -> EngineResult<()> {
    match actor.role {
        Role::Teacher => Ok(()),
        Role::Student if submission.student == actor.id => Ok(()),
        Role::Student => Err(EngineError::Forbidden(
            "Not authorized for this submission".to_string(),
        )),
    }
}
