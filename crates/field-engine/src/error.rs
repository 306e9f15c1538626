use thiserror::Error;

use crate::persistence::PersistenceError;
use crate::spec::AnswerType;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("field '{0}' has no answer to save")]
    NoAnswer(String),
    #[error("answers of type {0} cannot be saved")]
    Unsavable(AnswerType),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("save of field '{field}' did not complete: {reason}")]
    Interrupted { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question '{0}' is defined more than once")]
    DuplicateQuestion(String),
    #[error("answer references unknown question '{0}'")]
    UnknownQuestion(String),
}
