use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::spec::AnswerType;

/// Save mutation used for each persistable answer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveOperation {
    String,
    Integer,
    Float,
    List,
    File,
    Date,
    Table,
}

impl SaveOperation {
    /// `None` for answer types the backend cannot save directly.
    pub const fn for_answer(kind: AnswerType) -> Option<Self> {
        match kind {
            AnswerType::String => Some(SaveOperation::String),
            AnswerType::Integer => Some(SaveOperation::Integer),
            AnswerType::Float => Some(SaveOperation::Float),
            AnswerType::List => Some(SaveOperation::List),
            AnswerType::File => Some(SaveOperation::File),
            AnswerType::Date => Some(SaveOperation::Date),
            AnswerType::Table => Some(SaveOperation::Table),
            AnswerType::Form => None,
        }
    }

    pub const fn answer_type(self) -> AnswerType {
        match self {
            SaveOperation::String => AnswerType::String,
            SaveOperation::Integer => AnswerType::Integer,
            SaveOperation::Float => AnswerType::Float,
            SaveOperation::List => AnswerType::List,
            SaveOperation::File => AnswerType::File,
            SaveOperation::Date => AnswerType::Date,
            SaveOperation::Table => AnswerType::Table,
        }
    }

    pub fn mutation_name(&self) -> &'static str {
        match self {
            SaveOperation::String => "saveDocumentStringAnswer",
            SaveOperation::Integer => "saveDocumentIntegerAnswer",
            SaveOperation::Float => "saveDocumentFloatAnswer",
            SaveOperation::List => "saveDocumentListAnswer",
            SaveOperation::File => "saveDocumentFileAnswer",
            SaveOperation::Date => "saveDocumentDateAnswer",
            SaveOperation::Table => "saveDocumentTableAnswer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAnswerInput {
    pub question: String,
    pub document: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveAnswerInput {
    /// Backend (decoded) answer id.
    pub answer: String,
}

/// A write the persistence adapter must execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Mutation {
    Save {
        operation: SaveOperation,
        input: SaveAnswerInput,
    },
    Remove(RemoveAnswerInput),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Save { operation, .. } => operation.mutation_name(),
            Mutation::Remove(_) => "removeAnswer",
        }
    }

    /// Dotted path of the answer object inside the mutation response.
    pub fn result_path(&self) -> String {
        format!("{}.answer", self.name())
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Mutation::Remove(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend rejected {mutation}: {message}")]
    Rejected { mutation: String, message: String },
    #[error("answer '{0}' not found")]
    NotFound(String),
    #[error("response has no value at '{0}'")]
    MissingResult(String),
}

/// Backend that executes answer mutations.
///
/// Implementations also own the mapping between the global ids fields carry
/// and the raw ids the backend expects.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Executes `mutation` and returns the value found at `result_path` in
    /// the response.
    async fn mutate(&self, mutation: Mutation, result_path: &str)
    -> Result<Value, PersistenceError>;

    fn decode_id(&self, id: &str) -> String {
        decode_global_id(id)
            .map(|(_, raw)| raw)
            .unwrap_or_else(|| id.to_string())
    }

    fn encode_id(&self, typename: &str, raw: &str) -> String {
        encode_global_id(typename, raw)
    }
}

/// Encodes `Typename:raw` as base64, the global id format of the backend.
pub fn encode_global_id(typename: &str, raw: &str) -> String {
    STANDARD.encode(format!("{typename}:{raw}"))
}

/// Splits a global id into `(typename, raw)`; `None` when `id` is not one.
pub fn decode_global_id(id: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(id).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (typename, raw) = decoded.split_once(':')?;
    if typename.is_empty() || raw.is_empty() {
        return None;
    }
    Some((typename.to_string(), raw.to_string()))
}

/// Follows a dotted `result_path` into a response body.
pub fn select_result(response: &Value, result_path: &str) -> Result<Value, PersistenceError> {
    result_path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(response, |current, segment| current.get(segment))
        .cloned()
        .ok_or_else(|| PersistenceError::MissingResult(result_path.to_string()))
}
