use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::answer::AnswerSpec;
use crate::spec::question::QuestionSpec;

/// Nested form used by form and table questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
}

/// A form instance: its questions plus whatever answers were persisted so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    pub questions: Vec<QuestionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<AnswerSpec>,
}
