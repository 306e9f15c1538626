use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage shape of an answer value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum AnswerType {
    String,
    Integer,
    Float,
    List,
    Table,
    Form,
    File,
    Date,
}

impl AnswerType {
    pub const ALL: [AnswerType; 8] = [
        AnswerType::String,
        AnswerType::Integer,
        AnswerType::Float,
        AnswerType::List,
        AnswerType::Table,
        AnswerType::Form,
        AnswerType::File,
        AnswerType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::String => "String",
            AnswerType::Integer => "Integer",
            AnswerType::Float => "Float",
            AnswerType::List => "List",
            AnswerType::Table => "Table",
            AnswerType::Form => "Form",
            AnswerType::File => "File",
            AnswerType::Date => "Date",
        }
    }

    /// GraphQL-style type name, e.g. `StringAnswer`.
    pub fn typename(&self) -> String {
        format!("{}Answer", self.as_str())
    }

    /// Key under which the backend reports the typed value, e.g. `stringValue`.
    pub fn value_key(&self) -> &'static str {
        match self {
            AnswerType::String => "stringValue",
            AnswerType::Integer => "integerValue",
            AnswerType::Float => "floatValue",
            AnswerType::List => "listValue",
            AnswerType::Table => "tableValue",
            AnswerType::Form => "formValue",
            AnswerType::File => "fileValue",
            AnswerType::Date => "dateValue",
        }
    }
}

impl std::fmt::Display for AnswerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw answer payload as stored alongside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Slug of the answered question.
    pub question: String,
    #[serde(default)]
    pub value: Value,
}

/// Answer owned by a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub id: Option<String>,
    pub kind: AnswerType,
    pub question: String,
    pub document: String,
    pub value: Value,
}

impl Answer {
    pub fn new(
        kind: AnswerType,
        spec: Option<AnswerSpec>,
        question: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        let question = question.into();
        match spec {
            Some(spec) => Self {
                id: spec.id,
                kind,
                question,
                document: document.into(),
                value: spec.value,
            },
            None => Self {
                id: None,
                kind,
                question,
                document: document.into(),
                value: Value::Null,
            },
        }
    }

    /// `null`, an empty string or an empty list.
    pub fn is_empty(&self) -> bool {
        is_empty_value(&self.value)
    }

    /// Applies the fields returned by a save to this answer.
    pub fn merge_response(&mut self, response: &Value) {
        if let Some(id) = response.get("id").and_then(Value::as_str) {
            self.id = Some(id.to_string());
        }
        if let Some(value) = response
            .get("value")
            .or_else(|| response.get(self.kind.value_key()))
        {
            self.value = value.clone();
        }
    }
}

/// Presence check of the required rule: whitespace-only text counts as blank.
pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::String(text) => text.trim().is_empty(),
        other => is_empty_value(other),
    }
}

pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn synthesized_answer_is_empty_and_new() {
        let answer = Answer::new(AnswerType::List, None, "colors", "doc-1");
        assert!(answer.id.is_none());
        assert!(answer.is_empty());
        assert_eq!(answer.question, "colors");
    }

    #[test]
    fn whitespace_is_blank_but_not_empty() {
        assert!(is_blank_value(&json!("  \t ")));
        assert!(!is_empty_value(&json!("  \t ")));
        assert!(is_blank_value(&json!([])));
        assert!(!is_blank_value(&json!(" a ")));
        assert!(!is_blank_value(&json!(0)));
    }

    #[test]
    fn merge_reads_generic_and_typed_values() {
        let mut answer = Answer::new(AnswerType::Integer, None, "age", "doc-1");
        answer.merge_response(&json!({ "id": "QW5zd2VyOjE=", "integerValue": 42 }));
        assert_eq!(answer.id.as_deref(), Some("QW5zd2VyOjE="));
        assert_eq!(answer.value, json!(42));

        answer.merge_response(&json!({ "value": 7 }));
        assert_eq!(answer.value, json!(7));
        assert_eq!(answer.id.as_deref(), Some("QW5zd2VyOjE="));
    }
}
