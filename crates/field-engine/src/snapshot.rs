use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::Field;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: Value,
    #[serde(default)]
    pub hidden: bool,
}

/// Point-in-time copy of a document's answers, keyed by question slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSnapshot {
    pub document: String,
    pub answers: BTreeMap<String, SnapshotEntry>,
}

impl AnswerSnapshot {
    pub fn from_fields(document: &str, fields: &[Arc<Field>]) -> Self {
        let answers = fields
            .iter()
            .filter_map(|field| {
                let answer = field.answer()?;
                Some((
                    field.question().slug().to_string(),
                    SnapshotEntry {
                        id: answer.id,
                        value: answer.value,
                        hidden: field.hidden(),
                    },
                ))
            })
            .collect();
        Self {
            document: document.to_string(),
            answers,
        }
    }

    pub fn value(&self, slug: &str) -> Option<&Value> {
        self.answers.get(slug).map(|entry| &entry.value)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}
