#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use field_engine::{
    DocumentRef, Field, FieldContext, Mutation, Persistence, PersistenceError, QuestionKind,
    QuestionSpec, QuestionType, encode_global_id,
};

/// Persistence stub that records every mutation and answers with either a
/// queued response or an echo of the saved value.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Mutation>>,
    queued: Mutex<VecDeque<Result<Value, PersistenceError>>>,
    latency: Option<Duration>,
    next_id: AtomicU64,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency: Some(latency),
            ..Self::default()
        })
    }

    pub fn queue(&self, response: Result<Value, PersistenceError>) {
        self.queued.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<Mutation> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Persistence for RecordingBackend {
    async fn mutate(
        &self,
        mutation: Mutation,
        _result_path: &str,
    ) -> Result<Value, PersistenceError> {
        self.calls.lock().push(mutation.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(response) = self.queued.lock().pop_front() {
            return response;
        }
        let raw = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        match mutation {
            Mutation::Save { operation, input } => Ok(json!({
                "id": encode_global_id(&operation.answer_type().typename(), &raw.to_string()),
                "value": input.value,
            })),
            Mutation::Remove(input) => Ok(json!({ "id": input.answer })),
        }
    }
}

pub fn context(backend: &Arc<RecordingBackend>) -> FieldContext {
    let persistence: Arc<dyn Persistence> = backend.clone();
    FieldContext::new(persistence)
}

/// A question of the given type with no constraints.
pub fn plain_kind(question_type: QuestionType) -> QuestionKind {
    match question_type {
        QuestionType::Text => QuestionKind::Text {
            text_max_length: None,
        },
        QuestionType::Textarea => QuestionKind::Textarea {
            textarea_max_length: None,
        },
        QuestionType::Integer => QuestionKind::Integer {
            integer_min_value: None,
            integer_max_value: None,
        },
        QuestionType::Float => QuestionKind::Float {
            float_min_value: None,
            float_max_value: None,
        },
        QuestionType::MultipleChoice => QuestionKind::MultipleChoice {
            multiple_choice_options: Vec::new(),
        },
        QuestionType::Choice => QuestionKind::Choice {
            choice_options: Vec::new(),
        },
        QuestionType::DynamicChoice => QuestionKind::DynamicChoice {
            dynamic_choice_options: Vec::new(),
        },
        QuestionType::DynamicMultipleChoice => QuestionKind::DynamicMultipleChoice {
            dynamic_multiple_choice_options: Vec::new(),
        },
        QuestionType::Table => QuestionKind::Table { row_form: None },
        QuestionType::Form => QuestionKind::Form { sub_form: None },
        QuestionType::File => QuestionKind::File,
        QuestionType::Static => QuestionKind::Static {
            static_content: None,
        },
        QuestionType::Date => QuestionKind::Date,
    }
}

/// A standalone field of document `doc-1`.
pub fn field(context: &FieldContext, question: QuestionSpec) -> Arc<Field> {
    Arc::new(Field::new(
        context,
        DocumentRef::detached("doc-1"),
        question,
        None,
    ))
}

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap()
}
