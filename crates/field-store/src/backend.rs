use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use field_engine::{
    Mutation, Persistence, PersistenceError, RemoveAnswerInput, SaveAnswerInput, SaveOperation,
    select_result,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::normalize::normalize;

/// One answer as kept by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAnswer {
    /// Raw (not base64 encoded) answer id.
    pub id: String,
    pub document: String,
    pub question: String,
    pub operation: SaveOperation,
    pub value: Value,
}

impl StoredAnswer {
    pub fn typename(&self) -> String {
        self.operation.answer_type().typename()
    }

    fn to_response(&self, id: String) -> Value {
        json!({
            "id": id,
            "__typename": self.typename(),
            "value": self.value,
            self.operation.answer_type().value_key(): self.value,
        })
    }
}

/// Answer backend kept in memory.
///
/// Answers are upserted by `(document, question)`; every mutation is logged,
/// and failures can be queued to exercise error paths.
#[derive(Default)]
pub struct InMemoryBackend {
    answers: RwLock<BTreeMap<(String, String), StoredAnswer>>,
    log: Mutex<Vec<Mutation>>,
    failures: Mutex<VecDeque<PersistenceError>>,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every mutation, as a remote service would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next mutation fail with `err`.
    pub fn fail_next(&self, err: PersistenceError) {
        self.failures.lock().push_back(err);
    }

    /// Stores an answer directly and returns its global id.
    pub fn seed(
        &self,
        document: &str,
        question: &str,
        operation: SaveOperation,
        value: &Value,
    ) -> Result<String, StoreError> {
        let stored = self.upsert(
            operation,
            SaveAnswerInput {
                question: question.to_string(),
                document: document.to_string(),
                value: value.clone(),
            },
        )?;
        Ok(self.global_id(&stored))
    }

    /// Global id the engine sees for `answer`.
    pub fn global_id(&self, answer: &StoredAnswer) -> String {
        self.encode_id(&answer.typename(), &answer.id)
    }

    pub fn get(&self, document: &str, question: &str) -> Option<StoredAnswer> {
        self.answers
            .read()
            .get(&(document.to_string(), question.to_string()))
            .cloned()
    }

    /// Stored values of one document keyed by question slug.
    pub fn answers(&self, document: &str) -> BTreeMap<String, Value> {
        self.answers
            .read()
            .values()
            .filter(|answer| answer.document == document)
            .map(|answer| (answer.question.clone(), answer.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.answers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.read().is_empty()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.log.lock().clone()
    }

    fn upsert(
        &self,
        operation: SaveOperation,
        input: SaveAnswerInput,
    ) -> Result<StoredAnswer, StoreError> {
        let value = normalize(operation, &input.value)?;
        let key = (input.document, input.question);
        let mut answers = self.answers.write();
        let id = answers
            .get(&key)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let stored = StoredAnswer {
            id,
            document: key.0.clone(),
            question: key.1.clone(),
            operation,
            value,
        };
        debug!(
            document = %stored.document,
            question = %stored.question,
            answer = %stored.id,
            "answer stored"
        );
        answers.insert(key, stored.clone());
        Ok(stored)
    }

    fn remove(&self, input: &RemoveAnswerInput) -> Result<StoredAnswer, StoreError> {
        let mut answers = self.answers.write();
        let key = answers
            .iter()
            .find(|(_, answer)| answer.id == input.answer)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| StoreError::NotFound(input.answer.clone()))?;
        let removed = answers
            .remove(&key)
            .ok_or_else(|| StoreError::NotFound(input.answer.clone()))?;
        debug!(document = %removed.document, question = %removed.question, "answer removed");
        Ok(removed)
    }
}

#[async_trait]
impl Persistence for InMemoryBackend {
    async fn mutate(
        &self,
        mutation: Mutation,
        result_path: &str,
    ) -> Result<Value, PersistenceError> {
        self.log.lock().push(mutation.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.failures.lock().pop_front() {
            debug!(mutation = mutation.name(), error = %err, "injected failure");
            return Err(err);
        }

        let name = mutation.name();
        let answer = match mutation {
            Mutation::Save { operation, input } => self.upsert(operation, input)?,
            Mutation::Remove(input) => self.remove(&input)?,
        };
        let id = self.global_id(&answer);
        let response = json!({ name: { "answer": answer.to_response(id) } });
        select_result(&response, result_path)
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("answers", &self.len())
            .field("mutations", &self.log.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save(question: &str, operation: SaveOperation, value: Value) -> Mutation {
        Mutation::Save {
            operation,
            input: SaveAnswerInput {
                question: question.into(),
                document: "doc-1".into(),
                value,
            },
        }
    }

    #[tokio::test]
    async fn saves_upsert_by_document_and_question() {
        let backend = InMemoryBackend::new();
        let first = save("age", SaveOperation::Integer, json!("41"));
        let path = first.result_path();
        let created = backend.mutate(first, &path).await.unwrap();
        assert_eq!(created["__typename"], "IntegerAnswer");
        assert_eq!(created["integerValue"], json!(41));

        let updated = backend
            .mutate(save("age", SaveOperation::Integer, json!(42)), &path)
            .await
            .unwrap();
        assert_eq!(created["id"], updated["id"]);
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.answers("doc-1").get("age"), Some(&json!(42)));
        assert_eq!(backend.mutations().len(), 2);
    }

    #[tokio::test]
    async fn removal_needs_a_stored_answer() {
        let backend = InMemoryBackend::new();
        backend
            .seed("doc-1", "tags", SaveOperation::List, &json!(["a"]))
            .unwrap();
        let raw = backend.get("doc-1", "tags").unwrap().id;

        let remove = Mutation::Remove(RemoveAnswerInput { answer: raw.clone() });
        let path = remove.result_path();
        backend.mutate(remove.clone(), &path).await.unwrap();
        assert!(backend.is_empty());

        let err = backend.mutate(remove, &path).await.unwrap_err();
        assert_eq!(err, PersistenceError::NotFound(raw));
    }

    #[test]
    fn seeded_ids_round_trip_through_the_adapter() {
        let backend = InMemoryBackend::new();
        let id = backend
            .seed("doc-1", "born", SaveOperation::Date, &json!("1990-01-31"))
            .unwrap();
        let stored = backend.get("doc-1", "born").unwrap();
        assert_eq!(id, backend.encode_id("DateAnswer", &stored.id));
        assert_eq!(backend.decode_id(&id), stored.id);
    }

    #[tokio::test]
    async fn queued_failures_fire_once() {
        let backend = InMemoryBackend::new();
        backend.fail_next(PersistenceError::Transport("offline".into()));
        let mutation = save("name", SaveOperation::String, json!("Ada"));
        let path = mutation.result_path();
        assert!(backend.mutate(mutation.clone(), &path).await.is_err());
        assert!(backend.is_empty());
        assert!(backend.mutate(mutation, &path).await.is_ok());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let backend = InMemoryBackend::new();
        let mutation = save("age", SaveOperation::Integer, json!("many"));
        let path = mutation.result_path();
        let err = backend.mutate(mutation, &path).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected { .. }));
    }
}
