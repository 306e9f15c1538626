use std::future::Future;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dependency::{Cascade, CascadePath, DependencyKey, DependentFields};
use crate::document::Document;
use crate::error::FieldError;
use crate::events::{EventBus, FieldEvent, Subscriber};
use crate::format::{KeyFormatter, MessageFormatter};
use crate::persistence::{Mutation, Persistence, RemoveAnswerInput, SaveAnswerInput, SaveOperation};
use crate::spec::{Answer, AnswerSpec, Question, QuestionSpec, QuestionType};
use crate::task::{RestartableTask, TaskOutcome};
use crate::validate::{ValidationError, run_rules};

/// Collaborators shared by every field of a document.
#[derive(Clone)]
pub struct FieldContext {
    persistence: Arc<dyn Persistence>,
    formatter: Arc<dyn MessageFormatter>,
}

impl FieldContext {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self {
            persistence,
            formatter: Arc::new(KeyFormatter),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    pub fn formatter(&self) -> &Arc<dyn MessageFormatter> {
        &self.formatter
    }
}

impl std::fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldContext").finish_non_exhaustive()
    }
}

/// Back-reference from a field to the document owning it.
#[derive(Debug, Clone)]
pub struct DocumentRef {
    id: String,
    document: Weak<Document>,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>, document: Weak<Document>) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }

    /// A reference to a document that is not built as a [`Document`].
    pub fn detached(id: impl Into<String>) -> Self {
        Self::new(id, Weak::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn upgrade(&self) -> Option<Arc<Document>> {
        self.document.upgrade()
    }
}

pub fn field_id(document_id: &str, slug: &str) -> String {
    format!("Document:{document_id}:Question:{slug}")
}

/// One question of a document together with its answer.
pub struct Field {
    id: String,
    document: DocumentRef,
    question: Question,
    answer: Option<RwLock<Answer>>,
    errors: RwLock<Vec<ValidationError>>,
    dependent_fields: DependentFields,
    events: EventBus,
    validate_task: RestartableTask,
    save_task: RestartableTask,
    child_document: Option<Arc<Document>>,
    context: FieldContext,
}

impl Field {
    /// Builds the field and its question; value-bearing questions always get
    /// an answer, synthesized empty when none was persisted.
    pub fn new(
        context: &FieldContext,
        document: DocumentRef,
        question: QuestionSpec,
        answer: Option<AnswerSpec>,
    ) -> Self {
        assert!(!question.slug.is_empty(), "question slug must not be empty");

        let id = field_id(document.id(), &question.slug);
        let answer_type = question.kind.question_type().answer_type();
        if answer_type.is_none() && answer.is_some() {
            debug!(field = %id, "dropping answer of a question without values");
        }
        let answer = answer_type
            .map(|kind| RwLock::new(Answer::new(kind, answer, &question.slug, document.id())));
        let question = Question::new(question, &id);

        Self {
            id,
            document,
            question,
            answer,
            errors: RwLock::new(Vec::new()),
            dependent_fields: DependentFields::default(),
            events: EventBus::default(),
            validate_task: RestartableTask::new("validate"),
            save_task: RestartableTask::new("save"),
            child_document: None,
            context: context.clone(),
        }
    }

    pub fn with_child_document(mut self, child: Arc<Document>) -> Self {
        self.child_document = Some(child);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn question_type(&self) -> QuestionType {
        self.question.question_type()
    }

    pub fn child_document(&self) -> Option<&Arc<Document>> {
        self.child_document.as_ref()
    }

    /// Current answer, if the question carries a value.
    pub fn answer(&self) -> Option<Answer> {
        self.answer.as_ref().map(|answer| answer.read().clone())
    }

    pub fn has_answer(&self) -> bool {
        self.answer.is_some()
    }

    pub fn value(&self) -> Value {
        self.answer
            .as_ref()
            .map(|answer| answer.read().value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.read().is_empty()
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Never saved to the backend.
    pub fn is_new(&self) -> bool {
        self.answer
            .as_ref()
            .is_none_or(|answer| answer.read().id.is_none())
    }

    pub fn optional(&self) -> bool {
        self.question.optional()
    }

    pub fn hidden(&self) -> bool {
        self.question.hidden()
    }

    pub fn visible_in_navigation(&self) -> bool {
        !self.hidden()
            && self.question_type() == QuestionType::Form
            && self
                .child_document
                .as_ref()
                .is_some_and(|child| !child.visible_fields().is_empty())
    }

    pub fn validation_errors(&self) -> Vec<ValidationError> {
        self.errors.read().clone()
    }

    /// Validation errors rendered by the context's formatter.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .read()
            .iter()
            .map(|error| self.context.formatter.format(error))
            .collect()
    }

    pub fn register_dependent_field(&self, field: &Arc<Field>, key: DependencyKey) -> bool {
        let added = self.dependent_fields.register(field, key);
        if added {
            debug!(field = %self.id, dependent = %field.id, key = key.as_str(), "registered dependent field");
        }
        added
    }

    pub fn dependent_fields(&self, key: DependencyKey) -> Vec<Arc<Field>> {
        self.dependent_fields.get(key)
    }

    pub fn subscribe(&self, event: FieldEvent, subscriber: Subscriber) {
        self.events.subscribe(event, subscriber);
    }

    /// Replaces the answer value and announces the change.
    pub fn set_value(self: &Arc<Self>, value: Value) -> Cascade {
        let Some(answer) = &self.answer else {
            debug!(field = %self.id, "ignoring value for a question without answer");
            return Cascade::default();
        };
        {
            let mut answer = answer.write();
            if answer.value == value {
                return Cascade::default();
            }
            answer.value = value;
        }
        self.trigger(FieldEvent::ValueChanged)
    }

    /// Publishes `event`; value and visibility changes also re-trigger the
    /// hidden/optional computation of dependent fields without waiting for it.
    pub fn trigger(self: &Arc<Self>, event: FieldEvent) -> Cascade {
        self.events.publish(self, event);
        match event {
            FieldEvent::ValueChanged | FieldEvent::HiddenChanged => {
                self.propagate(&CascadePath::default())
            }
            FieldEvent::OptionalChanged | FieldEvent::Validated | FieldEvent::Saved => {
                Cascade::default()
            }
        }
    }

    fn propagate(self: &Arc<Self>, path: &CascadePath) -> Cascade {
        let mut cascade = Cascade::default();
        for key in DependencyKey::ALL {
            for dependent in self.dependent_fields.get(key) {
                if path.contains(&dependent.id, key) {
                    warn!(
                        field = %self.id,
                        dependent = %dependent.id,
                        key = key.as_str(),
                        "dependency cycle; skipping repeated recomputation"
                    );
                    continue;
                }
                let next = path.with(&dependent.id, key);
                if let Some(handle) = spawn_recompute(dependent, key, next) {
                    cascade.push(handle);
                }
            }
        }
        cascade
    }

    async fn recompute(self: Arc<Self>, key: DependencyKey, path: CascadePath) {
        let Some(document) = self.document.upgrade() else {
            debug!(field = %self.id, "document released; skipping recomputation");
            return;
        };
        let ctx = document.answers_context();
        if !self.question.refresh(key, &ctx) {
            return;
        }
        debug!(
            field = %self.id,
            key = key.as_str(),
            hidden = self.hidden(),
            optional = self.optional(),
            "derived state changed"
        );
        match key {
            DependencyKey::IsHidden => {
                self.events.publish(&self, FieldEvent::HiddenChanged);
                self.propagate(&path).settled().await;
            }
            DependencyKey::IsRequired => self.events.publish(&self, FieldEvent::OptionalChanged),
        }
    }

    /// Validates the current value and replaces `errors`.
    ///
    /// The value is captured when this is called; if another `validate` is
    /// started before this one finishes, this one resolves to
    /// [`TaskOutcome::Superseded`] and leaves `errors` alone.
    pub fn validate(&self) -> impl Future<Output = TaskOutcome<Vec<ValidationError>>> + Send + '_ {
        let ticket = self.validate_task.begin();
        let question = Arc::clone(self.question.spec());
        let hidden = self.question.hidden();
        let optional = self.question.optional();
        let value = self.value();

        async move {
            let errors = run_rules(&question.kind, hidden, optional, &value).await;
            if !ticket.is_current() {
                debug!(field = %self.id, generation = ticket.generation(), "discarding superseded validation");
                return TaskOutcome::Superseded;
            }
            *self.errors.write() = errors.clone();
            self.events.publish(self, FieldEvent::Validated);
            TaskOutcome::Committed(errors)
        }
    }

    /// Persists the current answer, or removes it when the value is empty.
    ///
    /// Starting another `save` releases this one with
    /// [`TaskOutcome::Superseded`]; its request still runs to completion at the
    /// transport but the response is ignored.
    pub fn save(
        &self,
    ) -> impl Future<Output = Result<TaskOutcome<Value>, FieldError>> + Send + '_ {
        let mut ticket = self.save_task.begin();
        let snapshot = self.answer();

        async move {
            let answer = snapshot.ok_or_else(|| FieldError::NoAnswer(self.id.clone()))?;
            let mutation = if answer.is_empty() {
                let Some(id) = answer.id.as_deref() else {
                    debug!(field = %self.id, "empty answer was never persisted; nothing to remove");
                    return Ok(TaskOutcome::Committed(Value::Null));
                };
                Mutation::Remove(RemoveAnswerInput {
                    answer: self.context.persistence.decode_id(id),
                })
            } else {
                let operation = SaveOperation::for_answer(answer.kind)
                    .ok_or(FieldError::Unsavable(answer.kind))?;
                Mutation::Save {
                    operation,
                    input: SaveAnswerInput {
                        question: self.question.slug().to_string(),
                        document: self.document.id().to_string(),
                        value: answer.value,
                    },
                }
            };

            let name = mutation.name();
            let removal = mutation.is_removal();
            let result_path = mutation.result_path();
            let persistence = Arc::clone(&self.context.persistence);
            debug!(field = %self.id, mutation = name, "sending answer mutation");
            let request = match Handle::try_current() {
                Ok(handle) => {
                    let task =
                        handle.spawn(async move { persistence.mutate(mutation, &result_path).await });
                    let field = self.id.clone();
                    async move {
                        task.await.map_err(|err| FieldError::Interrupted {
                            field,
                            reason: err.to_string(),
                        })
                    }
                    .boxed()
                }
                // No runtime to spawn on: the request runs inside this future.
                Err(_) => async move { Ok(persistence.mutate(mutation, &result_path).await) }.boxed(),
            };

            let joined = tokio::select! {
                biased;
                joined = request => joined,
                () = ticket.superseded() => {
                    debug!(field = %self.id, mutation = name, "save superseded while in flight");
                    return Ok(TaskOutcome::Superseded);
                }
            };
            if !ticket.is_current() {
                debug!(field = %self.id, mutation = name, "discarding superseded save result");
                return Ok(TaskOutcome::Superseded);
            }
            let response = joined??;

            if let Some(slot) = &self.answer {
                let mut answer = slot.write();
                if removal {
                    answer.id = None;
                } else {
                    answer.merge_response(&response);
                }
            }
            debug!(field = %self.id, mutation = name, "answer mutation committed");
            self.events.publish(self, FieldEvent::Saved);
            Ok(TaskOutcome::Committed(response))
        }
    }
}

fn spawn_recompute(
    field: Arc<Field>,
    key: DependencyKey,
    path: CascadePath,
) -> Option<JoinHandle<()>> {
    let job = field.recompute(key, path);
    match Handle::try_current() {
        Ok(handle) => Some(handle.spawn(job)),
        Err(_) => {
            futures::executor::block_on(job);
            None
        }
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.id)
            .field("question_type", &self.question_type())
            .field("answer", &self.answer())
            .field("errors", &self.errors.read().len())
            .finish()
    }
}
