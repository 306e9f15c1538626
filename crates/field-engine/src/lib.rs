#![allow(missing_docs)]

pub mod dependency;
pub mod document;
pub mod error;
pub mod events;
pub mod expr;
pub mod field;
pub mod format;
pub mod persistence;
pub mod snapshot;
pub mod spec;
pub mod task;
pub mod type_map;
pub mod validate;
pub mod visibility;

pub use dependency::{Cascade, CascadePath, DependencyKey, DependentFields};
pub use document::Document;
pub use error::{DocumentError, FieldError};
pub use events::{EventBus, FieldEvent, Subscriber};
pub use expr::Expr;
pub use field::{DocumentRef, Field, FieldContext};
pub use format::{KeyFormatter, MessageFormatter};
pub use persistence::{
    Mutation, Persistence, PersistenceError, RemoveAnswerInput, SaveAnswerInput, SaveOperation,
    decode_global_id, encode_global_id, select_result,
};
pub use snapshot::{AnswerSnapshot, SnapshotEntry};
pub use spec::{
    Answer, AnswerSpec, AnswerType, ChoiceOption, Condition, DocumentSpec, FormSpec, Question,
    QuestionKind, QuestionSpec, QuestionType,
};
pub use task::{RestartableTask, TaskOutcome, Ticket};
pub use validate::{RuleResult, ValidationError, ValidationKind, run_rules};
pub use visibility::{VisibilityMap, answers_context, resolve_visibility};
