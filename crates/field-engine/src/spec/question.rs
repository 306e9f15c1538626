use std::sync::Arc;

use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dependency::DependencyKey;
use crate::expr::Expr;
use crate::spec::document::FormSpec;
use crate::visibility::answers_context;

/// Every kind of question a form can contain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum QuestionType {
    Text,
    Textarea,
    Integer,
    Float,
    MultipleChoice,
    Choice,
    DynamicChoice,
    DynamicMultipleChoice,
    Table,
    Form,
    File,
    Static,
    Date,
}

impl QuestionType {
    pub const ALL: [QuestionType; 13] = [
        QuestionType::Text,
        QuestionType::Textarea,
        QuestionType::Integer,
        QuestionType::Float,
        QuestionType::MultipleChoice,
        QuestionType::Choice,
        QuestionType::DynamicChoice,
        QuestionType::DynamicMultipleChoice,
        QuestionType::Table,
        QuestionType::Form,
        QuestionType::File,
        QuestionType::Static,
        QuestionType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "Text",
            QuestionType::Textarea => "Textarea",
            QuestionType::Integer => "Integer",
            QuestionType::Float => "Float",
            QuestionType::MultipleChoice => "MultipleChoice",
            QuestionType::Choice => "Choice",
            QuestionType::DynamicChoice => "DynamicChoice",
            QuestionType::DynamicMultipleChoice => "DynamicMultipleChoice",
            QuestionType::Table => "Table",
            QuestionType::Form => "Form",
            QuestionType::File => "File",
            QuestionType::Static => "Static",
            QuestionType::Date => "Date",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ChoiceOption {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            label: None,
        }
    }
}

/// Constraints carried by each question kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum QuestionKind {
    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_max_length: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    Textarea {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        textarea_max_length: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        integer_min_value: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        integer_max_value: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        float_min_value: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        float_max_value: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        #[serde(default)]
        multiple_choice_options: Vec<ChoiceOption>,
    },
    #[serde(rename_all = "camelCase")]
    Choice {
        #[serde(default)]
        choice_options: Vec<ChoiceOption>,
    },
    #[serde(rename_all = "camelCase")]
    DynamicChoice {
        #[serde(default)]
        dynamic_choice_options: Vec<ChoiceOption>,
    },
    #[serde(rename_all = "camelCase")]
    DynamicMultipleChoice {
        #[serde(default)]
        dynamic_multiple_choice_options: Vec<ChoiceOption>,
    },
    #[serde(rename_all = "camelCase")]
    Table {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        row_form: Option<FormSpec>,
    },
    #[serde(rename_all = "camelCase")]
    Form {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_form: Option<FormSpec>,
    },
    File,
    #[serde(rename_all = "camelCase")]
    Static {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        static_content: Option<String>,
    },
    Date,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Text { .. } => QuestionType::Text,
            QuestionKind::Textarea { .. } => QuestionType::Textarea,
            QuestionKind::Integer { .. } => QuestionType::Integer,
            QuestionKind::Float { .. } => QuestionType::Float,
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::Choice { .. } => QuestionType::Choice,
            QuestionKind::DynamicChoice { .. } => QuestionType::DynamicChoice,
            QuestionKind::DynamicMultipleChoice { .. } => QuestionType::DynamicMultipleChoice,
            QuestionKind::Table { .. } => QuestionType::Table,
            QuestionKind::Form { .. } => QuestionType::Form,
            QuestionKind::File => QuestionType::File,
            QuestionKind::Static { .. } => QuestionType::Static,
            QuestionKind::Date => QuestionType::Date,
        }
    }
}

/// Either a fixed flag or an expression evaluated against the document answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Condition {
    Always(bool),
    When(Expr),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Always(false)
    }
}

impl Condition {
    /// Evaluates the condition; indeterminate expressions resolve to `false`.
    pub fn resolve(&self, ctx: &Value) -> bool {
        match self {
            Condition::Always(value) => *value,
            Condition::When(expr) => expr.evaluate(ctx).unwrap_or(false),
        }
    }

    pub fn referenced_slugs(&self) -> Vec<String> {
        match self {
            Condition::Always(_) => Vec::new(),
            Condition::When(expr) => expr.referenced_slugs(),
        }
    }
}

/// Raw question payload as delivered by the form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub slug: String,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub is_required: Condition,
    #[serde(default)]
    pub is_hidden: Condition,
}

impl QuestionSpec {
    pub fn new(slug: impl Into<String>, kind: QuestionKind) -> Self {
        let slug = slug.into();
        Self {
            label: slug.clone(),
            slug,
            kind,
            is_required: Condition::default(),
            is_hidden: Condition::default(),
        }
    }

    pub fn required(mut self, condition: Condition) -> Self {
        self.is_required = condition;
        self
    }

    pub fn hidden(mut self, condition: Condition) -> Self {
        self.is_hidden = condition;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct QuestionState {
    hidden: bool,
    optional: bool,
}

/// A question bound to its field.
///
/// The definition is immutable; `hidden` and `optional` are derived from the
/// `isHidden` / `isRequired` conditions and recomputed whenever a field this
/// question depends on changes.
#[derive(Debug)]
pub struct Question {
    spec: Arc<QuestionSpec>,
    field_id: String,
    state: RwLock<QuestionState>,
}

impl Question {
    pub fn new(spec: QuestionSpec, field_id: impl Into<String>) -> Self {
        let empty = answers_context(std::iter::empty::<(String, Value)>());
        let state = QuestionState {
            hidden: spec.is_hidden.resolve(&empty),
            optional: !spec.is_required.resolve(&empty),
        };
        Self {
            spec: Arc::new(spec),
            field_id: field_id.into(),
            state: RwLock::new(state),
        }
    }

    pub fn spec(&self) -> &Arc<QuestionSpec> {
        &self.spec
    }

    pub fn slug(&self) -> &str {
        &self.spec.slug
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.spec.kind
    }

    pub fn question_type(&self) -> QuestionType {
        self.spec.kind.question_type()
    }

    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn hidden(&self) -> bool {
        self.state.read().hidden
    }

    pub fn optional(&self) -> bool {
        self.state.read().optional
    }

    pub fn condition(&self, key: DependencyKey) -> &Condition {
        match key {
            DependencyKey::IsHidden => &self.spec.is_hidden,
            DependencyKey::IsRequired => &self.spec.is_required,
        }
    }

    /// Slugs of the questions whose answers feed the given condition.
    pub fn depends_on(&self, key: DependencyKey) -> Vec<String> {
        self.condition(key).referenced_slugs()
    }

    /// Re-evaluates `hidden`; returns whether it flipped.
    pub fn refresh_hidden(&self, ctx: &Value) -> bool {
        let hidden = self.spec.is_hidden.resolve(ctx);
        let mut state = self.state.write();
        let changed = state.hidden != hidden;
        state.hidden = hidden;
        changed
    }

    /// Re-evaluates `optional`; returns whether it flipped.
    pub fn refresh_optional(&self, ctx: &Value) -> bool {
        let optional = !self.spec.is_required.resolve(ctx);
        let mut state = self.state.write();
        let changed = state.optional != optional;
        state.optional = optional;
        changed
    }

    pub fn refresh(&self, key: DependencyKey, ctx: &Value) -> bool {
        match key {
            DependencyKey::IsHidden => self.refresh_hidden(ctx),
            DependencyKey::IsRequired => self.refresh_optional(ctx),
        }
    }
}
