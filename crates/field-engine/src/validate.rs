use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::spec::answer::{is_blank_value, is_empty_value};
use crate::spec::question::{ChoiceOption, QuestionKind};

/// Identifies which rule rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ValidationKind {
    Blank,
    TooLong,
    NotANumber,
    NotAnInteger,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    Inclusion,
    Date,
}

impl ValidationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationKind::Blank => "blank",
            ValidationKind::TooLong => "tooLong",
            ValidationKind::NotANumber => "notANumber",
            ValidationKind::NotAnInteger => "notAnInteger",
            ValidationKind::GreaterThanOrEqualTo => "greaterThanOrEqualTo",
            ValidationKind::LessThanOrEqualTo => "lessThanOrEqualTo",
            ValidationKind::Inclusion => "inclusion",
            ValidationKind::Date => "date",
        }
    }

    /// Message catalogue key, e.g. `form.validation.tooLong`.
    pub fn message_key(&self) -> String {
        format!("form.validation.{}", self.as_str())
    }
}

/// Structured validation failure; rendering it as text is left to a
/// [`MessageFormatter`](crate::format::MessageFormatter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub kind: ValidationKind,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub value: Value,
}

impl ValidationError {
    fn new(kind: ValidationKind, value: &Value) -> Self {
        Self {
            kind,
            context: Map::new(),
            value: value.clone(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Outcome of one rule: one entry per checked value.
pub type RuleResult = Vec<Result<(), ValidationError>>;

/// Runs the required rule (unless hidden) and the type rule concurrently and
/// keeps the failures in rule order.
pub async fn run_rules(
    kind: &QuestionKind,
    hidden: bool,
    optional: bool,
    value: &Value,
) -> Vec<ValidationError> {
    let mut rules: Vec<BoxFuture<'_, RuleResult>> = Vec::with_capacity(2);
    if !hidden {
        rules.push(async move { validate_required(optional, value) }.boxed());
    }
    rules.push(async move { validate_kind(kind, value) }.boxed());

    join_all(rules)
        .await
        .into_iter()
        .flatten()
        .filter_map(Result::err)
        .collect()
}

pub fn validate_required(optional: bool, value: &Value) -> RuleResult {
    if optional || !is_blank_value(value) {
        vec![Ok(())]
    } else {
        vec![Err(ValidationError::new(ValidationKind::Blank, value))]
    }
}

/// Type-specific rule for every question kind.
pub fn validate_kind(kind: &QuestionKind, value: &Value) -> RuleResult {
    match kind {
        QuestionKind::Text { text_max_length } => vec![validate_length(value, *text_max_length)],
        QuestionKind::Textarea {
            textarea_max_length,
        } => vec![validate_length(value, *textarea_max_length)],
        QuestionKind::Integer {
            integer_min_value,
            integer_max_value,
        } => vec![validate_number(
            value,
            true,
            integer_min_value.map(|min| min as f64),
            integer_max_value.map(|max| max as f64),
        )],
        QuestionKind::Float {
            float_min_value,
            float_max_value,
        } => vec![validate_number(
            value,
            false,
            *float_min_value,
            *float_max_value,
        )],
        QuestionKind::Choice { choice_options } => {
            vec![validate_inclusion(value, choice_options, true)]
        }
        QuestionKind::MultipleChoice {
            multiple_choice_options,
        } => validate_each(value, multiple_choice_options),
        QuestionKind::DynamicChoice {
            dynamic_choice_options,
        } => vec![validate_inclusion(value, dynamic_choice_options, false)],
        QuestionKind::DynamicMultipleChoice {
            dynamic_multiple_choice_options,
        } => validate_each(value, dynamic_multiple_choice_options),
        QuestionKind::Date => vec![validate_date(value)],
        QuestionKind::File
        | QuestionKind::Table { .. }
        | QuestionKind::Static { .. }
        | QuestionKind::Form { .. } => vec![Ok(())],
    }
}

fn validate_length(value: &Value, max: Option<usize>) -> Result<(), ValidationError> {
    let (Some(max), Some(text)) = (max, value.as_str()) else {
        return Ok(());
    };
    if text.chars().count() > max {
        Err(ValidationError::new(ValidationKind::TooLong, value).with("max", json!(max)))
    } else {
        Ok(())
    }
}

fn validate_number(
    value: &Value,
    integer: bool,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), ValidationError> {
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(ValidationError::new(ValidationKind::NotANumber, value));
    };
    if integer && number.fract() != 0.0 {
        return Err(ValidationError::new(ValidationKind::NotAnInteger, value));
    }
    if let Some(min) = min
        && number < min
    {
        return Err(
            ValidationError::new(ValidationKind::GreaterThanOrEqualTo, value)
                .with("gte", bound(min, integer)),
        );
    }
    if let Some(max) = max
        && number > max
    {
        return Err(
            ValidationError::new(ValidationKind::LessThanOrEqualTo, value)
                .with("lte", bound(max, integer)),
        );
    }
    Ok(())
}

fn bound(limit: f64, integer: bool) -> Value {
    if integer {
        json!(limit as i64)
    } else {
        json!(limit)
    }
}

fn validate_inclusion(
    value: &Value,
    options: &[ChoiceOption],
    allow_blank: bool,
) -> Result<(), ValidationError> {
    if allow_blank && is_empty_value(value) {
        return Ok(());
    }
    let included = value
        .as_str()
        .is_some_and(|slug| options.iter().any(|option| option.slug == slug));
    if included {
        Ok(())
    } else {
        let slugs: Vec<&str> = options.iter().map(|option| option.slug.as_str()).collect();
        Err(ValidationError::new(ValidationKind::Inclusion, value).with("in", json!(slugs)))
    }
}

fn validate_each(value: &Value, options: &[ChoiceOption]) -> RuleResult {
    match value {
        Value::Null => vec![Ok(())],
        Value::Array(items) => items
            .iter()
            .map(|item| validate_inclusion(item, options, false))
            .collect(),
        other => vec![validate_inclusion(other, options, false)],
    }
}

fn validate_date(value: &Value) -> Result<(), ValidationError> {
    if is_empty_value(value) {
        return Ok(());
    }
    let parsed = value.as_str().is_some_and(|text| {
        Date::parse(text, format_description!("[year]-[month]-[day]")).is_ok()
            || OffsetDateTime::parse(text, &Rfc3339).is_ok()
    });
    if parsed {
        Ok(())
    } else {
        Err(ValidationError::new(ValidationKind::Date, value))
    }
}
