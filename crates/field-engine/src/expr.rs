use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::answer::is_empty_value;

const ANSWERS_PREFIX: &str = "/answers/";

/// Lightweight expression AST used for `isHidden` and `isRequired`.
///
/// Paths are JSON pointers into the answers context, e.g. `/answers/color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    LiteralBool { value: bool },
    Eq { path: String, value: Value },
    Includes { path: String, value: Value },
    IsEmpty { path: String },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
    Not { expression: Box<Expr> },
    Var { path: String },
}

impl Expr {
    fn get_value<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
        ctx.pointer(path)
    }

    /// Like `get_value`, but an unanswered question reads as `null`.
    fn get_answer<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
        const UNANSWERED: &Value = &Value::Null;
        ctx.pointer(path)
            .or_else(|| path.starts_with(ANSWERS_PREFIX).then_some(UNANSWERED))
    }

    /// Evaluates the expression to a boolean if possible.
    pub fn evaluate(&self, ctx: &Value) -> Option<bool> {
        match self {
            Expr::LiteralBool { value } => Some(*value),
            Expr::Eq { path, value } => {
                let current = Self::get_answer(ctx, path)?;
                Some(current == value)
            }
            Expr::Includes { path, value } => match Self::get_answer(ctx, path)? {
                Value::Array(items) => Some(items.contains(value)),
                Value::Null => Some(false),
                _ => None,
            },
            Expr::IsEmpty { path } => Some(Self::get_value(ctx, path).is_none_or(is_empty_value)),
            Expr::And { expressions } => {
                for expr in expressions {
                    match expr.evaluate(ctx) {
                        Some(true) => continue,
                        Some(false) => return Some(false),
                        None => return None,
                    }
                }
                Some(true)
            }
            Expr::Or { expressions } => {
                for expr in expressions {
                    if let Some(true) = expr.evaluate(ctx) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            Expr::Not { expression } => expression.evaluate(ctx).map(|value| !value),
            Expr::Var { path } => Self::get_value(ctx, path).and_then(|v| v.as_bool()),
        }
    }

    /// Question slugs read by this expression, in order of first appearance.
    pub fn referenced_slugs(&self) -> Vec<String> {
        let mut slugs = Vec::new();
        self.collect_slugs(&mut slugs);
        slugs
    }

    fn collect_slugs(&self, slugs: &mut Vec<String>) {
        match self {
            Expr::LiteralBool { .. } => {}
            Expr::Eq { path, .. }
            | Expr::Includes { path, .. }
            | Expr::IsEmpty { path }
            | Expr::Var { path } => {
                if let Some(slug) = slug_from_path(path)
                    && !slugs.contains(&slug)
                {
                    slugs.push(slug);
                }
            }
            Expr::And { expressions } | Expr::Or { expressions } => {
                for expr in expressions {
                    expr.collect_slugs(slugs);
                }
            }
            Expr::Not { expression } => expression.collect_slugs(slugs),
        }
    }
}

fn slug_from_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix(ANSWERS_PREFIX)?;
    let token = rest.split('/').next().filter(|token| !token.is_empty())?;
    Some(token.replace("~1", "/").replace("~0", "~"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluates_against_answers() {
        let ctx = json!({ "answers": { "pets": ["cat", "dog"], "name": "", "adult": true } });
        let expr: Expr = serde_json::from_value(json!({
            "op": "and",
            "expressions": [
                { "op": "includes", "path": "/answers/pets", "value": "dog" },
                { "op": "is_empty", "path": "/answers/name" },
                { "op": "var", "path": "/answers/adult" }
            ]
        }))
        .expect("deserialize");
        assert_eq!(expr.evaluate(&ctx), Some(true));
    }

    #[test]
    fn unanswered_questions_read_as_null() {
        let eq = Expr::Eq {
            path: "/answers/unknown".into(),
            value: json!("x"),
        };
        assert_eq!(eq.evaluate(&json!({ "answers": {} })), Some(false));
        let negated = Expr::Not {
            expression: Box::new(eq),
        };
        assert_eq!(negated.evaluate(&json!({ "answers": {} })), Some(true));

        let includes = Expr::Includes {
            path: "/answers/unknown".into(),
            value: json!("x"),
        };
        assert_eq!(includes.evaluate(&json!({ "answers": {} })), Some(false));
    }

    #[test]
    fn missing_paths_outside_answers_are_indeterminate() {
        let expr = Expr::Eq {
            path: "/meta/flag".into(),
            value: json!(true),
        };
        assert_eq!(expr.evaluate(&json!({ "answers": {} })), None);
    }

    #[test]
    fn collects_unique_slugs() {
        let expr = Expr::Or {
            expressions: vec![
                Expr::Eq {
                    path: "/answers/a".into(),
                    value: json!(1),
                },
                Expr::Not {
                    expression: Box::new(Expr::IsEmpty {
                        path: "/answers/b~1c/0".into(),
                    }),
                },
                Expr::Var {
                    path: "/answers/a".into(),
                },
                Expr::Var {
                    path: "/meta/flag".into(),
                },
            ],
        };
        assert_eq!(expr.referenced_slugs(), vec!["a", "b/c"]);
    }
}
