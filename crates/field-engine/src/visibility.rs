use serde_json::{Map, Value};

use crate::document::Document;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Context conditions are evaluated against: `{"answers": {slug: value}}`.
pub fn answers_context(answers: impl IntoIterator<Item = (String, Value)>) -> Value {
    let answers: Map<String, Value> = answers.into_iter().collect();
    let mut ctx_map = Map::new();
    ctx_map.insert("answers".into(), Value::Object(answers));
    Value::Object(ctx_map)
}

/// Current visibility of every question in the document tree.
pub fn resolve_visibility(document: &Document) -> VisibilityMap {
    document
        .all_fields()
        .iter()
        .map(|field| (field.question().slug().to_string(), !field.hidden()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_nests_answers_by_slug() {
        let ctx = answers_context([("a".to_string(), json!(1)), ("b".to_string(), Value::Null)]);
        assert_eq!(ctx, json!({ "answers": { "a": 1, "b": null } }));
        assert_eq!(ctx.pointer("/answers/a"), Some(&json!(1)));
    }
}
