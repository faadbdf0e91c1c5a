//! Response-tree localization.
//!
//! Walks an arbitrary JSON response immediately before serialization and
//! replaces every descriptor-shaped object with its resolved string. The
//! walk is copy-on-write over an owned tree, preserves object key order and
//! array order, and stops descending past [`MAX_WALK_DEPTH`] to bound cost
//! on hostile or accidental deep nesting.

use serde_json::Value;
use tracing::warn;

use crate::i18n::translate::{MessageDescriptor, TranslationEngine};

/// Nesting depth beyond which subtrees pass through unmodified.
pub const MAX_WALK_DEPTH: usize = 16;

/// Resolve every embedded [`MessageDescriptor`] in `value`.
pub fn walk(engine: &TranslationEngine, value: Value) -> Value {
    walk_at(engine, value, 0)
}

fn walk_at(engine: &TranslationEngine, value: Value, depth: usize) -> Value {
    if depth > MAX_WALK_DEPTH {
        warn!(depth, "response tree deeper than walk limit, subtree left untranslated");
        return value;
    }
    match value {
        Value::Object(map) => {
            if let Some(descriptor) = MessageDescriptor::from_value(&Value::Object(map.clone())) {
                return Value::String(engine.resolve(&descriptor));
            }
            Value::Object(
                map.into_iter().map(|(k, v)| (k, walk_at(engine, v, depth + 1))).collect(),
            )
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| walk_at(engine, v, depth + 1)).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{catalog::Catalog, language::Language};
    use serde_json::json;
    use std::sync::Arc;

    fn engine() -> TranslationEngine {
        let catalog = Catalog::from_bundles([(
            Language::EnUs,
            json!({"greet": "Hello, {name}!", "bye": "Goodbye."}),
        )]);
        TranslationEngine::new(Arc::new(catalog), Language::EnUs)
    }

    #[test]
    fn replaces_descriptors_at_any_position() {
        let tree = json!({
            "title": {"translateKey": "greet", "args": {"name": "Aidan"}},
            "items": [
                {"translateKey": "bye"},
                {"plain": true}
            ],
            "count": 3
        });
        let out = walk(&engine(), tree);
        assert_eq!(
            out,
            json!({
                "title": "Hello, Aidan!",
                "items": ["Goodbye.", {"plain": true}],
                "count": 3
            })
        );
    }

    #[test]
    fn preserves_key_order() {
        let tree = json!({"zeta": 1, "alpha": {"translateKey": "bye"}, "mid": 2});
        let out = walk(&engine(), tree);
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn non_descriptor_values_pass_through() {
        let tree = json!({"translateKey": 42, "other": null});
        let out = walk(&engine(), tree.clone());
        assert_eq!(out, tree);
    }

    #[test]
    fn depth_limit_leaves_deep_subtrees_untouched() {
        let mut tree = json!({"translateKey": "bye"});
        for _ in 0..(MAX_WALK_DEPTH + 2) {
            tree = json!({"wrap": tree});
        }
        let out = walk(&engine(), tree.clone());
        assert_eq!(out, tree);
    }

    #[test]
    fn shallow_descriptor_still_resolved_near_limit() {
        let mut tree = json!({"translateKey": "bye"});
        for _ in 0..(MAX_WALK_DEPTH - 2) {
            tree = json!({"wrap": tree});
        }
        let out = walk(&engine(), tree);
        let mut node = &out;
        while let Some(inner) = node.get("wrap") {
            node = inner;
        }
        assert_eq!(node, &json!("Goodbye."));
    }
}
