// src/patch.rs
//! Deep-merge of refinement patches into a profile document.
//!
//! Object patch values merge key-by-key into the target; everything else
//! (scalars, nulls, arrays) replaces the target value wholesale. The merge
//! is deliberately lenient: it never validates field names or types, so a
//! patch can only ever degrade a field into something the lenient record
//! views treat as absent.

use serde_json::{Map, Value};

pub fn deep_merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !matches!(target, Value::Object(_)) {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, patch_value) in patch_map {
            deep_merge(
                target_map.entry(key.clone()).or_insert(Value::Null),
                patch_value,
            );
        }
    }
}
