// src/normalize.rs
//! Label canonicalization and loose-shape coercion.
//!
//! Store data arrives with inconsistent casing, punctuation, and cardinality
//! (a field may hold one value or several). Everything that compares two
//! free-form labels goes through `canonical_token`; everything that reads a
//! maybe-scalar-maybe-list field goes through `ValueList`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("non-word regex"));

/// Canonical comparison token: trim, lowercase, collapse every maximal run
/// of non-word characters into a single `_`. Idempotent; empty input stays
/// empty. `"United-Kingdom"` and `"united kingdom"` both become
/// `united_kingdom`.
pub fn canonical_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    NON_WORD.replace_all(&lowered, "_").into_owned()
}

/// Lenient scalar-to-string view of a JSON value. Numbers and booleans
/// stringify (upstream data occasionally encodes codes as bare numbers);
/// null, arrays, and objects have no scalar reading.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// An ordered list of labels coerced from loosely-shaped JSON:
/// absent/null → empty, scalar → singleton, array → its scalar elements
/// (non-scalar elements cannot name anything and are dropped).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueList(Vec<String>);

impl ValueList {
    pub fn from_value(value: &Value) -> Self {
        let items = match value {
            Value::Null => Vec::new(),
            Value::Array(elems) => elems.iter().filter_map(scalar_string).collect(),
            scalar => scalar_string(scalar).into_iter().collect(),
        };
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ValueList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl Serialize for ValueList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// True iff the canonical forms of `a` and `b` share at least one element.
/// Duplicates collapse via set semantics; order never matters.
pub fn sets_intersect<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    let left: HashSet<String> = a.iter().map(|s| canonical_token(s.as_ref())).collect();
    b.iter().any(|s| left.contains(&canonical_token(s.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_token_folds_case_space_and_punctuation() {
        assert_eq!(canonical_token("  United-Kingdom "), "united_kingdom");
        assert_eq!(canonical_token("Urban"), "urban");
        assert_eq!(canonical_token("computer  science!"), "computer_science_");
        assert_eq!(canonical_token(""), "");
        assert_eq!(canonical_token("   "), "");
    }

    #[test]
    fn canonical_token_is_idempotent() {
        for raw in ["United Kingdom", "RIBA", " a.b..c ", "déjà-vu"] {
            let once = canonical_token(raw);
            assert_eq!(canonical_token(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn value_list_coerces_all_upstream_shapes() {
        assert!(ValueList::from_value(&Value::Null).is_empty());
        assert_eq!(
            ValueList::from_value(&json!("en")).as_slice(),
            &["en".to_string()]
        );
        assert_eq!(
            ValueList::from_value(&json!(["en", "fr"])).as_slice(),
            &["en".to_string(), "fr".to_string()]
        );
        // Non-scalar elements cannot represent labels and are dropped.
        assert_eq!(
            ValueList::from_value(&json!(["en", {"code": "fr"}, 3])).as_slice(),
            &["en".to_string(), "3".to_string()]
        );
        // A bare object is not a scalar either.
        assert!(ValueList::from_value(&json!({"code": "fr"})).is_empty());
    }

    #[test]
    fn value_list_deserializes_inside_records() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default)]
            langs: ValueList,
        }
        let one: Probe = serde_json::from_value(json!({ "langs": "en" })).unwrap();
        assert_eq!(one.langs.len(), 1);
        let many: Probe = serde_json::from_value(json!({ "langs": ["en", "fr"] })).unwrap();
        assert_eq!(many.langs.len(), 2);
        let none: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(none.langs.is_empty());
    }

    #[test]
    fn intersection_ignores_case_and_punctuation() {
        assert!(sets_intersect(&["Computer-Science"], &["computer science"]));
        assert!(sets_intersect(&["en", "fr"], &["FR", "de"]));
        assert!(!sets_intersect(&["en"], &["de", "es"]));
        assert!(!sets_intersect::<&str, &str>(&[], &["en"]));
    }
}
