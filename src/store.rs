// src/store.rs
//! Store-shape normalization.
//!
//! A store document arrives in one of two shapes: a plain ordered list of
//! records, or a keyed mapping `id → envelope-or-record` as written by the
//! offline normalizer (envelopes nest the payload under `normalized` next
//! to `raw_hash`/`meta` bookkeeping). Both shapes collapse here into one
//! ordered record list with `id` guaranteed on every record. Document order
//! is preserved — it is the tie-break order for equal ranking scores.

use crate::normalize::scalar_string;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// The two accepted store shapes. `serde_json` runs with `preserve_order`,
/// so the `Keyed` map iterates in document order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoreDocument {
    List(Vec<Value>),
    Keyed(Map<String, Value>),
}

/// Envelope bookkeeping written by the offline normalizer. Parsed leniently;
/// only used for diagnostics (store freshness), never by the scorer.
#[derive(Debug, Clone, Default)]
pub struct StoreMeta {
    pub updated_at: Option<DateTime<Utc>>,
    pub model: Option<String>,
}

impl StoreMeta {
    fn from_entry(entry: &Value) -> Self {
        let meta = entry.get("meta");
        let updated_at = meta
            .and_then(|m| m.get("updated_at"))
            .and_then(scalar_string)
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let model = meta.and_then(|m| m.get("model")).and_then(scalar_string);
        Self { updated_at, model }
    }
}

/// Result of normalizing one store document.
#[derive(Debug, Clone, Default)]
pub struct NormalizedStore {
    /// Records in document order, each carrying a non-empty string `id`.
    pub records: Vec<Value>,
    /// Most recent envelope `updated_at` across the document, if any.
    pub newest_update: Option<DateTime<Utc>>,
    /// Normalizer model recorded on that newest envelope.
    pub newest_model: Option<String>,
    /// Entries dropped because they could not represent a record.
    pub skipped: usize,
}

impl StoreDocument {
    /// Collapse either shape into the canonical ordered record list.
    ///
    /// List shape: non-object entries are skipped; entries without an id get
    /// a positional `tmp_{n}` fallback (the convention the offline store
    /// migration used). Keyed shape: the payload is the `normalized` field
    /// when that field holds an object, otherwise the entry itself when no
    /// `normalized` key exists; non-object payloads are skipped; a missing
    /// or empty payload id is filled from the mapping key.
    pub fn normalize(self) -> NormalizedStore {
        let mut out = NormalizedStore::default();
        match self {
            StoreDocument::List(entries) => {
                for entry in entries {
                    let Value::Object(mut obj) = entry else {
                        out.skipped += 1;
                        continue;
                    };
                    if !has_usable_id(&obj) {
                        let fallback = format!("tmp_{}", out.records.len() + 1);
                        obj.insert("id".to_string(), Value::String(fallback));
                    }
                    out.records.push(Value::Object(obj));
                }
            }
            StoreDocument::Keyed(map) => {
                for (key, entry) in map {
                    let StoreMeta { updated_at, model } = StoreMeta::from_entry(&entry);
                    if let Some(ts) = updated_at {
                        if out.newest_update.map_or(true, |latest| ts > latest) {
                            out.newest_update = Some(ts);
                            out.newest_model = model;
                        }
                    }
                    let payload = match entry {
                        Value::Object(mut envelope) => match envelope.remove("normalized") {
                            Some(Value::Object(inner)) => Some(inner),
                            Some(_) => None,
                            None => Some(envelope),
                        },
                        _ => None,
                    };
                    let Some(mut obj) = payload else {
                        out.skipped += 1;
                        continue;
                    };
                    if !has_usable_id(&obj) {
                        obj.insert("id".to_string(), Value::String(key));
                    }
                    out.records.push(Value::Object(obj));
                }
            }
        }
        out
    }
}

fn has_usable_id(obj: &Map<String, Value>) -> bool {
    obj.get("id")
        .and_then(scalar_string)
        .map_or(false, |id| !id.is_empty())
}

/// Look a record up by its string id; a record without one never matches.
pub fn find_by_id<'a>(records: &'a [Value], id: &str) -> Option<&'a Value> {
    records.iter().find(|record| {
        record
            .get("id")
            .and_then(scalar_string)
            .map_or(false, |rid| rid == id)
    })
}

/// Read and normalize a store document from disk.
pub fn load_store(path: &Path) -> Result<NormalizedStore> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading store document at {}", path.display()))?;
    let document: StoreDocument = serde_json::from_str(&content)
        .with_context(|| format!("parsing store document at {} (expected a JSON list or keyed mapping)", path.display()))?;
    Ok(document.normalize())
}

/// Entry count of the raw (non-normalized) source file. Diagnostics only —
/// nothing downstream reads raw entries.
pub fn count_raw_entries(path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading raw store at {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing raw store at {}", path.display()))?;
    Ok(match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(doc: Value) -> NormalizedStore {
        serde_json::from_value::<StoreDocument>(doc)
            .expect("store document")
            .normalize()
    }

    #[test]
    fn keyed_store_unwraps_envelopes_and_injects_key_ids() {
        let store = normalize(json!({
            "u1": { "raw_hash": "sha256:aa", "normalized": { "country": "GB" },
                    "meta": { "updated_at": "2025-06-01T10:00:00Z", "model": "gpt-4o-mini" } },
            "u2": { "normalized": { "id": "custom", "country": "FR" } }
        }));
        assert_eq!(store.records.len(), 2);
        assert_eq!(store.records[0]["id"], json!("u1"));
        assert_eq!(store.records[0]["country"], json!("GB"));
        // A payload that already carries an id keeps it.
        assert_eq!(store.records[1]["id"], json!("custom"));
        assert_eq!(
            store.newest_update.unwrap().to_rfc3339(),
            "2025-06-01T10:00:00+00:00"
        );
        assert_eq!(store.newest_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn freshness_follows_the_newest_envelope() {
        // The newest timestamp sits in the middle; its model wins, and the
        // meta-less entry cannot clobber either field.
        let store = normalize(json!({
            "a": { "normalized": { "n": 1 },
                   "meta": { "updated_at": "2025-01-05T00:00:00Z", "model": "gpt-4o" } },
            "b": { "normalized": { "n": 2 },
                   "meta": { "updated_at": "2025-03-01T12:00:00Z", "model": "gpt-4o-mini" } },
            "c": { "normalized": { "n": 3 } }
        }));
        assert_eq!(
            store.newest_update.unwrap().to_rfc3339(),
            "2025-03-01T12:00:00+00:00"
        );
        assert_eq!(store.newest_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn keyed_store_without_envelope_uses_entry_directly() {
        let store = normalize(json!({
            "s1": { "languages": ["en"] }
        }));
        assert_eq!(store.records[0]["id"], json!("s1"));
        assert_eq!(store.records[0]["languages"], json!(["en"]));
    }

    #[test]
    fn non_object_entries_are_skipped_silently() {
        let keyed = normalize(json!({
            "a": 17,
            "b": "junk",
            "c": { "normalized": "also junk" },
            "d": { "normalized": { "country": "DE" } }
        }));
        assert_eq!(keyed.records.len(), 1);
        assert_eq!(keyed.skipped, 3);

        let list = normalize(json!([null, 3, { "id": "x" }, "y"]));
        assert_eq!(list.records.len(), 1);
        assert_eq!(list.skipped, 3);
    }

    #[test]
    fn list_entries_without_id_get_positional_fallbacks() {
        let store = normalize(json!([
            { "country": "GB" },
            { "id": "", "country": "FR" },
            { "id": "u3", "country": "DE" }
        ]));
        assert_eq!(store.records[0]["id"], json!("tmp_1"));
        assert_eq!(store.records[1]["id"], json!("tmp_2"));
        assert_eq!(store.records[2]["id"], json!("u3"));
    }

    #[test]
    fn keyed_document_order_is_preserved() {
        // Keys deliberately out of lexicographic order: document order wins.
        let raw = r#"{ "zz": {"normalized": {"n": 1}}, "aa": {"normalized": {"n": 2}}, "mm": {"normalized": {"n": 3}} }"#;
        let doc: StoreDocument = serde_json::from_str(raw).unwrap();
        let ids: Vec<String> = doc
            .normalize()
            .records
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["zz", "aa", "mm"]);
    }

    #[test]
    fn find_by_id_matches_string_form() {
        let store = normalize(json!([{ "id": "s1" }, { "id": 7 }]));
        assert!(find_by_id(&store.records, "s1").is_some());
        assert!(find_by_id(&store.records, "7").is_some());
        assert!(find_by_id(&store.records, "missing").is_none());
    }
}
