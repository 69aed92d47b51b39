// src/record.rs
//! Typed views over semi-structured store records.
//!
//! Session data stays `serde_json::Value` (the patch path merges structural
//! JSON), but the scorer only ever reads these views. Conversion is lenient
//! by contract: a field with an out-of-schema shape degrades to absent or
//! empty instead of failing, so a sloppy store entry or a bad agent patch
//! can cost match features but never wedges a scoring pass. Records are
//! expected to convert from in-memory `Value`s (`from_value`), not from raw
//! byte streams.

use crate::normalize::{scalar_string, ValueList};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn lenient_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_string(&value))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_string(&value).unwrap_or_default())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(T::deserialize(deserializer).unwrap_or_default())
}

/// The slice of a student profile the scorer reads. The profile document
/// carries more (academics, constraints, budget — the agent's schema);
/// those fields live only in the underlying `Value`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub languages: ValueList,
    #[serde(deserialize_with = "lenient_or_default")]
    pub preferences: StudentPreferences,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentPreferences {
    pub countries_targets: ValueList,
    #[serde(deserialize_with = "lenient_label")]
    pub campus_setting: Option<String>,
    pub domains_priorities: ValueList,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UniversityRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(deserialize_with = "lenient_label")]
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient_or_default")]
    pub offer: UniversityOffer,
    #[serde(deserialize_with = "lenient_or_default")]
    pub campus: UniversityCampus,
    #[serde(deserialize_with = "lenient_or_default")]
    pub admissions: UniversityAdmissions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UniversityOffer {
    pub teaching_languages: ValueList,
    pub majors: ValueList,
    pub accreditations: ValueList,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UniversityCampus {
    #[serde(deserialize_with = "lenient_label")]
    pub setting: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UniversityAdmissions {
    #[serde(deserialize_with = "lenient_label")]
    pub application_system: Option<String>,
}

impl StudentRecord {
    /// Lenient conversion; never fails. A wholesale non-object collapses to
    /// the empty record (nothing evaluable, score 0 against everything).
    pub fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }
}

impl UniversityRecord {
    /// Lenient conversion; never fails.
    pub fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_the_full_student_shape() {
        let s = StudentRecord::from_value(&json!({
            "id": "s1",
            "languages": ["en", "fr"],
            "preferences": {
                "countries_targets": ["GB"],
                "campus_setting": "urban",
                "domains_priorities": ["architecture"]
            },
            "academics": { "track": "IB" }
        }));
        assert_eq!(s.id, "s1");
        assert_eq!(s.languages.len(), 2);
        assert_eq!(s.preferences.campus_setting.as_deref(), Some("urban"));
        assert_eq!(s.preferences.countries_targets.as_slice(), &["GB".to_string()]);
    }

    #[test]
    fn missing_and_scalar_shaped_fields_coerce() {
        let s = StudentRecord::from_value(&json!({ "id": "s2", "languages": "en" }));
        assert_eq!(s.languages.as_slice(), &["en".to_string()]);
        assert!(s.preferences.countries_targets.is_empty());
        assert!(s.preferences.campus_setting.is_none());
    }

    #[test]
    fn malformed_fields_degrade_instead_of_failing() {
        // preferences as a number, campus setting as an object: both out of
        // schema, both must degrade silently.
        let s = StudentRecord::from_value(&json!({ "id": "s3", "preferences": 7 }));
        assert!(s.preferences.campus_setting.is_none());

        let u = UniversityRecord::from_value(&json!({
            "id": "u1",
            "country": { "code": "GB" },
            "campus": { "setting": 5 },
            "offer": "none"
        }));
        assert!(u.country.is_none());
        assert_eq!(u.campus.setting.as_deref(), Some("5"));
        assert!(u.offer.majors.is_empty());
    }

    #[test]
    fn numeric_ids_stringify() {
        let s = StudentRecord::from_value(&json!({ "id": 42 }));
        assert_eq!(s.id, "42");
    }

    #[test]
    fn non_object_record_collapses_to_empty() {
        let s = StudentRecord::from_value(&json!("not a record"));
        assert_eq!(s.id, "");
        assert!(s.languages.is_empty());
    }
}
