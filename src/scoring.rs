// src/scoring.rs
//! Weighted compatibility scoring between a student and a university.
//!
//! Six features are checked in a fixed order. A feature only participates
//! when both sides carry usable data; anything missing on either side drops
//! the feature from both numerator and denominator instead of counting as a
//! mismatch. The final score is matched-weight over evaluable-weight, so it
//! always lands in [0, 1] and a pair with nothing to compare scores 0.

use crate::config::ScoringConfig;
use crate::normalize::{canonical_token, sets_intersect};
use crate::record::{StudentRecord, UniversityRecord};
use serde_json::Value;

/// Feature names in evaluation order. `used_features` entries always appear
/// in this order, regardless of which features were skipped.
pub const FEATURE_ORDER: [&str; 6] = [
    "country_match",
    "language_match",
    "campus_setting_match",
    "major_match",
    "application_system_match",
    "accreditation_match",
];

/// Outcome of scoring one student/university pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Compatibility {
    /// Matched weight over evaluable weight; 0.0 when nothing was evaluable.
    pub score: f32,
    /// Features that matched positively, in evaluation order. A feature that
    /// evaluated but mismatched still weighs on the denominator without
    /// appearing here.
    pub used_features: Vec<&'static str>,
}

#[derive(Default)]
struct Tally {
    matched: f32,
    evaluable: f32,
    used: Vec<&'static str>,
}

impl Tally {
    /// `None` means the feature had no data on at least one side and is
    /// skipped entirely.
    fn feature(&mut self, name: &'static str, weight: f32, outcome: Option<bool>) {
        let Some(matched) = outcome else { return };
        self.evaluable += weight;
        if matched {
            self.matched += weight;
            self.used.push(name);
        }
    }

    fn finish(self) -> Compatibility {
        let score = if self.evaluable > 0.0 {
            self.matched / self.evaluable
        } else {
            0.0
        };
        Compatibility {
            score,
            used_features: self.used,
        }
    }
}

/// Stateless scorer; all knobs come from the [`ScoringConfig`] it was built
/// with, so two scorers with equal configs produce identical results.
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    config: ScoringConfig,
}

impl CompatibilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, student: &StudentRecord, university: &UniversityRecord) -> Compatibility {
        let w = &self.config.weights;
        let mut tally = Tally::default();

        tally.feature(
            FEATURE_ORDER[0],
            w.country_match,
            set_vs_single(
                student.preferences.countries_targets.as_slice(),
                university.country.as_deref(),
            ),
        );
        tally.feature(
            FEATURE_ORDER[1],
            w.language_match,
            set_vs_set(
                student.languages.as_slice(),
                university.offer.teaching_languages.as_slice(),
            ),
        );
        tally.feature(
            FEATURE_ORDER[2],
            w.campus_setting_match,
            single_vs_single(
                student.preferences.campus_setting.as_deref(),
                university.campus.setting.as_deref(),
            ),
        );
        let desired_majors = if student.preferences.domains_priorities.is_empty() {
            self.config.defaults.desired_majors.as_slice()
        } else {
            student.preferences.domains_priorities.as_slice()
        };
        tally.feature(
            FEATURE_ORDER[3],
            w.major_match,
            set_vs_set(desired_majors, university.offer.majors.as_slice()),
        );
        tally.feature(
            FEATURE_ORDER[4],
            w.application_system_match,
            self.application_system_outcome(university),
        );
        tally.feature(
            FEATURE_ORDER[5],
            w.accreditation_match,
            set_vs_set(
                self.config.defaults.desired_accreditations.as_slice(),
                university.offer.accreditations.as_slice(),
            ),
        );

        tally.finish()
    }

    /// Score straight from raw record values; malformed fields degrade to
    /// absent, they never fail the pass.
    pub fn score_values(&self, student: &Value, university: &Value) -> Compatibility {
        self.score(
            &StudentRecord::from_value(student),
            &UniversityRecord::from_value(university),
        )
    }

    /// The configured desired system wins; with none configured, the policy
    /// may expect the conventional system of the university's own country.
    fn application_system_outcome(&self, university: &UniversityRecord) -> Option<bool> {
        let offered = single_token(university.admissions.application_system.as_deref())?;
        let desired = match single_token(
            self.config
                .defaults
                .desired_application_system
                .as_deref(),
        ) {
            Some(configured) => configured,
            None => {
                let country = single_token(university.country.as_deref())?;
                self.config
                    .application_system_policy
                    .implied_system(&country)?
                    .to_string()
            }
        };
        Some(desired == offered)
    }
}

fn single_token(value: Option<&str>) -> Option<String> {
    value.map(canonical_token).filter(|token| !token.is_empty())
}

fn set_vs_set(a: &[String], b: &[String]) -> Option<bool> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(sets_intersect(a, b))
}

fn set_vs_single(list: &[String], single: Option<&str>) -> Option<bool> {
    let token = single_token(single)?;
    if list.is_empty() {
        return None;
    }
    Some(sets_intersect(list, &[token]))
}

fn single_vs_single(a: Option<&str>, b: Option<&str>) -> Option<bool> {
    let a = single_token(a)?;
    let b = single_token(b)?;
    Some(a == b)
}
