// src/ranking.rs
//! Rank every university in a store against one student.
//!
//! The sort is descending by score and stable, so equal scores keep store
//! document order. Re-running over unchanged inputs reproduces the exact
//! same ordering.

use crate::record::{StudentRecord, UniversityRecord};
use crate::scoring::{Compatibility, CompatibilityScorer};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUniversity {
    pub university_id: String,
    pub score: f32,
    pub used_features: Vec<&'static str>,
}

pub fn rank(
    scorer: &CompatibilityScorer,
    student: &Value,
    universities: &[Value],
) -> Vec<RankedUniversity> {
    let student = StudentRecord::from_value(student);
    let mut ranked: Vec<RankedUniversity> = universities
        .iter()
        .map(|value| {
            let university = UniversityRecord::from_value(value);
            let Compatibility {
                score,
                used_features,
            } = scorer.score(&student, &university);
            RankedUniversity {
                university_id: university.id,
                score,
                used_features,
            }
        })
        .collect();
    // total_cmp keeps the comparator total; sort_by is stable, so ties
    // preserve store order.
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use serde_json::json;

    fn scorer() -> CompatibilityScorer {
        CompatibilityScorer::new(ScoringConfig::default())
    }

    fn student() -> Value {
        json!({
            "id": "s1",
            "languages": ["english"],
            "preferences": { "countries_targets": ["gb"] }
        })
    }

    #[test]
    fn orders_descending_by_score() {
        let universities = vec![
            json!({ "id": "low", "country": "fr", "offer": { "teaching_languages": ["french"] } }),
            json!({ "id": "high", "country": "gb", "offer": { "teaching_languages": ["english"] } }),
            json!({ "id": "mid", "country": "gb", "offer": { "teaching_languages": ["german"] } }),
        ];
        let ranked = rank(&scorer(), &student(), &universities);
        let ids: Vec<&str> = ranked.iter().map(|r| r.university_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        assert!(ranked[0].score > ranked[1].score);
        assert!(ranked[1].score > ranked[2].score);
    }

    #[test]
    fn ties_keep_store_order() {
        // A and B tie at 0.5, C wins outright; the tie resolves by position.
        let universities = vec![
            json!({ "id": "a", "country": "gb", "offer": { "teaching_languages": ["french"] } }),
            json!({ "id": "b", "country": "gb", "offer": { "teaching_languages": ["spanish"] } }),
            json!({ "id": "c", "country": "gb", "offer": { "teaching_languages": ["english"] } }),
        ];
        let ranked = rank(&scorer(), &student(), &universities);
        let ids: Vec<&str> = ranked.iter().map(|r| r.university_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(ranked[1].score, ranked[2].score);
    }

    #[test]
    fn empty_store_ranks_to_nothing() {
        assert!(rank(&scorer(), &student(), &[]).is_empty());
    }

    #[test]
    fn reranking_unchanged_inputs_is_reproducible() {
        let universities = vec![
            json!({ "id": "a", "country": "gb" }),
            json!({ "id": "b", "country": "gb" }),
        ];
        let first = rank(&scorer(), &student(), &universities);
        let second = rank(&scorer(), &student(), &universities);
        assert_eq!(first, second);
    }
}
