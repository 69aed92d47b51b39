// src/session.rs
//! Matching session: the two normalized stores, the selected student's live
//! profile, and the last ranking computed for it.
//!
//! The session is single-writer. `refine` is the only suspension point and
//! callers drive the session behind an async mutex, so the read-profile /
//! await-agent / apply-patch / re-rank sequence can never interleave with a
//! second mutation.

use crate::agent::RefineAgent;
use crate::error::MatchError;
use crate::normalize::scalar_string;
use crate::patch::deep_merge;
use crate::ranking::{rank, RankedUniversity};
use crate::scoring::CompatibilityScorer;
use crate::store::{find_by_id, NormalizedStore};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::info;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "rank_passes_total",
            "Full scoring passes over the university store."
        );
        describe_counter!(
            "refine_requests_total",
            "Refinement requests handed to the agent."
        );
        describe_counter!(
            "refine_failures_total",
            "Refinement requests the agent failed."
        );
    });
}

/// Short anonymized fingerprint for request logging. Raw user text never
/// reaches the logs, only this hash and a length.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct MatchSession {
    scorer: CompatibilityScorer,
    students: NormalizedStore,
    universities: NormalizedStore,
    /// Live profile of the selected student; the deep-merge target.
    selected: Option<Value>,
    last_ranking: Vec<RankedUniversity>,
}

impl MatchSession {
    pub fn new(
        scorer: CompatibilityScorer,
        students: NormalizedStore,
        universities: NormalizedStore,
    ) -> Self {
        ensure_metrics_described();
        Self {
            scorer,
            students,
            universities,
            selected: None,
            last_ranking: Vec::new(),
        }
    }

    pub fn scorer(&self) -> &CompatibilityScorer {
        &self.scorer
    }

    pub fn students(&self) -> &NormalizedStore {
        &self.students
    }

    pub fn universities(&self) -> &NormalizedStore {
        &self.universities
    }

    pub fn last_ranking(&self) -> &[RankedUniversity] {
        &self.last_ranking
    }

    pub fn selected_profile(&self) -> Option<&Value> {
        self.selected.as_ref()
    }

    pub fn selected_student_id(&self) -> Option<String> {
        self.selected
            .as_ref()
            .and_then(|profile| profile.get("id"))
            .and_then(scalar_string)
    }

    /// Select a student by id and compute their ranking. An unknown id
    /// leaves the previous selection and ranking in place.
    pub fn rank_for(&mut self, student_id: &str) -> Result<&[RankedUniversity], MatchError> {
        let record = find_by_id(&self.students.records, student_id)
            .ok_or_else(|| MatchError::StudentNotFound(student_id.to_string()))?
            .clone();
        self.selected = Some(record);
        self.rerank();
        info!(
            student = student_id,
            results = self.last_ranking.len(),
            "ranked university store for student"
        );
        Ok(&self.last_ranking)
    }

    /// One refinement round: ask the agent for a patch, merge it into the
    /// selected profile, re-rank. Any agent failure leaves both the profile
    /// and the stored ranking untouched.
    pub async fn refine(
        &mut self,
        agent: &dyn RefineAgent,
        message: &str,
    ) -> Result<&[RankedUniversity], MatchError> {
        let Some(profile) = self.selected.clone() else {
            return Err(MatchError::NoStudentSelected);
        };
        counter!("refine_requests_total").increment(1);

        let request_id = anon_hash(message);
        let patch = match agent.refine(&profile, message).await {
            Ok(patch) => patch,
            Err(err) => {
                counter!("refine_failures_total").increment(1);
                info!(
                    %request_id,
                    agent = agent.name(),
                    error = %err,
                    "refinement failed; profile unchanged"
                );
                return Err(err.into());
            }
        };

        let patched_fields: Vec<String> = patch
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(target) = self.selected.as_mut() {
            deep_merge(target, &patch);
        }
        self.rerank();
        info!(
            %request_id,
            agent = agent.name(),
            message_len = message.len(),
            patched = ?patched_fields,
            top_score = self.last_ranking.first().map(|r| r.score),
            "applied refinement patch and re-ranked"
        );
        Ok(&self.last_ranking)
    }

    fn rerank(&mut self) {
        if let Some(profile) = &self.selected {
            self.last_ranking = rank(&self.scorer, profile, &self.universities.records);
            counter!("rank_passes_total").increment(1);
        }
    }
}
