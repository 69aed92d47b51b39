// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::agent::DynRefineAgent;
use crate::config::{FeatureWeights, ScoringConfig};
use crate::error::MatchError;
use crate::session::MatchSession;

#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<MatchSession>>,
    agent: DynRefineAgent,
    /// Entry count of the raw student source, when one was configured.
    raw_student_entries: Option<usize>,
}

pub fn create_router(
    session: MatchSession,
    agent: DynRefineAgent,
    raw_student_entries: Option<usize>,
) -> Router {
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
        agent,
        raw_student_entries,
    };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/rank", post(rank_student))
        .route("/api/refine", post(refine_profile))
        .route("/api/weights", get(weights))
        .route("/api/stores", get(stores))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct RankReq {
    student_id: String,
}

#[derive(serde::Deserialize)]
struct RefineReq {
    message: String,
}

#[derive(serde::Serialize)]
struct RankRow {
    position: usize,
    university_id: String,
    score: f64,
    used_features: Vec<&'static str>,
}

#[derive(serde::Serialize)]
struct RankingResp {
    student_id: String,
    results: Vec<RankRow>,
    weights: FeatureWeights,
}

async fn rank_student(
    State(state): State<AppState>,
    Json(body): Json<RankReq>,
) -> Result<Json<RankingResp>, MatchError> {
    let mut session = state.session.lock().await;
    session.rank_for(&body.student_id)?;
    Ok(Json(ranking_response(&session)))
}

async fn refine_profile(
    State(state): State<AppState>,
    Json(body): Json<RefineReq>,
) -> Result<Json<RankingResp>, MatchError> {
    // A second refinement while one is in flight is rejected, not queued.
    let mut session = state
        .session
        .try_lock()
        .map_err(|_| MatchError::RefinementInProgress)?;
    session.refine(state.agent.as_ref(), &body.message).await?;
    Ok(Json(ranking_response(&session)))
}

async fn weights(State(state): State<AppState>) -> Json<ScoringConfig> {
    let session = state.session.lock().await;
    Json(session.scorer().config().clone())
}

#[derive(serde::Serialize)]
struct StoreInfo {
    records: usize,
    skipped_entries: usize,
    newest_update: Option<DateTime<Utc>>,
}

#[derive(serde::Serialize)]
struct StoresResp {
    students: StoreInfo,
    universities: StoreInfo,
    raw_student_entries: Option<usize>,
}

async fn stores(State(state): State<AppState>) -> Json<StoresResp> {
    let session = state.session.lock().await;
    let students = session.students();
    let universities = session.universities();
    Json(StoresResp {
        students: StoreInfo {
            records: students.records.len(),
            skipped_entries: students.skipped,
            newest_update: students.newest_update,
        },
        universities: StoreInfo {
            records: universities.records.len(),
            skipped_entries: universities.skipped,
            newest_update: universities.newest_update,
        },
        raw_student_entries: state.raw_student_entries,
    })
}

fn ranking_response(session: &MatchSession) -> RankingResp {
    let results = session
        .last_ranking()
        .iter()
        .enumerate()
        .map(|(i, r)| RankRow {
            position: i + 1,
            university_id: r.university_id.clone(),
            score: display_score(r.score),
            used_features: r.used_features.clone(),
        })
        .collect();
    RankingResp {
        student_id: session.selected_student_id().unwrap_or_default(),
        results,
        weights: session.scorer().config().weights,
    }
}

/// Three-decimal display rounding; the session keeps the raw value.
fn display_score(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round() / 1000.0
}
