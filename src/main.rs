//! uni-match — binary entrypoint.
//! Loads configuration and the two normalized stores, then boots the Axum
//! HTTP server with the matching session and the refinement agent.
//!
//! See `README.md` for quickstart notes.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use uni_match::agent::{build_agent, AgentConfig};
use uni_match::api;
use uni_match::metrics::Metrics;
use uni_match::scoring::CompatibilityScorer;
use uni_match::session::MatchSession;
use uni_match::store;
use uni_match::ScoringConfig;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("uni_match=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let scoring = ScoringConfig::load()?;
    let agent_config = AgentConfig::load();
    let agent = build_agent(&agent_config);

    let student_path = env_or("STUDENT_STORE_PATH", "data/normalized_students.json");
    let university_path = env_or("UNIVERSITY_STORE_PATH", "data/normalized_universities.json");

    let students = store::load_store(Path::new(&student_path))?;
    info!(
        path = %student_path,
        records = students.records.len(),
        skipped = students.skipped,
        newest_update = ?students.newest_update,
        model = ?students.newest_model,
        "student store ready"
    );
    let universities = store::load_store(Path::new(&university_path))?;
    info!(
        path = %university_path,
        records = universities.records.len(),
        skipped = universities.skipped,
        newest_update = ?universities.newest_update,
        model = ?universities.newest_model,
        "university store ready"
    );

    // Optional diagnostic: how many raw entries feed the normalized store.
    let raw_student_entries = match std::env::var("RAW_STUDENT_STORE_PATH") {
        Ok(raw_path) => match store::count_raw_entries(Path::new(&raw_path)) {
            Ok(count) => {
                info!(path = %raw_path, count, "raw student store present");
                Some(count)
            }
            Err(err) => {
                warn!(path = %raw_path, error = %format!("{err:#}"), "raw student store unreadable");
                None
            }
        },
        Err(_) => None,
    };

    let metrics = Metrics::init(students.records.len(), universities.records.len());

    let session = MatchSession::new(CompatibilityScorer::new(scoring), students, universities);
    let app = api::create_router(session, agent.clone(), raw_student_entries)
        .merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, agent = agent.name(), "uni-match listening");

    axum::serve(listener, app).await?;
    Ok(())
}
