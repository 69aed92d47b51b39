// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod patch;
pub mod ranking;
pub mod record;
pub mod scoring;
pub mod session;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::{ApplicationSystemPolicy, FeatureWeights, MatchDefaults, ScoringConfig};
pub use crate::error::MatchError;
pub use crate::ranking::{rank, RankedUniversity};
pub use crate::scoring::{Compatibility, CompatibilityScorer};
pub use crate::session::MatchSession;
pub use crate::store::{load_store, NormalizedStore, StoreDocument};
