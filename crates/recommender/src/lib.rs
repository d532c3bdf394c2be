#![warn(clippy::unwrap_used)]

//! Recommendation pipeline: exclusion, candidate fetch, LinUCB scoring,
//! calibration and ranking, plus the serialized per-investor update path.

pub mod locks;
pub mod selector;
pub mod service;

pub use locks::InvestorLocks;
pub use selector::CandidateSelector;
pub use service::{RecommendationService, Stores};
