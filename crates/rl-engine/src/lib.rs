//! Contextual-bandit ranking engine: feature encoding, LinUCB scoring over
//! ridge-regression sufficient statistics, online updates, preference
//! calibration, a heuristic comparison baseline, and model explainability.

pub mod baseline;
pub mod calibration;
pub mod contextual;
pub mod explainability;
pub mod features;
pub mod linalg;
pub mod reward;
pub mod state;

pub use baseline::HeuristicScorer;
pub use calibration::PreferenceCalibrator;
pub use contextual::{ScoringEngine, ScoringSnapshot, UcbScore, UpdateEngine};
pub use explainability::{ExplainabilityEngine, ModelExplanation};
pub use features::{FeatureEncoder, FeatureVector};
pub use linalg::LinalgError;
pub use reward::{BinaryRewardPolicy, RewardPolicy};
pub use state::{BanditState, BanditStateRow, VersionedState};
