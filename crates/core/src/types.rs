use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A startup in the external catalog. Read-only to the ranking core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub metrics: CandidateMetrics,
}

/// Raw business metrics. Any field may be absent; encoders treat absence as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateMetrics {
    /// Monthly recurring revenue.
    #[serde(default)]
    pub mrr: Option<f64>,
    #[serde(default)]
    pub burn_rate: Option<f64>,
    #[serde(default)]
    pub founder_experience_score: Option<f64>,
    #[serde(default)]
    pub valuation: Option<f64>,
    /// Year-over-year MRR growth as a multiple (2.8 = +280%).
    #[serde(default)]
    pub mrr_growth: Option<f64>,
}

/// Stated investor preferences. `None` means "no stated preference" and never penalizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default)]
    pub industries: Option<Vec<String>>,
    #[serde(default)]
    pub stages: Option<Vec<String>>,
    #[serde(default)]
    pub valuation_min: Option<f64>,
    #[serde(default)]
    pub valuation_max: Option<f64>,
    #[serde(default)]
    pub max_burn_rate: Option<f64>,
}

impl Preferences {
    /// The stated valuation band, if both ends are present.
    pub fn valuation_band(&self) -> Option<(f64, f64)> {
        match (self.valuation_min, self.valuation_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

/// Investor feedback on a recommended candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Invest,
    Pass,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Invest => write!(f, "invest"),
            Action::Pass => write!(f, "pass"),
        }
    }
}

/// One entry in the append-only interaction log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub investor_id: String,
    pub candidate_id: String,
    pub action: Action,
    pub reward: f64,
    pub timestamp: DateTime<Utc>,
}

/// A ranked recommendation produced for a single request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    pub candidate_id: String,
    pub raw_score: f64,
    pub calibrated_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResponse {
    pub recommendations: Vec<ScoredCandidate>,
    /// Number of unseen candidates that were scored before truncation to top-N.
    pub total_candidates: usize,
}

impl ScoreResponse {
    pub fn empty() -> Self {
        Self {
            recommendations: Vec::new(),
            total_candidates: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetResponse {
    pub success: bool,
    /// State version written by the reset.
    pub version: u64,
}

/// A candidate ranked by the heuristic baseline scorer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaselineScore {
    pub candidate_id: String,
    pub score: f64,
    pub reinforcement: f64,
    pub collaborative: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaselineResponse {
    /// Always `heuristic_baseline`; kept explicit so callers never confuse it with LinUCB.
    pub method: String,
    pub recommendations: Vec<BaselineScore>,
    pub total_candidates: usize,
}
