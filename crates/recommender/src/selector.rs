//! Candidate ranking against one consistent snapshot of an investor's state.

use std::cmp::Ordering;
use venture_core::types::{Candidate, Preferences, ScoreResponse, ScoredCandidate};
use venture_core::RecommenderResult;
use venture_rl_engine::{
    BanditState, FeatureEncoder, FeatureVector, PreferenceCalibrator, ScoringEngine,
};

pub struct CandidateSelector {
    encoder: FeatureEncoder,
    scoring: ScoringEngine,
    calibrator: PreferenceCalibrator,
}

impl CandidateSelector {
    pub fn new(
        encoder: FeatureEncoder,
        scoring: ScoringEngine,
        calibrator: PreferenceCalibrator,
    ) -> Self {
        Self {
            encoder,
            scoring,
            calibrator,
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Encode, score with a single inversion of `A`, calibrate, rank and keep
    /// the first `top_n`. `total_candidates` counts everything scored.
    pub fn rank(
        &self,
        state: &BanditState,
        preferences: &Preferences,
        candidates: &[Candidate],
        top_n: usize,
    ) -> RecommenderResult<ScoreResponse> {
        if candidates.is_empty() {
            return Ok(ScoreResponse::empty());
        }

        let encoded: Vec<(String, FeatureVector)> = candidates
            .iter()
            .map(|c| (c.id.clone(), self.encoder.encode(c)))
            .collect();
        let raw_scores = self.scoring.score_batch(state, &encoded)?;

        let mut ranked: Vec<ScoredCandidate> = candidates
            .iter()
            .zip(raw_scores)
            .map(|(candidate, (candidate_id, raw_score))| ScoredCandidate {
                calibrated_score: self.calibrator.calibrate(raw_score, candidate, preferences),
                candidate_id,
                raw_score,
            })
            .collect();
        ranked.sort_by(ranking_order);

        let total_candidates = ranked.len();
        ranked.truncate(top_n);
        Ok(ScoreResponse {
            recommendations: ranked,
            total_candidates,
        })
    }
}

/// Calibrated score descending, then candidate id ascending.
pub fn ranking_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.calibrated_score
        .total_cmp(&a.calibrated_score)
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}
