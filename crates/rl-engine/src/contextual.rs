//! Contextual Bandits: LinUCB scoring and the online ridge-regression update.

use crate::features::FeatureVector;
use crate::linalg::{self, LinalgError};
use crate::state::BanditState;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Decomposed UCB score for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UcbScore {
    pub mean: f64,
    pub uncertainty: f64,
    pub raw_score: f64,
}

/// Everything needed to score a batch against one fixed `(A, b)`:
/// the inverse and `theta = A⁻¹ b`, computed exactly once.
#[derive(Debug, Clone)]
pub struct ScoringSnapshot {
    theta: Array1<f64>,
    /// `None` when inversion failed; scoring is then exploitation-only.
    a_inv: Option<Array2<f64>>,
    alpha: f64,
}

impl ScoringSnapshot {
    pub fn theta(&self) -> &Array1<f64> {
        &self.theta
    }

    pub fn inverse(&self) -> Option<&Array2<f64>> {
        self.a_inv.as_ref()
    }

    pub fn is_exploitation_only(&self) -> bool {
        self.a_inv.is_none()
    }

    pub fn score(&self, x: &FeatureVector) -> Result<UcbScore, LinalgError> {
        let mean = linalg::dot(&self.theta, x)?;
        let uncertainty = match &self.a_inv {
            Some(a_inv) => linalg::quadratic_form(a_inv, x)?.max(0.0).sqrt(),
            None => 0.0,
        };
        Ok(UcbScore {
            mean,
            uncertainty,
            raw_score: mean + self.alpha * uncertainty,
        })
    }
}

/// LinUCB scorer: `theta·x + alpha * sqrt(xᵗ A⁻¹ x)`.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    alpha: f64,
}

impl ScoringEngine {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Invert `A` once for a batch. On a non-finite or singular result the
    /// uncertainty term is dropped and theta comes from a direct solve.
    pub fn snapshot(&self, state: &BanditState) -> ScoringSnapshot {
        match linalg::invert(state.a()) {
            Ok(a_inv) => {
                let theta = a_inv.dot(state.b());
                if theta.iter().all(|v| v.is_finite()) {
                    return ScoringSnapshot {
                        theta,
                        a_inv: Some(a_inv),
                        alpha: self.alpha,
                    };
                }
                warn!(
                    "theta is non-finite after inversion, falling back to exploitation-only scoring"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Matrix inversion failed, falling back to exploitation-only scoring"
                );
            }
        }
        metrics::counter!("scoring.inversion_fallback").increment(1);

        let theta = linalg::solve(state.a(), state.b()).unwrap_or_else(|e| {
            warn!(error = %e, "Direct solve failed as well, exploitation term set to 0");
            Array1::zeros(state.dimension())
        });
        ScoringSnapshot {
            theta,
            a_inv: None,
            alpha: self.alpha,
        }
    }

    /// Score every `(id, x)` pair against the same snapshot of `state`.
    pub fn score_batch(
        &self,
        state: &BanditState,
        candidates: &[(String, FeatureVector)],
    ) -> Result<Vec<(String, f64)>, LinalgError> {
        let snapshot = self.snapshot(state);
        candidates
            .iter()
            .map(|(id, x)| snapshot.score(x).map(|s| (id.clone(), s.raw_score)))
            .collect()
    }
}

/// Online ridge-regression update: `A ← A + x xᵗ`, `b ← b + reward x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateEngine;

impl UpdateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fold one observation into `state`. The state is left untouched on error.
    pub fn apply(
        &self,
        state: &mut BanditState,
        x: &FeatureVector,
        reward: f64,
    ) -> Result<(), LinalgError> {
        if x.len() != state.dimension() {
            return Err(LinalgError::DimensionMismatch {
                expected: state.dimension(),
                actual: x.len(),
            });
        }
        if !reward.is_finite() || x.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }
        linalg::add_outer_product(&mut state.a, x)?;
        linalg::add_scaled(&mut state.b, x, reward)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn norm(x: &FeatureVector) -> f64 {
        x.dot(x).sqrt()
    }

    #[test]
    fn test_fresh_state_scores_alpha_times_norm() {
        let state = BanditState::new(4, 1.0);
        let engine = ScoringEngine::new(1.5);
        let snapshot = engine.snapshot(&state);
        assert!(snapshot.theta().iter().all(|v| *v == 0.0));

        for x in [array![1.0, 0.0, 0.0, 0.0], array![1.0, 1.0, 0.5, 0.0], Array1::zeros(4)] {
            let s = snapshot.score(&x).unwrap();
            assert_eq!(s.mean, 0.0);
            assert!((s.raw_score - 1.5 * norm(&x)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_update_changes_diagonal_and_b() {
        let mut state = BanditState::new(3, 1.0);
        let x = array![1.0, 0.0, 0.5];
        UpdateEngine::new().apply(&mut state, &x, 1.0).unwrap();

        assert_eq!(state.a()[[0, 0]], 2.0);
        assert_eq!(state.a()[[1, 1]], 1.0);
        assert_eq!(state.a()[[2, 2]], 1.25);
        assert_eq!(state.b(), &array![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_zero_reward_only_moves_a() {
        let mut state = BanditState::new(2, 1.0);
        UpdateEngine::new()
            .apply(&mut state, &array![1.0, 1.0], 0.0)
            .unwrap();
        assert_eq!(state.b(), &array![0.0, 0.0]);
        assert_eq!(state.a(), &array![[2.0, 1.0], [1.0, 2.0]]);
    }

    #[test]
    fn test_positive_reward_raises_score() {
        let engine = ScoringEngine::new(1.0);
        let mut state = BanditState::new(3, 1.0);
        let x = array![1.0, 0.0, 0.3];
        let before = engine.snapshot(&state).score(&x).unwrap().raw_score;

        UpdateEngine::new().apply(&mut state, &x, 1.0).unwrap();
        UpdateEngine::new().apply(&mut state, &x, 1.0).unwrap();

        let after = engine.snapshot(&state).score(&x).unwrap();
        assert!(after.raw_score > before);
        assert!(after.mean > 0.0);
    }

    #[test]
    fn test_uncertainty_shrinks_with_evidence() {
        let engine = ScoringEngine::new(1.0);
        let mut state = BanditState::new(2, 1.0);
        let x = array![1.0, 0.0];
        let before = engine.snapshot(&state).score(&x).unwrap().uncertainty;
        UpdateEngine::new().apply(&mut state, &x, 0.0).unwrap();
        let after = engine.snapshot(&state).score(&x).unwrap().uncertainty;
        assert!(after < before);
    }

    #[test]
    fn test_update_rejects_wrong_dimension() {
        let mut state = BanditState::new(3, 1.0);
        let original = state.clone();
        let err = UpdateEngine::new()
            .apply(&mut state, &array![1.0, 0.0], 1.0)
            .unwrap_err();
        assert_eq!(err, LinalgError::DimensionMismatch { expected: 3, actual: 2 });
        assert_eq!(state, original);
    }

    #[test]
    fn test_update_rejects_non_finite_reward() {
        let mut state = BanditState::new(2, 1.0);
        assert!(UpdateEngine::new()
            .apply(&mut state, &array![1.0, 0.0], f64::NAN)
            .is_err());
        assert_eq!(state, BanditState::new(2, 1.0));
    }

    #[test]
    fn test_singular_matrix_falls_back_to_exploitation() {
        // Not reachable through the update law, but a snapshot must still be usable.
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        let state = BanditState::from_parts(a, array![1.0, 1.0]).unwrap();
        let snapshot = ScoringEngine::new(1.0).snapshot(&state);
        assert!(snapshot.is_exploitation_only());

        let s = snapshot.score(&array![1.0, 0.0]).unwrap();
        assert_eq!(s.uncertainty, 0.0);
        assert_eq!(s.raw_score, s.mean);
        assert!(s.raw_score.is_finite());
    }

    #[test]
    fn test_score_batch_preserves_order() {
        let state = BanditState::new(2, 1.0);
        let batch = vec![
            ("a".to_string(), array![1.0, 0.0]),
            ("b".to_string(), array![1.0, 1.0]),
        ];
        let scored = ScoringEngine::new(1.0).score_batch(&state, &batch).unwrap();
        assert_eq!(scored[0].0, "a");
        assert!((scored[0].1 - 1.0).abs() < 1e-12);
        assert!((scored[1].1 - 2f64.sqrt()).abs() < 1e-12);
    }
}
