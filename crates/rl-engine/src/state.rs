//! Per-investor ridge-regression sufficient statistics and their persisted form.

use crate::linalg::{self, LinalgError};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use venture_core::{RecommenderError, RecommenderResult};

/// Tolerance for the symmetry check on decoded matrices.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Sufficient statistics `(A, b)` for one investor. `A` is symmetric
/// positive-definite; mutated only through [`crate::contextual::UpdateEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct BanditState {
    pub(crate) a: Array2<f64>,
    pub(crate) b: Array1<f64>,
}

impl BanditState {
    /// Ridge prior: `A = lambda * I`, `b = 0`.
    pub fn new(dimension: usize, lambda: f64) -> Self {
        Self {
            a: linalg::scaled_identity(dimension, lambda),
            b: Array1::zeros(dimension),
        }
    }

    /// Build a state from raw parts, rejecting shapes or values that could
    /// not have come from the update law.
    pub fn from_parts(a: Array2<f64>, b: Array1<f64>) -> Result<Self, LinalgError> {
        let (rows, cols) = a.dim();
        if rows != cols {
            return Err(LinalgError::NotSquare { rows, cols });
        }
        if b.len() != rows {
            return Err(LinalgError::DimensionMismatch {
                expected: rows,
                actual: b.len(),
            });
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }
        Ok(Self { a, b })
    }

    pub fn dimension(&self) -> usize {
        self.b.len()
    }

    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    pub fn b(&self) -> &Array1<f64> {
        &self.b
    }

    /// Encode as a storage row.
    pub fn to_row(
        &self,
        investor_id: &str,
        version: u64,
        last_updated: DateTime<Utc>,
    ) -> BanditStateRow {
        BanditStateRow {
            investor_id: investor_id.to_string(),
            dimension: self.dimension(),
            a: self.a.outer_iter().map(|row| row.to_vec()).collect(),
            b: self.b.to_vec(),
            version,
            last_updated,
        }
    }

    /// Decode a storage row. Any inconsistency is reported as
    /// [`RecommenderError::StateCorrupted`]; the row is never repaired here.
    pub fn from_row(row: &BanditStateRow) -> RecommenderResult<Self> {
        let d = row.dimension;
        let corrupted = |reason: String| RecommenderError::corrupted(&row.investor_id, reason);

        if row.a.len() != d {
            return Err(corrupted(format!("A has {} rows, dimension is {d}", row.a.len())));
        }
        if let Some((i, r)) = row.a.iter().enumerate().find(|(_, r)| r.len() != d) {
            return Err(corrupted(format!("A row {i} has {} columns, dimension is {d}", r.len())));
        }
        if row.b.len() != d {
            return Err(corrupted(format!("b has {} entries, dimension is {d}", row.b.len())));
        }

        let flat: Vec<f64> = row.a.iter().flatten().copied().collect();
        let a = Array2::from_shape_vec((d, d), flat).map_err(|e| corrupted(e.to_string()))?;
        let b = Array1::from_vec(row.b.clone());

        if !linalg::is_symmetric(&a, SYMMETRY_TOLERANCE) {
            return Err(corrupted("A is not symmetric".to_string()));
        }
        Self::from_parts(a, b).map_err(|e| corrupted(e.to_string()))
    }
}

/// Persisted layout, one row per investor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BanditStateRow {
    pub investor_id: String,
    pub dimension: usize,
    #[serde(rename = "A")]
    pub a: Vec<Vec<f64>>,
    pub b: Vec<f64>,
    /// Monotonic write counter used for optimistic concurrency.
    #[serde(default)]
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

/// A decoded state together with the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedState {
    pub state: BanditState,
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> BanditState {
        let mut a = linalg::scaled_identity(3, 1.0);
        linalg::add_outer_product(&mut a, &ndarray::array![1.0, 0.0, 0.25]).unwrap();
        BanditState::from_parts(a, ndarray::array![1.0, 0.0, 0.25]).unwrap()
    }

    #[test]
    fn test_new_is_ridge_prior() {
        let state = BanditState::new(4, 1.0);
        assert_eq!(state.dimension(), 4);
        assert_eq!(state.a(), &Array2::<f64>::eye(4));
        assert!(state.b().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_row_round_trip() {
        let state = sample_state();
        let row = state.to_row("inv-1", 3, Utc::now());
        assert_eq!(row.dimension, 3);
        assert_eq!(row.version, 3);

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"A\""));
        let parsed: BanditStateRow = serde_json::from_str(&json).unwrap();
        assert_eq!(BanditState::from_row(&parsed).unwrap(), state);
    }

    #[test]
    fn test_from_row_rejects_ragged_matrix() {
        let mut row = sample_state().to_row("inv-1", 1, Utc::now());
        row.a[1].pop();
        let err = BanditState::from_row(&row).unwrap_err();
        assert_eq!(err.kind(), "state_corrupted");
    }

    #[test]
    fn test_from_row_rejects_wrong_vector_length() {
        let mut row = sample_state().to_row("inv-1", 1, Utc::now());
        row.b.push(0.0);
        assert!(matches!(
            BanditState::from_row(&row),
            Err(RecommenderError::StateCorrupted { .. })
        ));
    }

    #[test]
    fn test_from_row_rejects_asymmetric_matrix() {
        let mut row = sample_state().to_row("inv-1", 1, Utc::now());
        row.a[0][2] += 1.0;
        assert!(BanditState::from_row(&row).is_err());
    }

    #[test]
    fn test_from_parts_rejects_non_finite() {
        let a = Array2::<f64>::eye(2);
        let b = ndarray::array![f64::INFINITY, 0.0];
        assert_eq!(BanditState::from_parts(a, b), Err(LinalgError::NonFinite));
    }
}
