//! Model explainability: per-feature weights and confidence widths of an
//! investor's current LinUCB estimate.

use crate::contextual::ScoringEngine;
use crate::state::BanditState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureWeight {
    pub feature_name: String,
    /// Component of `theta = A⁻¹ b`.
    pub weight: f64,
    /// `sqrt((A⁻¹)_ii)`; 0 when the inverse is unavailable.
    pub confidence_width: f64,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelExplanation {
    pub investor_id: String,
    pub dimension: usize,
    pub features: Vec<FeatureWeight>,
    pub top_features: Vec<(String, f64)>,
    pub exploitation_only: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

pub struct ExplainabilityEngine {
    scoring: ScoringEngine,
}

impl ExplainabilityEngine {
    pub fn new(scoring: ScoringEngine) -> Self {
        Self { scoring }
    }

    /// `feature_names` must be in encoder layout order; names beyond the state
    /// dimension are ignored and missing names are rendered as `x{i}`.
    pub fn explain(
        &self,
        investor_id: &str,
        state: &BanditState,
        feature_names: &[String],
        last_updated: Option<DateTime<Utc>>,
    ) -> ModelExplanation {
        let snapshot = self.scoring.snapshot(state);
        let theta = snapshot.theta();

        let features: Vec<FeatureWeight> = (0..state.dimension())
            .map(|i| {
                let weight = theta[i];
                let confidence_width = snapshot
                    .inverse()
                    .map(|inv| inv[[i, i]].max(0.0).sqrt())
                    .unwrap_or(0.0);
                FeatureWeight {
                    feature_name: feature_names
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("x{i}")),
                    weight,
                    confidence_width,
                    direction: if weight >= 0.0 {
                        "positive".to_string()
                    } else {
                        "negative".to_string()
                    },
                }
            })
            .collect();

        let mut top_features: Vec<(String, f64)> = features
            .iter()
            .filter(|f| f.weight != 0.0)
            .map(|f| (f.feature_name.clone(), f.weight))
            .collect();
        top_features.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        top_features.truncate(3);

        ModelExplanation {
            investor_id: investor_id.to_string(),
            dimension: state.dimension(),
            features,
            top_features,
            exploitation_only: snapshot.is_exploitation_only(),
            last_updated,
        }
    }
}
