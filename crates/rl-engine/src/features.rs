//! Candidate feature encoding: one-hot industry and stage, plus capped
//! numeric metrics.
//!
//! Layout (d = |industries| + |stages| + 3):
//!   [0..I)         industry one-hot
//!   [I..I+S)       stage one-hot
//!   [I+S..d)       revenue, burn rate, founder experience, each in [0, 1]

use ndarray::Array1;
use std::ops::Range;
use tracing::debug;
use venture_core::config::FeatureConfig;
use venture_core::types::Candidate;

pub type FeatureVector = Array1<f64>;

/// Number of numeric metrics appended after the categorical blocks.
pub const NUMERIC_FEATURES: usize = 3;

/// Stateless encoder from catalog attributes to fixed-length vectors.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    industries: Vec<String>,
    stages: Vec<String>,
    revenue_cap: f64,
    burn_cap: f64,
    experience_cap: f64,
}

impl FeatureEncoder {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            industries: config.industries.clone(),
            stages: config.stages.clone(),
            revenue_cap: config.revenue_cap,
            burn_cap: config.burn_cap,
            experience_cap: config.experience_cap,
        }
    }

    pub fn dimension(&self) -> usize {
        self.industries.len() + self.stages.len() + NUMERIC_FEATURES
    }

    pub fn industry_range(&self) -> Range<usize> {
        0..self.industries.len()
    }

    pub fn stage_range(&self) -> Range<usize> {
        let start = self.industries.len();
        start..start + self.stages.len()
    }

    pub fn numeric_range(&self) -> Range<usize> {
        let start = self.industries.len() + self.stages.len();
        start..start + NUMERIC_FEATURES
    }

    /// Encode a candidate. Unknown categories yield an all-zero block and
    /// missing metrics encode as zero; no input is rejected.
    pub fn encode(&self, candidate: &Candidate) -> FeatureVector {
        let mut x = Array1::<f64>::zeros(self.dimension());

        if let Some(idx) = position(&self.industries, candidate.industry.as_deref()) {
            x[idx] = 1.0;
        }
        if let Some(idx) = position(&self.stages, candidate.stage.as_deref()) {
            x[self.industries.len() + idx] = 1.0;
        }

        let raw = &candidate.metrics;
        let numeric = [
            (raw.mrr, self.revenue_cap, "mrr"),
            (raw.burn_rate, self.burn_cap, "burn_rate"),
            (
                raw.founder_experience_score,
                self.experience_cap,
                "founder_experience_score",
            ),
        ];

        let offset = self.numeric_range().start;
        for (i, (value, cap, name)) in numeric.into_iter().enumerate() {
            x[offset + i] = match value {
                Some(v) if v.is_finite() => normalize(v, cap),
                _ => {
                    debug!(
                        candidate_id = %candidate.id,
                        metric = name,
                        "Metric missing, encoding as 0"
                    );
                    metrics::counter!("features.metric_defaulted").increment(1);
                    0.0
                }
            };
        }

        x
    }

    /// Human-readable name for every feature slot, in layout order.
    pub fn feature_names(&self) -> Vec<String> {
        self.industries
            .iter()
            .map(|i| format!("industry:{i}"))
            .chain(self.stages.iter().map(|s| format!("stage:{s}")))
            .chain(
                ["revenue", "burn_rate", "founder_experience"]
                    .iter()
                    .map(|s| s.to_string()),
            )
            .collect()
    }
}

fn position(values: &[String], needle: Option<&str>) -> Option<usize> {
    let needle = needle?;
    values.iter().position(|v| v == needle)
}

fn normalize(value: f64, cap: f64) -> f64 {
    (value / cap).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use venture_core::types::CandidateMetrics;

    fn encoder() -> FeatureEncoder {
        FeatureEncoder::new(&FeatureConfig::default())
    }

    fn candidate(industry: &str, stage: &str, metrics: CandidateMetrics) -> Candidate {
        Candidate {
            id: "c-1".to_string(),
            name: None,
            industry: Some(industry.to_string()),
            stage: Some(stage.to_string()),
            metrics,
        }
    }

    fn block_sum(x: &FeatureVector, range: Range<usize>) -> f64 {
        x.slice(ndarray::s![range]).sum()
    }

    #[test]
    fn test_dimension_and_layout() {
        let enc = encoder();
        assert_eq!(enc.dimension(), 18);
        assert_eq!(enc.industry_range(), 0..10);
        assert_eq!(enc.stage_range(), 10..15);
        assert_eq!(enc.numeric_range(), 15..18);
        assert_eq!(enc.feature_names().len(), 18);
    }

    #[test]
    fn test_one_hot_blocks() {
        let enc = encoder();
        let x = enc.encode(&candidate("FinTech", "Series A", CandidateMetrics::default()));
        assert_eq!(x.len(), 18);
        assert_eq!(x[1], 1.0);
        assert_eq!(x[12], 1.0);
        assert_eq!(block_sum(&x, enc.industry_range()), 1.0);
        assert_eq!(block_sum(&x, enc.stage_range()), 1.0);
    }

    #[test]
    fn test_unknown_categories_encode_as_zero_block() {
        let enc = encoder();
        let x = enc.encode(&candidate("AgTech", "Series Z", CandidateMetrics::default()));
        assert_eq!(block_sum(&x, enc.industry_range()), 0.0);
        assert_eq!(block_sum(&x, enc.stage_range()), 0.0);

        let empty = enc.encode(&Candidate {
            id: "c-2".to_string(),
            ..Default::default()
        });
        assert!(empty.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_numeric_normalization_and_clamping() {
        let enc = encoder();
        let x = enc.encode(&candidate(
            "SaaS",
            "Seed",
            CandidateMetrics {
                mrr: Some(100_000.0),
                burn_rate: Some(250_000.0),
                founder_experience_score: Some(-3.0),
                ..Default::default()
            },
        ));
        assert_eq!(x[15], 0.5);
        assert_eq!(x[16], 1.0);
        assert_eq!(x[17], 0.0);
    }

    #[test]
    fn test_non_finite_metric_treated_as_missing() {
        let enc = encoder();
        let x = enc.encode(&candidate(
            "SaaS",
            "Seed",
            CandidateMetrics {
                mrr: Some(f64::NAN),
                ..Default::default()
            },
        ));
        assert_eq!(x[15], 0.0);
    }

    #[test]
    fn test_all_entries_in_unit_interval() {
        let enc = encoder();
        for (industry, stage, mrr) in [
            ("HealthTech", "Pre-Seed", 1e9),
            ("Gaming", "Series C+", 12_345.0),
            ("Unknown", "Seed", -50.0),
        ] {
            let x = enc.encode(&candidate(
                industry,
                stage,
                CandidateMetrics {
                    mrr: Some(mrr),
                    burn_rate: Some(mrr / 2.0),
                    founder_experience_score: Some(7.5),
                    ..Default::default()
                },
            ));
            assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
            assert!(block_sum(&x, enc.industry_range()) <= 1.0);
            assert!(block_sum(&x, enc.stage_range()) <= 1.0);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let enc = encoder();
        let c = candidate(
            "Biotech",
            "Series B",
            CandidateMetrics {
                mrr: Some(42_000.0),
                ..Default::default()
            },
        );
        assert_eq!(enc.encode(&c), enc.encode(&c));
    }
}
