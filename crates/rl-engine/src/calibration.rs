//! Preference calibration: soft multiplicative penalties for candidates outside
//! the investor's stated industries, stages and valuation band.

use serde::{Deserialize, Serialize};
use venture_core::config::CalibrationConfig;
use venture_core::types::{Candidate, Preferences};

/// Which preference checks a candidate failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceMismatch {
    pub industry: bool,
    pub stage: bool,
    pub valuation: bool,
}

#[derive(Debug, Clone)]
pub struct PreferenceCalibrator {
    industry_penalty: f64,
    stage_penalty: f64,
    valuation_penalty: f64,
}

impl PreferenceCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            industry_penalty: config.industry_penalty,
            stage_penalty: config.stage_penalty,
            valuation_penalty: config.valuation_penalty,
        }
    }

    /// A preference list that is stated (even if empty) and does not contain the
    /// candidate's value counts as a mismatch; an unstated list never does. The
    /// valuation band applies only when both ends are stated, and a missing
    /// valuation is read as 0.
    pub fn mismatches(
        &self,
        candidate: &Candidate,
        preferences: &Preferences,
    ) -> PreferenceMismatch {
        let industry = preferences
            .industries
            .as_ref()
            .is_some_and(|allowed| !contains(allowed, candidate.industry.as_deref()));
        let stage = preferences
            .stages
            .as_ref()
            .is_some_and(|allowed| !contains(allowed, candidate.stage.as_deref()));
        let valuation = preferences.valuation_band().is_some_and(|(min, max)| {
            let v = candidate.metrics.valuation.unwrap_or(0.0);
            v < min || v > max
        });
        PreferenceMismatch {
            industry,
            stage,
            valuation,
        }
    }

    /// Combined multiplier; independent penalties stack multiplicatively.
    pub fn factor(&self, mismatch: PreferenceMismatch) -> f64 {
        let mut factor = 1.0;
        if mismatch.industry {
            factor *= self.industry_penalty;
        }
        if mismatch.stage {
            factor *= self.stage_penalty;
        }
        if mismatch.valuation {
            factor *= self.valuation_penalty;
        }
        factor
    }

    pub fn calibrate(
        &self,
        raw_score: f64,
        candidate: &Candidate,
        preferences: &Preferences,
    ) -> f64 {
        raw_score * self.factor(self.mismatches(candidate, preferences))
    }
}

impl Default for PreferenceCalibrator {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

fn contains(allowed: &[String], value: Option<&str>) -> bool {
    value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use venture_core::types::CandidateMetrics;

    fn candidate(industry: &str, stage: &str, valuation: Option<f64>) -> Candidate {
        Candidate {
            id: "c-1".to_string(),
            name: None,
            industry: Some(industry.to_string()),
            stage: Some(stage.to_string()),
            metrics: CandidateMetrics {
                valuation,
                ..Default::default()
            },
        }
    }

    fn preferences() -> Preferences {
        Preferences {
            industries: Some(vec!["FinTech".to_string(), "SaaS".to_string()]),
            stages: Some(vec!["Seed".to_string()]),
            valuation_min: Some(1_000_000.0),
            valuation_max: Some(10_000_000.0),
            max_burn_rate: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_full_match_is_unpenalized() {
        let cal = PreferenceCalibrator::default();
        let c = candidate("FinTech", "Seed", Some(5_000_000.0));
        assert_eq!(cal.calibrate(2.0, &c, &preferences()), 2.0);
    }

    #[test]
    fn test_industry_and_stage_mismatch_stack() {
        let cal = PreferenceCalibrator::default();
        let c = candidate("Gaming", "Series B", Some(5_000_000.0));
        assert!(approx(cal.calibrate(1.0, &c, &preferences()), 0.56));
    }

    #[test]
    fn test_valuation_and_stage_mismatch_stack() {
        let cal = PreferenceCalibrator::default();
        let c = candidate("SaaS", "Series A", Some(50_000_000.0));
        assert!(approx(cal.calibrate(1.0, &c, &preferences()), 0.48));
    }

    #[test]
    fn test_all_three_penalties() {
        let cal = PreferenceCalibrator::default();
        let c = candidate("Gaming", "Series A", Some(1.0));
        assert!(approx(cal.calibrate(10.0, &c, &preferences()), 10.0 * 0.7 * 0.8 * 0.6));
    }

    #[test]
    fn test_missing_valuation_reads_as_zero() {
        let cal = PreferenceCalibrator::default();
        let c = candidate("FinTech", "Seed", None);
        let m = cal.mismatches(&c, &preferences());
        assert!(m.valuation);
        assert!(!m.industry && !m.stage);
    }

    #[test]
    fn test_unstated_preferences_never_penalize() {
        let cal = PreferenceCalibrator::default();
        let c = candidate("Gaming", "Series C+", None);
        assert_eq!(cal.calibrate(3.0, &c, &Preferences::default()), 3.0);

        let half_band = Preferences {
            valuation_min: Some(1.0),
            ..Default::default()
        };
        assert_eq!(cal.calibrate(3.0, &c, &half_band), 3.0);
    }

    #[test]
    fn test_stated_empty_list_penalizes() {
        let cal = PreferenceCalibrator::default();
        let prefs = Preferences {
            industries: Some(Vec::new()),
            ..Default::default()
        };
        let c = candidate("FinTech", "Seed", None);
        assert!(approx(cal.calibrate(1.0, &c, &prefs), 0.7));
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let cal = PreferenceCalibrator::default();
        let prefs = preferences();
        let low = candidate("FinTech", "Seed", Some(1_000_000.0));
        let high = candidate("FinTech", "Seed", Some(10_000_000.0));
        assert!(!cal.mismatches(&low, &prefs).valuation);
        assert!(!cal.mismatches(&high, &prefs).valuation);
    }
}
