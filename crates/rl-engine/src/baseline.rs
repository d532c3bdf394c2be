//! Heuristic baseline scorer: a hand-tuned weighted sum of a rule-based
//! "reinforcement" score (70%) and a popularity-based "collaborative" score (30%).
//!
//! This is a comparison baseline only. It neither reads nor updates bandit
//! state and its output is always labelled [`HEURISTIC_METHOD`].

use venture_core::types::{BaselineScore, Candidate, Preferences};

pub const HEURISTIC_METHOD: &str = "heuristic_baseline";

const REINFORCEMENT_WEIGHT: f64 = 0.7;
const COLLABORATIVE_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, candidate: &Candidate, preferences: &Preferences) -> BaselineScore {
        let reinforcement = self.reinforcement(candidate, preferences);
        let collaborative = self.collaborative(candidate);
        BaselineScore {
            candidate_id: candidate.id.clone(),
            score: (reinforcement * REINFORCEMENT_WEIGHT + collaborative * COLLABORATIVE_WEIGHT)
                .round(),
            reinforcement,
            collaborative,
        }
    }

    /// Rule-based preference fit in [0, 100].
    pub fn reinforcement(&self, candidate: &Candidate, preferences: &Preferences) -> f64 {
        let metrics = &candidate.metrics;
        let growth = metrics.mrr_growth.unwrap_or(0.0);
        let valuation = metrics.valuation.unwrap_or(0.0);
        let burn = metrics.burn_rate.unwrap_or(0.0);
        let experience = metrics.founder_experience_score.unwrap_or(0.0);
        let stage = candidate.stage.as_deref().unwrap_or_default();
        let mut score = 0.0;

        if listed(&preferences.industries, candidate.industry.as_deref()) {
            score += 25.0 + (growth * 3.0).min(15.0);
        } else {
            score -= 10.0;
        }

        if listed(&preferences.stages, candidate.stage.as_deref()) {
            score += 20.0 + growth * stage_growth_multiplier(stage);
        }

        if let Some((min, max)) = preferences.valuation_band() {
            if valuation >= min && valuation <= max {
                let width = max - min;
                let deviation = if width > 0.0 {
                    (valuation - (min + max) / 2.0).abs() / width
                } else {
                    0.0
                };
                score += 20.0 + 10.0 * (1.0 - deviation);
            } else {
                let overshoot = if valuation > max {
                    relative_excess(valuation - max, max)
                } else {
                    relative_excess(min - valuation, min)
                };
                score -= (overshoot * 30.0).min(20.0);
            }
        }

        if growth > 0.0 {
            score += (growth * 8.0).min(20.0);
            if growth > 2.0 {
                score += 5.0;
            }
        } else {
            score -= 15.0;
        }

        if let Some(max_burn) = preferences.max_burn_rate.filter(|m| *m > 0.0) {
            if burn < max_burn {
                score += (max_burn - burn) / max_burn * 15.0;
            } else {
                score -= ((burn - max_burn) / max_burn * 25.0).min(20.0);
            }
        }

        score += if experience > 7.0 {
            10.0 + (experience - 7.0) * 2.0
        } else {
            experience
        };

        score.clamp(0.0, 100.0)
    }

    /// Industry and stage popularity prior in [0, 100].
    pub fn collaborative(&self, candidate: &Candidate) -> f64 {
        let growth = candidate.metrics.mrr_growth.unwrap_or(0.0);
        let mut score = 50.0;

        let industry = candidate.industry.as_deref().unwrap_or_default();
        let stage = candidate.stage.as_deref().unwrap_or_default();
        score += (industry_popularity(industry) - 0.5) * 30.0;
        score += (stage_popularity(stage) - 0.5) * 20.0;

        if growth > 2.0 {
            score += 15.0;
        } else if growth > 1.0 {
            score += 10.0;
        } else if growth < 0.0 {
            score -= 15.0;
        }

        score.clamp(0.0, 100.0)
    }
}

fn listed(allowed: &Option<Vec<String>>, value: Option<&str>) -> bool {
    match (allowed, value) {
        (Some(list), Some(v)) => list.iter().any(|a| a == v),
        _ => false,
    }
}

fn relative_excess(excess: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        excess / reference
    } else {
        1.0
    }
}

fn stage_growth_multiplier(stage: &str) -> f64 {
    match stage {
        "Pre-Seed" => 1.2,
        "Seed" => 1.5,
        "Series A" => 1.8,
        "Series B" => 2.0,
        _ => 1.0,
    }
}

fn industry_popularity(industry: &str) -> f64 {
    match industry {
        "AI/ML" => 0.90,
        "FinTech" | "Cybersecurity" => 0.85,
        "HealthTech" => 0.80,
        "CleanTech" => 0.75,
        "EdTech" => 0.70,
        "E-commerce" => 0.65,
        "HR Tech" => 0.60,
        "AgTech" => 0.55,
        _ => 0.5,
    }
}

fn stage_popularity(stage: &str) -> f64 {
    match stage {
        "Pre-Seed" => 0.6,
        "Seed" => 0.8,
        "Series A" => 0.9,
        "Series B" => 0.7,
        _ => 0.5,
    }
}
