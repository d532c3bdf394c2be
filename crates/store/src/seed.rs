//! Demo startup catalog for local runs.

use crate::memory::InMemoryCatalog;
use tracing::info;
use uuid::Uuid;
use venture_core::types::{Candidate, CandidateMetrics};

/// Catalogs larger than this are assumed to hold real data and are left alone.
const SEED_SKIP_THRESHOLD: usize = 5;

/// Name, industry, stage, MRR, burn rate, founder experience.
type DemoStartup = (&'static str, &'static str, &'static str, f64, f64, f64);

const DEMO_STARTUPS: &[DemoStartup] = &[
    ("HealthAI Diagnostics", "HealthTech", "Seed", 15_000.0, 25_000.0, 8.0),
    ("FinanceFlow Pro", "FinTech", "Series A", 75_000.0, 120_000.0, 9.0),
    ("EduTech Innovators", "EdTech", "Pre-Seed", 5_000.0, 15_000.0, 6.0),
    ("CleanEnergy Solutions", "CleanTech", "Seed", 25_000.0, 40_000.0, 7.0),
    ("CyberSecure AI", "Cybersecurity", "Series A", 95_000.0, 150_000.0, 9.0),
    ("GameChanger Studios", "Gaming", "Pre-Seed", 8_000.0, 18_000.0, 5.0),
    ("BioPharm Innovations", "Biotech", "Series B", 200_000.0, 300_000.0, 8.0),
    ("AI Assistant Co", "AI/ML", "Seed", 45_000.0, 65_000.0, 8.0),
];

/// The demo startups with freshly generated ids.
pub fn demo_candidates() -> Vec<Candidate> {
    DEMO_STARTUPS
        .iter()
        .map(|&(name, industry, stage, mrr, burn_rate, experience)| Candidate {
            id: Uuid::new_v4().to_string(),
            name: Some(name.to_string()),
            industry: Some(industry.to_string()),
            stage: Some(stage.to_string()),
            metrics: CandidateMetrics {
                mrr: Some(mrr),
                burn_rate: Some(burn_rate),
                founder_experience_score: Some(experience),
                ..Default::default()
            },
        })
        .collect()
}

/// Seed `catalog` with the demo startups. Returns how many were inserted.
pub fn seed_demo_catalog(catalog: &InMemoryCatalog) -> usize {
    let existing = catalog.len();
    if existing > SEED_SKIP_THRESHOLD {
        info!(existing = existing, "Catalog already populated, skipping demo seed");
        return 0;
    }
    let candidates = demo_candidates();
    let inserted = candidates.len();
    catalog.extend(candidates);
    info!(inserted = inserted, "Seeded demo startups");
    inserted
}
