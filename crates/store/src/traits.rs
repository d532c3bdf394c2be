//! Contracts for the collaborators that own candidates, preferences,
//! interactions and persisted model state.

use async_trait::async_trait;
use std::collections::HashSet;
use venture_core::types::{Candidate, InteractionRecord, Preferences};
use venture_core::RecommenderResult;
use venture_rl_engine::{BanditState, VersionedState};

/// Load/save of per-investor sufficient statistics with optimistic versioning.
#[async_trait]
pub trait BanditStateRepository: Send + Sync {
    /// `Ok(None)` for an investor with no row yet. A row that cannot be
    /// decoded yields `RecommenderError::StateCorrupted`.
    async fn load(&self, investor_id: &str) -> RecommenderResult<Option<VersionedState>>;

    /// Compare-and-swap write. `expected_version = None` succeeds only if no row
    /// exists. Returns the new version, or `VersionConflict` if the stored
    /// version differs.
    async fn save(
        &self,
        investor_id: &str,
        state: &BanditState,
        expected_version: Option<u64>,
    ) -> RecommenderResult<u64>;

    /// Unconditional write that also replaces undecodable rows. Still bumps the
    /// version so concurrent compare-and-swap writers fail.
    async fn overwrite(&self, investor_id: &str, state: &BanditState) -> RecommenderResult<u64>;
}

#[async_trait]
pub trait CandidateCatalog: Send + Sync {
    /// Up to `limit` candidates whose ids are not in `exclude`, in a stable order.
    async fn fetch_unseen_candidates(
        &self,
        investor_id: &str,
        exclude: &HashSet<String>,
        limit: usize,
    ) -> RecommenderResult<Vec<Candidate>>;

    async fn fetch_candidate(&self, candidate_id: &str) -> RecommenderResult<Option<Candidate>>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Investors without stated preferences get `Preferences::default()`.
    async fn fetch_preferences(&self, investor_id: &str) -> RecommenderResult<Preferences>;
}

#[async_trait]
pub trait InteractionLog: Send + Sync {
    async fn seen_candidate_ids(&self, investor_id: &str) -> RecommenderResult<HashSet<String>>;

    async fn record_interaction(&self, record: InteractionRecord) -> RecommenderResult<()>;
}
