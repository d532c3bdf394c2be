//! In-process stores backed by DashMap for lock-free concurrent access.
//! Used for development, tests, and as the default single-node backend.

use crate::traits::{BanditStateRepository, CandidateCatalog, InteractionLog, PreferenceStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use venture_core::types::{Candidate, InteractionRecord, Preferences};
use venture_core::{RecommenderError, RecommenderResult};
use venture_rl_engine::{BanditState, BanditStateRow, VersionedState};

/// Bandit state rows keyed by investor id. Compare-and-swap happens under the
/// DashMap shard lock, so concurrent writers see a linear version history.
#[derive(Default)]
pub struct InMemoryStateRepository {
    rows: DashMap<String, BanditStateRow>,
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw row as-is, bypassing validation.
    pub fn insert_row(&self, row: BanditStateRow) {
        self.rows.insert(row.investor_id.clone(), row);
    }

    pub fn row(&self, investor_id: &str) -> Option<BanditStateRow> {
        self.rows.get(investor_id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl BanditStateRepository for InMemoryStateRepository {
    async fn load(&self, investor_id: &str) -> RecommenderResult<Option<VersionedState>> {
        let Some(row) = self.row(investor_id) else {
            return Ok(None);
        };
        let state = BanditState::from_row(&row)?;
        Ok(Some(VersionedState {
            state,
            version: row.version,
            last_updated: row.last_updated,
        }))
    }

    async fn save(
        &self,
        investor_id: &str,
        state: &BanditState,
        expected_version: Option<u64>,
    ) -> RecommenderResult<u64> {
        let conflict = |found: Option<u64>| RecommenderError::VersionConflict {
            investor_id: investor_id.to_string(),
            expected: expected_version,
            found,
        };

        match self.rows.entry(investor_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get().version;
                if expected_version != Some(current) {
                    return Err(conflict(Some(current)));
                }
                let next = current + 1;
                entry.insert(state.to_row(investor_id, next, Utc::now()));
                Ok(next)
            }
            Entry::Vacant(entry) => {
                if expected_version.is_some() {
                    return Err(conflict(None));
                }
                entry.insert(state.to_row(investor_id, 1, Utc::now()));
                Ok(1)
            }
        }
    }

    async fn overwrite(&self, investor_id: &str, state: &BanditState) -> RecommenderResult<u64> {
        let mut next = 1;
        self.rows
            .entry(investor_id.to_string())
            .and_modify(|row| {
                next = row.version + 1;
                *row = state.to_row(investor_id, next, Utc::now());
            })
            .or_insert_with(|| state.to_row(investor_id, 1, Utc::now()));
        Ok(next)
    }
}

/// Candidate catalog ordered by id so batch truncation is deterministic.
#[derive(Default)]
pub struct InMemoryCatalog {
    candidates: RwLock<BTreeMap<String, Candidate>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, candidate: Candidate) {
        self.candidates.write().insert(candidate.id.clone(), candidate);
    }

    pub fn extend(&self, candidates: impl IntoIterator<Item = Candidate>) {
        let mut guard = self.candidates.write();
        for candidate in candidates {
            guard.insert(candidate.id.clone(), candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.read().is_empty()
    }
}

#[async_trait]
impl CandidateCatalog for InMemoryCatalog {
    async fn fetch_unseen_candidates(
        &self,
        _investor_id: &str,
        exclude: &HashSet<String>,
        limit: usize,
    ) -> RecommenderResult<Vec<Candidate>> {
        Ok(self
            .candidates
            .read()
            .values()
            .filter(|c| !exclude.contains(&c.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_candidate(&self, candidate_id: &str) -> RecommenderResult<Option<Candidate>> {
        Ok(self.candidates.read().get(candidate_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPreferences {
    preferences: DashMap<String, Preferences>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, investor_id: &str, preferences: Preferences) {
        self.preferences.insert(investor_id.to_string(), preferences);
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferences {
    async fn fetch_preferences(&self, investor_id: &str) -> RecommenderResult<Preferences> {
        Ok(self
            .preferences
            .get(investor_id)
            .map(|p| p.clone())
            .unwrap_or_default())
    }
}

/// Append-only interaction log per investor.
#[derive(Default)]
pub struct InMemoryInteractionLog {
    records: DashMap<String, Vec<InteractionRecord>>,
}

impl InMemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, investor_id: &str) -> Vec<InteractionRecord> {
        self.records
            .get(investor_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InteractionLog for InMemoryInteractionLog {
    async fn seen_candidate_ids(&self, investor_id: &str) -> RecommenderResult<HashSet<String>> {
        Ok(self
            .records
            .get(investor_id)
            .map(|records| records.iter().map(|r| r.candidate_id.clone()).collect())
            .unwrap_or_default())
    }

    async fn record_interaction(&self, record: InteractionRecord) -> RecommenderResult<()> {
        self.records
            .entry(record.investor_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venture_core::types::Action;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_state_repository_lifecycle() {
        let repo = InMemoryStateRepository::new();
        assert!(repo.load("inv-1").await.unwrap().is_none());

        let state = BanditState::new(3, 1.0);
        assert_eq!(repo.save("inv-1", &state, None).await.unwrap(), 1);

        let loaded = repo.load("inv-1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.state, state);

        assert_eq!(repo.save("inv-1", &state, Some(1)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_state_repository_rejects_stale_version() {
        let repo = InMemoryStateRepository::new();
        let state = BanditState::new(2, 1.0);
        repo.save("inv-1", &state, None).await.unwrap();
        repo.save("inv-1", &state, Some(1)).await.unwrap();

        let err = repo.save("inv-1", &state, Some(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::VersionConflict {
                found: Some(2),
                ..
            }
        ));

        let err = repo.save("inv-1", &state, None).await.unwrap_err();
        assert_eq!(err.kind(), "version_conflict");
        assert!(repo.save("inv-2", &state, Some(4)).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_row_surfaces_as_state_corrupted() {
        let repo = InMemoryStateRepository::new();
        let mut row = BanditState::new(2, 1.0).to_row("inv-1", 7, Utc::now());
        row.b = vec![0.0];
        repo.insert_row(row);

        let err = repo.load("inv-1").await.unwrap_err();
        assert_eq!(err.kind(), "state_corrupted");

        // overwrite replaces the corrupt row and keeps the version monotonic
        let version = repo.overwrite("inv-1", &BanditState::new(2, 1.0)).await.unwrap();
        assert_eq!(version, 8);
        assert!(repo.load("inv-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_catalog_excludes_and_limits_in_id_order() {
        let catalog = InMemoryCatalog::new();
        catalog.extend(["d", "b", "a", "c"].into_iter().map(candidate));

        let exclude: HashSet<String> = ["b".to_string()].into_iter().collect();
        let fetched = catalog
            .fetch_unseen_candidates("inv-1", &exclude, 2)
            .await
            .unwrap();
        let ids: Vec<_> = fetched.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert!(catalog.fetch_candidate("d").await.unwrap().is_some());
        assert!(catalog.fetch_candidate("z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_preferences_default_when_unset() {
        let prefs = InMemoryPreferences::new();
        assert_eq!(
            prefs.fetch_preferences("inv-1").await.unwrap(),
            Preferences::default()
        );
    }

    #[tokio::test]
    async fn test_interaction_log_builds_seen_set() {
        let log = InMemoryInteractionLog::new();
        for id in ["a", "b", "a"] {
            log.record_interaction(InteractionRecord {
                investor_id: "inv-1".to_string(),
                candidate_id: id.to_string(),
                action: Action::Pass,
                reward: 0.0,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        }
        let seen = log.seen_candidate_ids("inv-1").await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(log.records("inv-1").len(), 3);
        assert!(log.seen_candidate_ids("inv-2").await.unwrap().is_empty());
    }
}
