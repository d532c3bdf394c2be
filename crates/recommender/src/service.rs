//! Recommendation service: ties the ranking engine to its storage
//! collaborators and enforces request timeouts and per-investor write order.

use crate::locks::InvestorLocks;
use crate::selector::CandidateSelector;
use chrono::Utc;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use venture_core::config::{AppConfig, BanditConfig};
use venture_core::types::{
    Action, BaselineResponse, BaselineScore, Candidate, InteractionRecord, ResetResponse,
    ScoreResponse, UpdateResponse,
};
use venture_core::{RecommenderError, RecommenderResult};
use venture_rl_engine::baseline::HEURISTIC_METHOD;
use venture_rl_engine::{
    BanditState, BinaryRewardPolicy, ExplainabilityEngine, FeatureEncoder, FeatureVector,
    HeuristicScorer, ModelExplanation, PreferenceCalibrator, RewardPolicy, ScoringEngine,
    UpdateEngine, VersionedState,
};
use venture_store::{BanditStateRepository, CandidateCatalog, InteractionLog, PreferenceStore};

/// External collaborators the service reads from and writes to.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CandidateCatalog>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub interactions: Arc<dyn InteractionLog>,
    pub states: Arc<dyn BanditStateRepository>,
}

pub struct RecommendationService {
    stores: Stores,
    selector: CandidateSelector,
    updater: UpdateEngine,
    baseline: HeuristicScorer,
    explainer: ExplainabilityEngine,
    reward_policy: Arc<dyn RewardPolicy>,
    locks: InvestorLocks,
    feature_names: Vec<String>,
    config: BanditConfig,
}

impl RecommendationService {
    pub fn new(config: &AppConfig, stores: Stores) -> Self {
        let encoder = FeatureEncoder::new(&config.features);
        let scoring = ScoringEngine::new(config.bandit.alpha);
        let feature_names = encoder.feature_names();

        info!(
            dimension = encoder.dimension(),
            alpha = config.bandit.alpha,
            max_batch_size = config.bandit.max_batch_size,
            "Recommendation service initialized"
        );

        Self {
            stores,
            explainer: ExplainabilityEngine::new(scoring.clone()),
            selector: CandidateSelector::new(
                encoder,
                scoring,
                PreferenceCalibrator::new(&config.calibration),
            ),
            updater: UpdateEngine::new(),
            baseline: HeuristicScorer::new(),
            reward_policy: Arc::new(BinaryRewardPolicy::from_config(&config.reward)),
            locks: InvestorLocks::new(),
            feature_names,
            config: config.bandit.clone(),
        }
    }

    /// Replace the configured action-to-reward mapping.
    pub fn with_reward_policy(mut self, policy: Arc<dyn RewardPolicy>) -> Self {
        self.reward_policy = policy;
        self
    }

    pub fn dimension(&self) -> usize {
        self.selector.encoder().dimension()
    }

    pub fn encode(&self, candidate: &Candidate) -> FeatureVector {
        self.selector.encoder().encode(candidate)
    }

    /// Rank up to `top_n` unseen candidates for an investor.
    pub async fn score(
        &self,
        investor_id: &str,
        top_n: Option<usize>,
    ) -> RecommenderResult<ScoreResponse> {
        let start = Instant::now();
        metrics::counter!("recommender.score.requests").increment(1);

        let result = async {
            validate_id("investor_id", investor_id)?;
            let top_n = self.resolve_top_n(top_n)?;
            self.with_timeout(self.score_inner(investor_id, top_n)).await
        }
        .await;

        observe("score", start, &result);
        result
    }

    async fn score_inner(
        &self,
        investor_id: &str,
        top_n: usize,
    ) -> RecommenderResult<ScoreResponse> {
        let (versioned, seen, preferences) = tokio::try_join!(
            self.load_or_init(investor_id),
            self.stores.interactions.seen_candidate_ids(investor_id),
            self.stores.preferences.fetch_preferences(investor_id),
        )?;

        let candidates = self.fetch_unseen(investor_id, &seen).await?;
        if candidates.is_empty() {
            debug!(investor_id = investor_id, seen = seen.len(), "No unseen candidates");
            return Ok(ScoreResponse::empty());
        }

        let response = self
            .selector
            .rank(&versioned.state, &preferences, &candidates, top_n)?;

        metrics::histogram!("recommender.score.candidates")
            .record(response.total_candidates as f64);
        debug!(
            investor_id = investor_id,
            version = versioned.version,
            total = response.total_candidates,
            returned = response.recommendations.len(),
            "Scored candidates"
        );
        Ok(response)
    }

    /// Fold a realized reward for `candidate_id` into the investor's model.
    pub async fn update(
        &self,
        investor_id: &str,
        candidate_id: &str,
        reward: f64,
    ) -> RecommenderResult<UpdateResponse> {
        let action = self.reward_policy.action_for(reward);
        self.record_outcome(investor_id, candidate_id, reward, action).await
    }

    /// Map an investor action through the reward policy, then update.
    pub async fn feedback(
        &self,
        investor_id: &str,
        candidate_id: &str,
        action: Action,
    ) -> RecommenderResult<UpdateResponse> {
        let reward = self.reward_policy.reward_for(action);
        self.record_outcome(investor_id, candidate_id, reward, action).await
    }

    async fn record_outcome(
        &self,
        investor_id: &str,
        candidate_id: &str,
        reward: f64,
        action: Action,
    ) -> RecommenderResult<UpdateResponse> {
        let start = Instant::now();
        metrics::counter!("recommender.update.requests").increment(1);

        let result = async {
            validate_id("investor_id", investor_id)?;
            validate_id("candidate_id", candidate_id)?;
            if !reward.is_finite() {
                return Err(RecommenderError::InvalidRequest(format!(
                    "reward must be finite, got {reward}"
                )));
            }
            self.with_timeout(self.update_inner(investor_id, candidate_id, reward, action))
                .await
        }
        .await;

        observe("update", start, &result);
        result
    }

    async fn update_inner(
        &self,
        investor_id: &str,
        candidate_id: &str,
        reward: f64,
        action: Action,
    ) -> RecommenderResult<UpdateResponse> {
        let candidate = self
            .stores
            .catalog
            .fetch_candidate(candidate_id)
            .await?
            .ok_or_else(|| RecommenderError::CandidateNotFound(candidate_id.to_string()))?;
        let x = self.encode(&candidate);

        let _guard = self.locks.acquire(investor_id).await;
        let version = self.commit_update(investor_id, &x, reward).await?;

        // The reward is committed; a failed log write still reports success.
        let record = InteractionRecord {
            investor_id: investor_id.to_string(),
            candidate_id: candidate_id.to_string(),
            action,
            reward,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.stores.interactions.record_interaction(record).await {
            metrics::counter!("recommender.update.record_failed").increment(1);
            warn!(
                investor_id = investor_id,
                candidate_id = candidate_id,
                version = version,
                error = %e,
                "Bandit state committed but interaction was not recorded"
            );
        }

        info!(
            investor_id = investor_id,
            candidate_id = candidate_id,
            reward = reward,
            action = %action,
            version = version,
            "Bandit state updated"
        );
        Ok(UpdateResponse { success: true })
    }

    /// Read-modify-write with optimistic versioning. The per-investor lock
    /// orders writers in this process; the version check catches the rest.
    async fn commit_update(
        &self,
        investor_id: &str,
        x: &FeatureVector,
        reward: f64,
    ) -> RecommenderResult<u64> {
        let max_attempts = self.config.max_update_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut state, expected) = match self.load_checked(investor_id).await? {
                Some(existing) => (existing.state, Some(existing.version)),
                None => (self.fresh_state(), None),
            };
            self.updater.apply(&mut state, x, reward)?;

            match self.stores.states.save(investor_id, &state, expected).await {
                Ok(version) => return Ok(version),
                Err(conflict @ RecommenderError::VersionConflict { .. }) => {
                    metrics::counter!("recommender.update.version_conflict").increment(1);
                    if attempt >= max_attempts {
                        warn!(
                            investor_id = investor_id,
                            attempts = attempt,
                            "Giving up on update after repeated version conflicts"
                        );
                        return Err(conflict);
                    }
                    debug!(
                        investor_id = investor_id,
                        attempt = attempt,
                        "Version conflict, retrying update"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Rank unseen candidates with the heuristic baseline instead of LinUCB.
    /// Never reads or writes bandit state.
    pub async fn baseline(
        &self,
        investor_id: &str,
        top_n: Option<usize>,
    ) -> RecommenderResult<BaselineResponse> {
        let start = Instant::now();
        metrics::counter!("recommender.baseline.requests").increment(1);

        let result = async {
            validate_id("investor_id", investor_id)?;
            let top_n = self.resolve_top_n(top_n)?;
            self.with_timeout(async {
                let (seen, preferences) = tokio::try_join!(
                    self.stores.interactions.seen_candidate_ids(investor_id),
                    self.stores.preferences.fetch_preferences(investor_id),
                )?;
                let candidates = self.fetch_unseen(investor_id, &seen).await?;

                let mut scored: Vec<BaselineScore> = candidates
                    .iter()
                    .map(|c| self.baseline.score(c, &preferences))
                    .collect();
                scored.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
                });
                let total_candidates = scored.len();
                scored.truncate(top_n);

                Ok(BaselineResponse {
                    method: HEURISTIC_METHOD.to_string(),
                    recommendations: scored,
                    total_candidates,
                })
            })
            .await
        }
        .await;

        observe("baseline", start, &result);
        result
    }

    /// Current weights and confidence widths. An investor without state is
    /// explained against the ridge prior without persisting it.
    pub async fn explain(&self, investor_id: &str) -> RecommenderResult<ModelExplanation> {
        let start = Instant::now();

        let result = async {
            validate_id("investor_id", investor_id)?;
            self.with_timeout(async {
                let (state, last_updated) = match self.load_checked(investor_id).await? {
                    Some(existing) => (existing.state, Some(existing.last_updated)),
                    None => (self.fresh_state(), None),
                };
                Ok(self
                    .explainer
                    .explain(investor_id, &state, &self.feature_names, last_updated))
            })
            .await
        }
        .await;

        observe("explain", start, &result);
        result
    }

    /// Replace an investor's state with the ridge prior. This discards all
    /// learned history and is the only way to clear `StateCorrupted`.
    pub async fn reset(&self, investor_id: &str, reason: &str) -> RecommenderResult<ResetResponse> {
        let start = Instant::now();

        let result = async {
            validate_id("investor_id", investor_id)?;
            if reason.trim().is_empty() {
                return Err(RecommenderError::InvalidRequest(
                    "a reason is required to reset bandit state".to_string(),
                ));
            }
            self.with_timeout(async {
                let _guard = self.locks.acquire(investor_id).await;
                let version = self
                    .stores
                    .states
                    .overwrite(investor_id, &self.fresh_state())
                    .await?;
                warn!(
                    investor_id = investor_id,
                    reason = reason,
                    version = version,
                    "Bandit state reset to ridge prior"
                );
                metrics::counter!("recommender.state_reset").increment(1);
                Ok(ResetResponse { success: true, version })
            })
            .await
        }
        .await;

        observe("reset", start, &result);
        result
    }

    fn fresh_state(&self) -> BanditState {
        BanditState::new(self.dimension(), self.config.ridge_lambda)
    }

    fn resolve_top_n(&self, top_n: Option<usize>) -> RecommenderResult<usize> {
        match top_n.unwrap_or(self.config.default_top_n) {
            0 => Err(RecommenderError::InvalidRequest("top_n must be at least 1".to_string())),
            n => Ok(n),
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = RecommenderResult<T>>,
    ) -> RecommenderResult<T> {
        let limit = Duration::from_millis(self.config.request_timeout_ms);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(RecommenderError::Timeout(limit)),
        }
    }

    /// Load state and reject rows whose dimension does not match the encoder.
    async fn load_checked(&self, investor_id: &str) -> RecommenderResult<Option<VersionedState>> {
        let Some(existing) = self.stores.states.load(investor_id).await? else {
            return Ok(None);
        };
        if existing.state.dimension() != self.dimension() {
            return Err(RecommenderError::corrupted(
                investor_id,
                format!(
                    "stored dimension {} does not match encoder dimension {}",
                    existing.state.dimension(),
                    self.dimension()
                ),
            ));
        }
        Ok(Some(existing))
    }

    async fn load_or_init(&self, investor_id: &str) -> RecommenderResult<VersionedState> {
        if let Some(existing) = self.load_checked(investor_id).await? {
            return Ok(existing);
        }

        let state = self.fresh_state();
        match self.stores.states.save(investor_id, &state, None).await {
            Ok(version) => {
                metrics::counter!("recommender.state_initialized").increment(1);
                info!(
                    investor_id = investor_id,
                    dimension = state.dimension(),
                    "Initialized bandit state"
                );
                Ok(VersionedState {
                    state,
                    version,
                    last_updated: Utc::now(),
                })
            }
            // another request initialized it first
            Err(RecommenderError::VersionConflict { .. }) => {
                self.load_checked(investor_id).await?.ok_or_else(|| {
                    RecommenderError::Store(format!(
                        "state for {investor_id} missing after initialization"
                    ))
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_unseen(
        &self,
        investor_id: &str,
        seen: &HashSet<String>,
    ) -> RecommenderResult<Vec<Candidate>> {
        let limit = self.config.max_batch_size;
        let mut candidates = self
            .stores
            .catalog
            .fetch_unseen_candidates(investor_id, seen, limit)
            .await?;

        // The exclusion and the batch bound hold even if the catalog ignores them.
        let fetched = candidates.len();
        candidates.retain(|c| !seen.contains(&c.id));
        if candidates.len() != fetched {
            warn!(
                investor_id = investor_id,
                dropped = fetched - candidates.len(),
                "Catalog returned already-seen candidates"
            );
        }
        candidates.truncate(limit);
        Ok(candidates)
    }
}

fn validate_id(field: &str, value: &str) -> RecommenderResult<()> {
    if value.trim().is_empty() {
        return Err(RecommenderError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn observe<T>(operation: &'static str, start: Instant, result: &RecommenderResult<T>) {
    metrics::histogram!("recommender.latency_us", "operation" => operation)
        .record(start.elapsed().as_micros() as f64);
    if let Err(e) = result {
        metrics::counter!("recommender.errors", "operation" => operation, "kind" => e.kind())
            .increment(1);
        match e {
            RecommenderError::InvalidRequest(_) | RecommenderError::CandidateNotFound(_) => {
                debug!(operation = operation, error = %e, "Request rejected");
            }
            _ => warn!(operation = operation, error = %e, "Request failed"),
        }
    }
}
