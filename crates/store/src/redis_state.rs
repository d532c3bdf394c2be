//! Redis-backed bandit state repository.
//! Each investor is a hash `{prefix}:{investor_id}` with fields `row` (JSON)
//! and `version`. Writes go through Lua scripts so the version check and the
//! write are atomic on the server.

use crate::traits::BanditStateRepository;
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use tracing::{debug, info, warn};
use venture_core::config::RedisConfig;
use venture_core::{RecommenderError, RecommenderResult};
use venture_rl_engine::{BanditState, BanditStateRow, VersionedState};

const CAS_SCRIPT: &str = r"
local current = redis.call('HGET', KEYS[1], 'version') or '0'
if current ~= ARGV[1] then
  return -1
end
local next = tonumber(current) + 1
redis.call('HSET', KEYS[1], 'version', next, 'row', ARGV[2])
return next
";

const OVERWRITE_SCRIPT: &str = r"
local next = redis.call('HINCRBY', KEYS[1], 'version', 1)
redis.call('HSET', KEYS[1], 'row', ARGV[1])
return next
";

pub struct RedisStateRepository {
    conn: ConnectionManager,
    key_prefix: String,
    cas: Script,
    overwrite: Script,
}

impl RedisStateRepository {
    /// Connect to the first configured Redis node.
    pub async fn new(config: &RedisConfig) -> RecommenderResult<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url.as_str()).map_err(store_error)?;
        let connect = ConnectionManager::new(client);
        let limit = Duration::from_millis(config.connect_timeout_ms);
        let mut conn = tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| RecommenderError::Store(format!("timed out connecting to {url}")))?
            .map_err(store_error)?;

        // Verify connectivity
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        info!(response = %pong, "Redis connection established");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            cas: Script::new(CAS_SCRIPT),
            overwrite: Script::new(OVERWRITE_SCRIPT),
        })
    }

    fn key(&self, investor_id: &str) -> String {
        format!("{}:{investor_id}", self.key_prefix)
    }
}

fn store_error(err: redis::RedisError) -> RecommenderError {
    metrics::counter!("store.redis.error").increment(1);
    RecommenderError::Store(err.to_string())
}

#[async_trait]
impl BanditStateRepository for RedisStateRepository {
    async fn load(&self, investor_id: &str) -> RecommenderResult<Option<VersionedState>> {
        let mut conn = self.conn.clone();
        let (row, version): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(self.key(investor_id))
            .arg("row")
            .arg("version")
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;

        let Some(json) = row else {
            debug!(investor_id = investor_id, "No bandit state stored");
            return Ok(None);
        };

        let row: BanditStateRow = serde_json::from_str(&json).map_err(|e| {
            warn!(investor_id = investor_id, error = %e, "Undecodable bandit state row");
            RecommenderError::corrupted(investor_id, format!("row is not valid JSON: {e}"))
        })?;
        let state = BanditState::from_row(&row)?;

        // The hash field is authoritative; the embedded copy may lag after overwrite.
        Ok(Some(VersionedState {
            state,
            version: version.unwrap_or(row.version),
            last_updated: row.last_updated,
        }))
    }

    async fn save(
        &self,
        investor_id: &str,
        state: &BanditState,
        expected_version: Option<u64>,
    ) -> RecommenderResult<u64> {
        let expected = expected_version.unwrap_or(0);
        let json = serde_json::to_string(&state.to_row(investor_id, expected + 1, Utc::now()))?;

        let mut conn = self.conn.clone();
        let result: i64 = self
            .cas
            .key(self.key(investor_id))
            .arg(expected.to_string())
            .arg(json)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        if result < 0 {
            metrics::counter!("store.redis.version_conflict").increment(1);
            return Err(RecommenderError::VersionConflict {
                investor_id: investor_id.to_string(),
                expected: expected_version,
                found: None,
            });
        }
        Ok(result as u64)
    }

    async fn overwrite(&self, investor_id: &str, state: &BanditState) -> RecommenderResult<u64> {
        let json = serde_json::to_string(&state.to_row(investor_id, 0, Utc::now()))?;

        let mut conn = self.conn.clone();
        let version: i64 = self
            .overwrite
            .key(self.key(investor_id))
            .arg(json)
            .invoke_async(&mut conn)
            .await
            .map_err(store_error)?;

        info!(investor_id = investor_id, version = version, "Bandit state overwritten");
        Ok(version.max(0) as u64)
    }
}
