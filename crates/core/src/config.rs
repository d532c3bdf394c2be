use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `VENTURE_RANK__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub bandit: BanditConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub reward: RewardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// LinUCB scoring and update parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BanditConfig {
    /// Exploration coefficient applied to the confidence width.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Ridge prior: a fresh investor starts with `A = lambda * I`.
    #[serde(default = "default_ridge_lambda")]
    pub ridge_lambda: f64,
    /// Upper bound on unseen candidates fetched per scoring request.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Read-modify-write attempts before an update gives up on version conflicts.
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
}

/// Feature taxonomy and normalization caps. Caps are constants rather than
/// data-derived so encoding stays stateless.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_industries")]
    pub industries: Vec<String>,
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,
    #[serde(default = "default_revenue_cap")]
    pub revenue_cap: f64,
    #[serde(default = "default_burn_cap")]
    pub burn_cap: f64,
    #[serde(default = "default_experience_cap")]
    pub experience_cap: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_industry_penalty")]
    pub industry_penalty: f64,
    #[serde(default = "default_stage_penalty")]
    pub stage_penalty: f64,
    #[serde(default = "default_valuation_penalty")]
    pub valuation_penalty: f64,
}

/// Rewards assigned to feedback actions.
#[derive(Debug, Clone, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_invest_reward")]
    pub invest: f64,
    #[serde(default = "default_pass_reward")]
    pub pass: f64,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_key_prefix() -> String {
    "bandit_state".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_alpha() -> f64 {
    1.0
}
fn default_ridge_lambda() -> f64 {
    1.0
}
fn default_max_batch_size() -> usize {
    50
}
fn default_top_n() -> usize {
    10
}
fn default_request_timeout_ms() -> u64 {
    2000
}
fn default_max_update_retries() -> u32 {
    5
}
fn default_industries() -> Vec<String> {
    [
        "HealthTech",
        "FinTech",
        "EdTech",
        "AI/ML",
        "SaaS",
        "Gaming",
        "CleanTech",
        "E-commerce",
        "Biotech",
        "Cybersecurity",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_stages() -> Vec<String> {
    ["Pre-Seed", "Seed", "Series A", "Series B", "Series C+"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_revenue_cap() -> f64 {
    200_000.0
}
fn default_burn_cap() -> f64 {
    100_000.0
}
fn default_experience_cap() -> f64 {
    10.0
}
fn default_industry_penalty() -> f64 {
    0.7
}
fn default_stage_penalty() -> f64 {
    0.8
}
fn default_valuation_penalty() -> f64 {
    0.6
}
fn default_invest_reward() -> f64 {
    1.0
}
fn default_pass_reward() -> f64 {
    0.0
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            key_prefix: default_key_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            ridge_lambda: default_ridge_lambda(),
            max_batch_size: default_max_batch_size(),
            default_top_n: default_top_n(),
            request_timeout_ms: default_request_timeout_ms(),
            max_update_retries: default_max_update_retries(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            industries: default_industries(),
            stages: default_stages(),
            revenue_cap: default_revenue_cap(),
            burn_cap: default_burn_cap(),
            experience_cap: default_experience_cap(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            industry_penalty: default_industry_penalty(),
            stage_penalty: default_stage_penalty(),
            valuation_penalty: default_valuation_penalty(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            invest: default_invest_reward(),
            pass: default_pass_reward(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            storage: StorageConfig::default(),
            redis: RedisConfig::default(),
            bandit: BanditConfig::default(),
            features: FeatureConfig::default(),
            calibration: CalibrationConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl FeatureConfig {
    /// Feature dimension: one slot per industry, one per stage, three numeric metrics.
    pub fn dimension(&self) -> usize {
        self.industries.len() + self.stages.len() + 3
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("VENTURE_RANK")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("features.industries")
                .with_list_parse_key("features.stages")
                .with_list_parse_key("redis.urls"),
        );

        let config = builder.build()?;
        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject values that would break the bandit invariants.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(self.bandit.ridge_lambda > 0.0) {
            return Err(config::ConfigError::Message(
                "bandit.ridge_lambda must be positive".to_string(),
            ));
        }
        if !(self.bandit.alpha >= 0.0) {
            return Err(config::ConfigError::Message(
                "bandit.alpha must be non-negative".to_string(),
            ));
        }
        if self.bandit.max_batch_size == 0 {
            return Err(config::ConfigError::Message(
                "bandit.max_batch_size must be at least 1".to_string(),
            ));
        }
        let caps = [
            self.features.revenue_cap,
            self.features.burn_cap,
            self.features.experience_cap,
        ];
        if caps.iter().any(|c| !(*c > 0.0)) {
            return Err(config::ConfigError::Message(
                "feature normalization caps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
