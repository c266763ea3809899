// Configuration management module
// This file handles loading and parsing of configuration settings
// from an optional config file layered under environment variables
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, U256};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

use crate::router::routes::BPS_DENOMINATOR;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP API bind address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Concurrency control for the HTTP API
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// Requests admitted per second (sliding 1s window)
    pub rate_per_sec: Option<u32>,
    /// Remote venue adapters, queried in the listed order
    #[serde(default)]
    pub venues: Vec<VenueEndpoint>,
    /// Price oracle used as fallback price-impact estimator (optional)
    pub oracle_endpoint: Option<Url>,
    /// Routing engine parameters
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let file = std::env::var("APP_CONFIG_FILE").unwrap_or_else(|_| "split-aggr".to_string());
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .with_context(|| format!("read configuration (file {file})"))?;
        let app: Self = cfg.try_deserialize()?;
        app.engine.validate()?;
        Ok(app)
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_inflight() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueEndpoint {
    /// Venue identifier used in routes, metrics and receipts
    pub id: String,
    /// Base URL of the venue's quote/execute service
    pub endpoint: Url,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Fee tiers the venue supports, forwarded as quote hints
    #[serde(default)]
    pub fee_tiers: Vec<u32>,
}

fn default_enabled() -> bool {
    true
}

/// Parameters consumed read-only by the routing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_splits: usize,
    pub max_slippage_bps: u32,
    pub min_split_allocation_bps: u32,
    pub max_price_impact_bps: u32,
    pub max_deadline_window_secs: u64,
    pub platform_fee_bps: u32,
    /// Dust threshold for `amount_in`
    pub min_amount_in: U256,
    /// Gas reported for venues that cannot quote
    pub default_gas_estimate: u64,
    pub quote_timeout_ms: u64,
    /// Width of the replay fingerprint time slot
    pub replay_slot_secs: u64,
    /// Intermediate tokens tried for two-hop routes
    pub connector_tokens: Vec<Address>,
    pub oracle_max_age_secs: u64,
    pub min_oracle_confidence_bps: u32,
    /// Stop attempting routes once the minimum output is out of reach
    pub fail_fast_on_shortfall: bool,
    pub breaker: BreakerPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_splits: 7,
            max_slippage_bps: 500,
            min_split_allocation_bps: 500,
            max_price_impact_bps: 500,
            max_deadline_window_secs: 1800,
            platform_fee_bps: 30,
            min_amount_in: U256::from(1_000u64),
            default_gas_estimate: 150_000,
            quote_timeout_ms: 2_000,
            replay_slot_secs: 12,
            connector_tokens: Vec::new(),
            oracle_max_age_secs: 300,
            min_oracle_confidence_bps: 9_000,
            fail_fast_on_shortfall: false,
            breaker: BreakerPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, bps) in [
            ("max_slippage_bps", self.max_slippage_bps),
            ("min_split_allocation_bps", self.min_split_allocation_bps),
            ("max_price_impact_bps", self.max_price_impact_bps),
            ("platform_fee_bps", self.platform_fee_bps),
            ("min_oracle_confidence_bps", self.min_oracle_confidence_bps),
        ] {
            ensure!(bps <= BPS_DENOMINATOR, "{name} must be <= {BPS_DENOMINATOR}, got {bps}");
        }
        ensure!(self.max_splits > 0, "max_splits must be positive");
        ensure!(
            self.max_splits as u64 * u64::from(self.min_split_allocation_bps)
                <= u64::from(BPS_DENOMINATOR),
            "max_splits x min_split_allocation_bps exceeds {BPS_DENOMINATOR}"
        );
        ensure!(self.replay_slot_secs > 0, "replay_slot_secs must be positive");
        ensure!(self.quote_timeout_ms > 0, "quote_timeout_ms must be positive");
        Ok(())
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }
}

/// Per-venue circuit breaker policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerPolicy {
    pub max_window: usize,
    pub min_samples: usize,
    pub failure_threshold: f32,
    pub cooldown_secs: u64,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            max_window: 100,
            min_samples: 20,
            failure_threshold: 0.5,
            cooldown_secs: 5,
        }
    }
}
