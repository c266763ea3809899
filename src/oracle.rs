// Price oracle
// Fallback price-impact estimation for venues that do not expose reserves
//
// Numan Thabit 2025 Nov

use crate::errors::TransportError;
use crate::router::routes::BPS_DENOMINATOR;
use crate::transport::JsonHttp;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Fixed-point scale of [`OraclePrice::price`].
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OraclePrice {
    /// Units of token B per unit of token A, scaled by 1e18
    pub price: U256,
    /// Unix seconds the price was observed at
    pub timestamp: u64,
    pub confidence_bps: u32,
}

impl OraclePrice {
    pub fn is_usable(&self, now: u64, max_age_secs: u64, min_confidence_bps: u32) -> bool {
        !self.price.is_zero()
            && now.saturating_sub(self.timestamp) <= max_age_secs
            && self.confidence_bps >= min_confidence_bps
    }

    /// Impact of receiving `amount_out` for `amount_in` relative to the spot price.
    /// Zero when the quote is at or better than spot.
    pub fn price_impact_bps(&self, amount_in: U256, amount_out: U256) -> u32 {
        let spot_out = amount_in.saturating_mul(self.price) / U256::from(PRICE_SCALE);
        if spot_out.is_zero() || amount_out >= spot_out {
            return 0;
        }
        let shortfall = (spot_out - amount_out).saturating_mul(U256::from(BPS_DENOMINATOR)) / spot_out;
        u32::try_from(shortfall).unwrap_or(BPS_DENOMINATOR)
    }
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price(&self, token_a: Address, token_b: Address) -> Result<OraclePrice, TransportError>;
}

pub struct HttpPriceOracle {
    client: JsonHttp,
}

impl HttpPriceOracle {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: JsonHttp::new(endpoint, "oracle", timeout)?,
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn price(&self, token_a: Address, token_b: Address) -> Result<OraclePrice, TransportError> {
        self.client
            .get(
                "price",
                &[("base", token_a.to_string()), ("quote", token_b.to_string())],
            )
            .await
    }
}
