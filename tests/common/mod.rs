#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use split_aggr::clock::ManualClock;
use split_aggr::config::EngineConfig;
use split_aggr::errors::VenueError;
use split_aggr::ledger::Settlement;
use split_aggr::router::routes::apply_bps;
use split_aggr::router::{Router, SwapRequest};
use split_aggr::venues::{ExecuteRequest, Hint, VenueAdapter, VenueId, VenueInfo, VenueQuote};
use std::sync::Arc;
use std::time::Duration;

pub const NOW: u64 = 1_700_000_000;

pub fn token_in() -> Address {
    Address::repeat_byte(0x01)
}

pub fn token_out() -> Address {
    Address::repeat_byte(0x02)
}

pub fn caller() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn recipient() -> Address {
    Address::repeat_byte(0xbb)
}

pub fn ether(x: u64) -> U256 {
    U256::from(x) * U256::from(1_000_000_000_000_000_000u128)
}

/// Venue paying `rate_bps` of the input, with scripted failures.
pub struct ScriptedVenue {
    pub rate_bps: u32,
    pub gas: u64,
    pub fail_quote: bool,
    pub fail_execute: bool,
    pub delivery_bps: u32,
    pub settle_delay: Option<Duration>,
}

impl ScriptedVenue {
    pub fn new(rate_bps: u32) -> Self {
        Self {
            rate_bps,
            gas: 150_000,
            fail_quote: false,
            fail_execute: false,
            delivery_bps: 10_000,
            settle_delay: None,
        }
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn quote_outage(mut self) -> Self {
        self.fail_quote = true;
        self
    }

    pub fn halted(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn delivering(mut self, delivery_bps: u32) -> Self {
        self.delivery_bps = delivery_bps;
        self
    }

    /// Take the input, then wait `delay` before delivering.
    pub fn settling_after(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    pub fn info(self, id: &str) -> VenueInfo {
        VenueInfo::new(VenueId::new(id), Arc::new(self) as Arc<dyn VenueAdapter>)
    }
}

#[async_trait]
impl VenueAdapter for ScriptedVenue {
    async fn quote(
        &self,
        _token_in: Address,
        _token_out: Address,
        amount_in: U256,
        _hint: &Hint,
    ) -> VenueQuote {
        if self.fail_quote {
            return VenueQuote::unavailable(self.gas);
        }
        VenueQuote {
            amount_out: apply_bps(amount_in, self.rate_bps),
            gas_estimate: self.gas,
            price_impact_bps: Some(10),
            venue_data: Bytes::new(),
        }
    }

    async fn execute(
        &self,
        settlement: &mut Settlement<'_>,
        req: &ExecuteRequest,
    ) -> Result<U256, VenueError> {
        if self.fail_execute {
            return Err(VenueError::Rejected("pool paused".to_string()));
        }
        settlement.pull_input(req.amount_in)?;
        if let Some(delay) = self.settle_delay {
            tokio::time::sleep(delay).await;
        }
        let reported = apply_bps(req.amount_in, self.rate_bps);
        settlement.deliver_output(apply_bps(reported, self.delivery_bps))?;
        Ok(reported)
    }
}

pub async fn router_with(venues: Vec<VenueInfo>) -> (Arc<Router>, Arc<ManualClock>) {
    router_with_config(EngineConfig::default(), venues).await
}

pub async fn router_with_config(
    config: EngineConfig,
    venues: Vec<VenueInfo>,
) -> (Arc<Router>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let router = Router::new(config, clock.clone());
    for venue in venues {
        router.register_venue(venue).await;
    }
    (Arc::new(router), clock)
}

pub fn request(amount_in: U256, min_amount_out: U256) -> SwapRequest {
    SwapRequest {
        token_in: token_in(),
        token_out: token_out(),
        amount_in,
        min_amount_out,
        recipient: recipient(),
        deadline: NOW + 600,
        optimize_for_gas: true,
        nonce: 0,
    }
}
