// In-process venue double for unit tests
//
// Numan Thabit 2025 Nov

use crate::errors::VenueError;
use crate::ledger::Settlement;
use crate::router::routes::apply_bps;
use crate::venues::adapter::{ExecuteRequest, Hint, VenueAdapter, VenueQuote};
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::time::Duration;

/// Venue paying a fixed `rate_bps` of output per unit of input.
pub struct MockVenue {
    rate_bps: u32,
    gas: u64,
    price_impact_bps: Option<u32>,
    fail_quote: bool,
    fail_execute: bool,
    delivery_bps: u32,
    quote_delay: Option<Duration>,
}

impl MockVenue {
    pub fn new(rate_bps: u32) -> Self {
        Self {
            rate_bps,
            gas: 150_000,
            price_impact_bps: Some(10),
            fail_quote: false,
            fail_execute: false,
            delivery_bps: 10_000,
            quote_delay: None,
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_price_impact(mut self, impact_bps: Option<u32>) -> Self {
        self.price_impact_bps = impact_bps;
        self
    }

    pub fn failing_quotes(mut self) -> Self {
        self.fail_quote = true;
        self
    }

    pub fn failing_execution(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    /// Deliver only `delivery_bps` of what the venue reports.
    pub fn under_delivering(mut self, delivery_bps: u32) -> Self {
        self.delivery_bps = delivery_bps;
        self
    }

    pub fn with_quote_delay(mut self, delay: Duration) -> Self {
        self.quote_delay = Some(delay);
        self
    }
}

#[async_trait]
impl VenueAdapter for MockVenue {
    async fn quote(
        &self,
        _token_in: Address,
        _token_out: Address,
        amount_in: U256,
        _hint: &Hint,
    ) -> VenueQuote {
        if let Some(delay) = self.quote_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_quote {
            return VenueQuote::unavailable(self.gas);
        }
        VenueQuote {
            amount_out: apply_bps(amount_in, self.rate_bps),
            gas_estimate: self.gas,
            price_impact_bps: self.price_impact_bps,
            venue_data: Bytes::from_static(b"mock"),
        }
    }

    async fn execute(
        &self,
        settlement: &mut Settlement<'_>,
        req: &ExecuteRequest,
    ) -> Result<U256, VenueError> {
        if self.fail_execute {
            return Err(VenueError::Rejected("mock venue halted".to_string()));
        }
        settlement.pull_input(req.amount_in)?;
        let reported = apply_bps(req.amount_in, self.rate_bps);
        settlement.deliver_output(apply_bps(reported, self.delivery_bps))?;
        Ok(reported)
    }
}
