// Pre-trade validation module
// Validates swap requests before any external call, and checks quoted plans
// against the slippage and price-impact limits
//
// Numan Thabit 2025 Nov

use crate::config::EngineConfig;
use crate::errors::SwapError;
use crate::router::routes::{SwapRequest, BPS_DENOMINATOR};
use alloy_primitives::{Address, U256};

#[derive(Debug, Clone)]
pub struct SafetyValidator {
    min_amount_in: U256,
    max_deadline_window_secs: u64,
    max_slippage_bps: u32,
    max_price_impact_bps: u32,
}

impl SafetyValidator {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            min_amount_in: cfg.min_amount_in,
            max_deadline_window_secs: cfg.max_deadline_window_secs,
            max_slippage_bps: cfg.max_slippage_bps,
            max_price_impact_bps: cfg.max_price_impact_bps,
        }
    }

    /// Token pair and input size checks shared by quote and swap.
    pub fn validate_pair(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<(), SwapError> {
        if token_in.is_zero() || token_out.is_zero() {
            return Err(SwapError::InvalidToken);
        }
        if token_in == token_out {
            return Err(SwapError::IdenticalTokens);
        }
        if amount_in < self.min_amount_in || amount_in.is_zero() {
            return Err(SwapError::InsufficientAmount);
        }
        Ok(())
    }

    /// Full request check. The first failing rule wins.
    pub fn validate(&self, req: &SwapRequest, now: u64) -> Result<(), SwapError> {
        self.validate_pair(req.token_in, req.token_out, req.amount_in)?;
        if req.min_amount_out.is_zero() {
            return Err(SwapError::InsufficientAmount);
        }
        if req.deadline < now || req.deadline > now.saturating_add(self.max_deadline_window_secs) {
            return Err(SwapError::DeadlineExpired {
                deadline: req.deadline,
                now,
            });
        }
        Ok(())
    }

    /// Whether accepting `min_amount_out` against `expected` stays inside the
    /// slippage limit. A zero expectation never passes.
    pub fn slippage_ok(&self, expected: U256, min_amount_out: U256) -> bool {
        if expected.is_zero() {
            return false;
        }
        let gap = expected.saturating_sub(min_amount_out);
        gap.saturating_mul(U256::from(BPS_DENOMINATOR)) / expected
            <= U256::from(self.max_slippage_bps)
    }

    pub fn price_impact_ok(&self, price_impact_bps: u32) -> bool {
        price_impact_bps <= self.max_price_impact_bps
    }
}
