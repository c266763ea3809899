// Route types
// This file defines swap requests, route steps, routes and split plans
// shared by selection, allocation and execution
//
// Numan Thabit 2025 Nov

use crate::venues::VenueId;
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Basis points in one whole.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// `amount * bps / 10000`, rounding down.
pub fn apply_bps(amount: U256, bps: u32) -> U256 {
    amount.saturating_mul(U256::from(bps)) / U256::from(BPS_DENOMINATOR)
}

/// One caller request. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub recipient: Address,
    /// Unix seconds
    pub deadline: u64,
    #[serde(default)]
    pub optimize_for_gas: bool,
    /// Distinguishes intentionally repeated requests inside one replay slot
    #[serde(default)]
    pub nonce: u64,
}

/// One hop through one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStep {
    pub venue_id: VenueId,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub venue_data: Bytes,
    pub expected_amount_out: U256,
    pub min_amount_out: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub steps: Vec<RouteStep>,
    pub expected_output: U256,
    pub gas_estimate: u64,
    pub price_impact_bps: u32,
    pub allocation_bps: u32,
}

impl Route {
    pub fn new(steps: Vec<RouteStep>, gas_estimate: u64, price_impact_bps: u32) -> Self {
        let expected_output = steps
            .last()
            .map(|s| s.expected_amount_out)
            .unwrap_or_default();
        Self {
            steps,
            expected_output,
            gas_estimate,
            price_impact_bps,
            allocation_bps: 0,
        }
    }

    pub fn amount_in(&self) -> U256 {
        self.steps.first().map(|s| s.amount_in).unwrap_or_default()
    }

    pub fn venues(&self) -> Vec<VenueId> {
        self.steps.iter().map(|s| s.venue_id.clone()).collect()
    }

    /// Label used in logs and metrics, e.g. `uni>curve`.
    pub fn label(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.venue_id.as_str())
            .collect::<Vec<_>>()
            .join(">")
    }

    /// Scale a full-amount route down to `bps` of `total_amount`.
    pub fn allocate(&self, bps: u32, total_amount: U256) -> Route {
        let mut steps = self.steps.clone();
        let mut next_in = apply_bps(total_amount, bps);
        for step in &mut steps {
            step.amount_in = next_in;
            step.expected_amount_out = apply_bps(step.expected_amount_out, bps);
            next_in = step.expected_amount_out;
        }
        Route {
            expected_output: apply_bps(self.expected_output, bps),
            steps,
            gas_estimate: self.gas_estimate,
            price_impact_bps: self.price_impact_bps,
            allocation_bps: bps,
        }
    }

    /// Set each hop's minimum output to its expected output less `max_slippage_bps`.
    pub fn with_slippage(mut self, max_slippage_bps: u32) -> Route {
        let keep = BPS_DENOMINATOR.saturating_sub(max_slippage_bps);
        for step in &mut self.steps {
            step.min_amount_out = apply_bps(step.expected_amount_out, keep);
        }
        self
    }
}

/// A candidate route with its score and the order it was discovered in.
#[derive(Debug, Clone)]
pub struct ScoredRoute {
    pub route: Route,
    pub score: u128,
    pub discovery_index: usize,
}

/// Routes and allocations covering one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitPlan {
    pub routes: Vec<Route>,
    /// Sum of the allocated routes' expected outputs, before platform fee
    pub expected_output: U256,
    pub gas_estimate: u64,
}

impl SplitPlan {
    pub fn new(routes: Vec<Route>) -> Self {
        let expected_output = routes
            .iter()
            .fold(U256::ZERO, |acc, r| acc.saturating_add(r.expected_output));
        let gas_estimate = routes
            .iter()
            .map(|r| r.gas_estimate)
            .fold(0u64, u64::saturating_add);
        Self {
            routes,
            expected_output,
            gas_estimate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn total_allocation_bps(&self) -> u32 {
        self.routes.iter().map(|r| r.allocation_bps).sum()
    }
}
