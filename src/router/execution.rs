// Execution engine - runs each allocated route through its venues
// This file implements sequential route execution against the custody ledger
// with per-route rollback and balance-delta accounting
//
// Numan Thabit 2025 Nov

use crate::errors::VenueError;
use crate::ledger::{Account, Ledger, Settlement};
use crate::metrics::ROUTE_EXECUTIONS;
use crate::router::routes::{Route, RouteStep, SplitPlan};
use crate::venues::adapter::{ExecuteRequest, VenueInfo};
use crate::venues::VenueId;
use alloy_primitives::U256;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Execution statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStats {
    pub total_routes: u64,
    pub filled_routes: u64,
    pub failed_routes: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteResult {
    Filled {
        amount_out: U256,
        input_consumed: U256,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteOutcome {
    pub route_index: usize,
    pub venues: Vec<VenueId>,
    pub amount_in: U256,
    pub gas_estimate: u64,
    pub result: RouteResult,
}

impl RouteOutcome {
    pub fn amount_out(&self) -> U256 {
        match &self.result {
            RouteResult::Filled { amount_out, .. } => *amount_out,
            RouteResult::Failed { .. } => U256::ZERO,
        }
    }

    pub fn input_consumed(&self) -> U256 {
        match &self.result {
            RouteResult::Filled { input_consumed, .. } => *input_consumed,
            RouteResult::Failed { .. } => U256::ZERO,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.result, RouteResult::Filled { .. })
    }
}

/// Runs split plans hop by hop. Funds sit in [`Account::Engine`] between hops.
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    total_routes: AtomicU64,
    filled_routes: AtomicU64,
    failed_routes: AtomicU64,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stats(&self) -> ExecutionStats {
        let total = self.total_routes.load(Ordering::Relaxed);
        let filled = self.filled_routes.load(Ordering::Relaxed);
        ExecutionStats {
            total_routes: total,
            filled_routes: filled,
            failed_routes: self.failed_routes.load(Ordering::Relaxed),
            success_rate: if total > 0 {
                filled as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Execute every route in plan order. A failed route is rolled back on its own
    /// and never aborts the others.
    ///
    /// With `fail_fast_below` set, remaining routes are skipped once the output
    /// delivered so far plus everything still expected cannot reach it.
    #[tracing::instrument(skip_all, fields(routes = plan.routes.len()))]
    pub async fn execute_plan(
        &self,
        ledger: &mut Ledger,
        venues: &[VenueInfo],
        plan: &SplitPlan,
        fail_fast_below: Option<U256>,
    ) -> Vec<RouteOutcome> {
        let mut outcomes = Vec::with_capacity(plan.routes.len());
        let mut delivered = U256::ZERO;
        let mut pending_expected = plan.expected_output;

        for (route_index, route) in plan.routes.iter().enumerate() {
            pending_expected = pending_expected.saturating_sub(route.expected_output);
            let mut outcome = RouteOutcome {
                route_index,
                venues: route.venues(),
                amount_in: route.amount_in(),
                gas_estimate: route.gas_estimate,
                result: RouteResult::Failed {
                    reason: String::new(),
                },
            };

            let reachable = delivered
                .saturating_add(route.expected_output)
                .saturating_add(pending_expected);
            let unreachable = fail_fast_below.is_some_and(|floor| reachable < floor);
            if unreachable {
                outcome.result = RouteResult::Failed {
                    reason: "skipped: minimum output out of reach".to_string(),
                };
                outcomes.push(outcome);
                continue;
            }

            self.total_routes.fetch_add(1, Ordering::Relaxed);
            let label = route.label();
            let snapshot = ledger.snapshot();
            match self.execute_route(ledger, venues, route).await {
                Ok((amount_out, input_consumed)) => {
                    self.filled_routes.fetch_add(1, Ordering::Relaxed);
                    ROUTE_EXECUTIONS
                        .with_label_values(&[label.as_str(), "filled"])
                        .inc();
                    delivered = delivered.saturating_add(amount_out);
                    debug!(route = %label, amount_out = %amount_out, "route filled");
                    outcome.result = RouteResult::Filled {
                        amount_out,
                        input_consumed,
                    };
                }
                Err(err) => {
                    ledger.restore(snapshot);
                    self.failed_routes.fetch_add(1, Ordering::Relaxed);
                    ROUTE_EXECUTIONS
                        .with_label_values(&[label.as_str(), "failed"])
                        .inc();
                    warn!(route = %label, error = %err, "route failed; rolled back");
                    outcome.result = RouteResult::Failed {
                        reason: err.to_string(),
                    };
                }
            }
            outcomes.push(outcome);
        }

        let filled = outcomes.iter().filter(|o| o.is_filled()).count();
        info!(
            filled = filled,
            failed = outcomes.len() - filled,
            delivered = %delivered,
            "split plan executed"
        );
        outcomes
    }

    /// Returns the route's final output and the input its first hop consumed.
    async fn execute_route(
        &self,
        ledger: &mut Ledger,
        venues: &[VenueInfo],
        route: &Route,
    ) -> Result<(U256, U256), VenueError> {
        let mut amount = route.amount_in();
        let mut consumed = U256::ZERO;
        for (hop, step) in route.steps.iter().enumerate() {
            let venue = venues
                .iter()
                .find(|v| v.id == step.venue_id)
                .ok_or_else(|| VenueError::Unavailable(step.venue_id.clone()))?;
            let (out, used) = self.execute_hop(ledger, venue, step, amount).await?;
            if hop == 0 {
                consumed = used;
            }
            amount = out;
        }
        Ok((amount, consumed))
    }

    /// One hop: approve exactly `amount_in`, let the venue settle, and measure what
    /// actually arrived in custody.
    async fn execute_hop(
        &self,
        ledger: &mut Ledger,
        venue: &VenueInfo,
        step: &RouteStep,
        amount_in: U256,
    ) -> Result<(U256, U256), VenueError> {
        let custodian = Account::Engine;
        let spender = Account::Venue(venue.id.clone());

        // reset-then-set approval
        ledger.approve(&custodian, &spender, step.token_in, U256::ZERO);
        ledger.approve(&custodian, &spender, step.token_in, amount_in);

        let in_before = ledger.balance_of(&custodian, step.token_in);
        let out_before = ledger.balance_of(&custodian, step.token_out);
        let req = ExecuteRequest {
            token_in: step.token_in,
            token_out: step.token_out,
            amount_in,
            min_amount_out: step.min_amount_out,
            hint: venue.hint(step.venue_data.clone()),
        };

        let reported = {
            let mut settlement = Settlement::new(
                ledger,
                custodian.clone(),
                venue.id.clone(),
                step.token_in,
                step.token_out,
            );
            venue.adapter.execute(&mut settlement, &req).await
        };
        ledger.approve(&custodian, &spender, step.token_in, U256::ZERO);
        let reported = reported?;

        let delivered = ledger
            .balance_of(&custodian, step.token_out)
            .saturating_sub(out_before);
        let consumed = in_before.saturating_sub(ledger.balance_of(&custodian, step.token_in));
        if delivered != reported {
            warn!(
                venue = %venue.id,
                reported = %reported,
                delivered = %delivered,
                "venue output report differs from custody delta"
            );
        }
        if delivered < step.min_amount_out {
            return Err(VenueError::BelowMinimum {
                delivered,
                minimum: step.min_amount_out,
            });
        }
        Ok((delivered, consumed))
    }
}
