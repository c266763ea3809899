// Route selector - fans quotes out to every enabled venue and builds a split plan
// It discovers direct and connector-token routes, filters them on output and price
// impact, scores them and hands the survivors to the split strategy
//
// Numan Thabit 2025 Nov

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::control::CircuitBreakers;
use crate::errors::SwapError;
use crate::metrics::{QUOTE_FAILURES, QUOTE_LATENCY};
use crate::oracle::PriceOracle;
use crate::router::allocator::{ProportionalSplit, SplitStrategy};
use crate::router::routes::{Route, RouteStep, ScoredRoute, SplitPlan};
use crate::router::scorer::RouteScorer;
use crate::router::validation::SafetyValidator;
use crate::venues::adapter::{VenueInfo, VenueQuote};
use crate::venues::VenueId;
use alloy_primitives::{Address, Bytes, U256};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A venue that produced no usable direct route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueFailure {
    pub venue: VenueId,
    pub kind: &'static str,
    pub reason: String,
}

impl VenueFailure {
    fn new(venue: &VenueId, error: &SwapError) -> Self {
        Self {
            venue: venue.clone(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Outcome of one selection pass.
#[derive(Debug, Clone, Default)]
pub struct RouteSelection {
    pub plan: SplitPlan,
    /// Viable candidates that reached scoring
    pub candidates: usize,
    pub failures: Vec<VenueFailure>,
    /// Gas of all viable candidates minus gas of the allocated routes
    pub gas_saved: u64,
}

pub struct RouteSelector {
    config: EngineConfig,
    validator: SafetyValidator,
    scorer: RouteScorer,
    strategy: Arc<dyn SplitStrategy>,
    oracle: Option<Arc<dyn PriceOracle>>,
    clock: Arc<dyn Clock>,
    breakers: CircuitBreakers,
    quote_timeout: Duration,
}

/// A quote that survived the per-venue checks.
struct Leg {
    venue: VenueId,
    quote: VenueQuote,
}

impl RouteSelector {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            validator: SafetyValidator::from_config(&config),
            scorer: RouteScorer::new(),
            strategy: Arc::new(ProportionalSplit::new(config.min_split_allocation_bps)),
            oracle: None,
            breakers: CircuitBreakers::new(config.breaker.clone()),
            quote_timeout: config.quote_timeout(),
            clock,
            config,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SplitStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn breakers(&self) -> &CircuitBreakers {
        &self.breakers
    }

    /// Quote every venue, keep the viable routes and allocate `amount_in` across them.
    #[tracing::instrument(skip_all, fields(token_in = %token_in, token_out = %token_out, amount_in = %amount_in))]
    pub async fn select(
        &self,
        venues: &[VenueInfo],
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        optimize_for_gas: bool,
    ) -> RouteSelection {
        let mut failures = Vec::new();
        let mut routes = Vec::new();

        let direct = self.quote_all(venues, token_in, token_out, amount_in).await;
        for (venue, result) in venues.iter().zip(direct) {
            match result {
                Ok(quote) => routes.push(self.direct_route(venue, token_in, token_out, amount_in, quote)),
                Err(err) => {
                    debug!(venue = %venue.id, error = %err, "venue produced no direct route");
                    failures.push(VenueFailure::new(&venue.id, &err));
                }
            }
        }

        for connector in self.config.connector_tokens.iter().copied() {
            if connector == token_in || connector == token_out || connector.is_zero() {
                continue;
            }
            if let Some(route) = self
                .two_hop_route(venues, token_in, connector, token_out, amount_in)
                .await
            {
                routes.push(route);
            }
        }

        let routes = self
            .apply_impact_limit(routes, token_in, token_out, amount_in, &mut failures)
            .await;

        let mut scored: Vec<ScoredRoute> = routes
            .into_iter()
            .filter(|r| !r.expected_output.is_zero())
            .enumerate()
            .map(|(discovery_index, route)| ScoredRoute {
                score: self.scorer.score(&route, optimize_for_gas),
                route,
                discovery_index,
            })
            .collect();
        let candidates = scored.len();
        let candidate_gas = scored
            .iter()
            .map(|c| c.route.gas_estimate)
            .fold(0u64, u64::saturating_add);

        if scored.len() > self.config.max_splits {
            // stable: ties keep discovery order
            scored.sort_by(|a, b| b.score.cmp(&a.score));
            scored.truncate(self.config.max_splits);
        }

        let allocated: Vec<Route> = self
            .strategy
            .allocate(scored, amount_in)
            .into_iter()
            .map(|r| r.with_slippage(self.config.max_slippage_bps))
            .collect();
        let plan = SplitPlan::new(allocated);
        let gas_saved = candidate_gas.saturating_sub(plan.gas_estimate);

        info!(
            candidates = candidates,
            routes = plan.routes.len(),
            failures = failures.len(),
            expected_output = %plan.expected_output,
            gas_estimate = plan.gas_estimate,
            gas_saved = gas_saved,
            "selected split plan"
        );

        RouteSelection {
            plan,
            candidates,
            failures,
            gas_saved,
        }
    }

    async fn quote_all(
        &self,
        venues: &[VenueInfo],
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Vec<Result<VenueQuote, SwapError>> {
        join_all(
            venues
                .iter()
                .map(|venue| self.quote_venue(venue, token_in, token_out, amount_in)),
        )
        .await
    }

    /// One venue quote under the breaker and the per-venue timeout.
    async fn quote_venue(
        &self,
        venue: &VenueInfo,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<VenueQuote, SwapError> {
        let label = venue.id.as_str();
        if self.breakers.is_open(&venue.id).await {
            QUOTE_FAILURES.with_label_values(&[label, "breaker_open"]).inc();
            return Err(SwapError::AdapterUnavailable(venue.id.clone()));
        }

        let hint = venue.hint(Bytes::new());
        let timer = QUOTE_LATENCY.with_label_values(&[label]).start_timer();
        let quoted = tokio::time::timeout(
            self.quote_timeout,
            venue.adapter.quote(token_in, token_out, amount_in, &hint),
        )
        .await;
        timer.observe_duration();

        match quoted {
            Err(_) => {
                warn!(venue = %venue.id, timeout_ms = self.quote_timeout.as_millis() as u64, "venue quote timed out");
                QUOTE_FAILURES.with_label_values(&[label, "timeout"]).inc();
                self.breakers.record_failure(&venue.id).await;
                Err(SwapError::AdapterUnavailable(venue.id.clone()))
            }
            Ok(quote) if quote.amount_out.is_zero() => {
                QUOTE_FAILURES.with_label_values(&[label, "zero_output"]).inc();
                self.breakers.record_failure(&venue.id).await;
                Err(SwapError::QuoteFailed {
                    venue: venue.id.clone(),
                    reason: "zero output".to_string(),
                })
            }
            Ok(quote) => {
                self.breakers.record_success(&venue.id).await;
                Ok(quote)
            }
        }
    }

    fn direct_route(
        &self,
        venue: &VenueInfo,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        quote: VenueQuote,
    ) -> Route {
        let step = RouteStep {
            venue_id: venue.id.clone(),
            token_in,
            token_out,
            amount_in,
            venue_data: quote.venue_data,
            expected_amount_out: quote.amount_out,
            min_amount_out: U256::ZERO,
        };
        Route::new(
            vec![step],
            self.gas_or_default(quote.gas_estimate),
            quote.price_impact_bps.unwrap_or(UNKNOWN_IMPACT),
        )
    }

    /// Best first leg into `connector`, then the best second leg out of it.
    async fn two_hop_route(
        &self,
        venues: &[VenueInfo],
        token_in: Address,
        connector: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Option<Route> {
        let first = self.best_leg(venues, token_in, connector, amount_in).await?;
        let mid_amount = first.quote.amount_out;
        let second = self.best_leg(venues, connector, token_out, mid_amount).await?;

        let impact = match (first.quote.price_impact_bps, second.quote.price_impact_bps) {
            (Some(a), Some(b)) => a.saturating_add(b),
            _ => UNKNOWN_IMPACT,
        };
        let gas = self
            .gas_or_default(first.quote.gas_estimate)
            .saturating_add(self.gas_or_default(second.quote.gas_estimate));
        let steps = vec![
            RouteStep {
                venue_id: first.venue,
                token_in,
                token_out: connector,
                amount_in,
                venue_data: first.quote.venue_data,
                expected_amount_out: mid_amount,
                min_amount_out: U256::ZERO,
            },
            RouteStep {
                venue_id: second.venue,
                token_in: connector,
                token_out,
                amount_in: mid_amount,
                venue_data: second.quote.venue_data,
                expected_amount_out: second.quote.amount_out,
                min_amount_out: U256::ZERO,
            },
        ];
        let route = Route::new(steps, gas, impact);
        debug!(route = %route.label(), connector = %connector, expected_output = %route.expected_output, "found connector route");
        Some(route)
    }

    async fn best_leg(
        &self,
        venues: &[VenueInfo],
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Option<Leg> {
        self.quote_all(venues, token_in, token_out, amount_in)
            .await
            .into_iter()
            .zip(venues)
            .filter_map(|(result, venue)| {
                result.ok().map(|quote| Leg {
                    venue: venue.id.clone(),
                    quote,
                })
            })
            // first venue wins ties
            .reduce(|best, leg| {
                if leg.quote.amount_out > best.quote.amount_out {
                    leg
                } else {
                    best
                }
            })
    }

    /// Fill in missing impacts from the oracle and drop routes above the limit.
    async fn apply_impact_limit(
        &self,
        mut routes: Vec<Route>,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        failures: &mut Vec<VenueFailure>,
    ) -> Vec<Route> {
        if routes.iter().any(|r| r.price_impact_bps == UNKNOWN_IMPACT) {
            let spot = self.oracle_price(token_in, token_out).await;
            for route in routes.iter_mut().filter(|r| r.price_impact_bps == UNKNOWN_IMPACT) {
                route.price_impact_bps = spot
                    .as_ref()
                    .map(|p| p.price_impact_bps(amount_in, route.expected_output))
                    .unwrap_or(0);
            }
        }

        routes.retain(|route| {
            if self.validator.price_impact_ok(route.price_impact_bps) {
                return true;
            }
            debug!(route = %route.label(), impact_bps = route.price_impact_bps, "route above price impact limit");
            if let [step] = route.steps.as_slice() {
                QUOTE_FAILURES
                    .with_label_values(&[step.venue_id.as_str(), "price_impact"])
                    .inc();
                let err = SwapError::QuoteFailed {
                    venue: step.venue_id.clone(),
                    reason: format!("price impact {} bps above limit", route.price_impact_bps),
                };
                failures.push(VenueFailure::new(&step.venue_id, &err));
            }
            false
        });
        routes
    }

    async fn oracle_price(
        &self,
        token_in: Address,
        token_out: Address,
    ) -> Option<crate::oracle::OraclePrice> {
        let oracle = self.oracle.as_ref()?;
        let now = self.clock.now_secs();
        match tokio::time::timeout(self.quote_timeout, oracle.price(token_in, token_out)).await {
            Ok(Ok(price))
                if price.is_usable(
                    now,
                    self.config.oracle_max_age_secs,
                    self.config.min_oracle_confidence_bps,
                ) =>
            {
                Some(price)
            }
            Ok(Ok(price)) => {
                debug!(timestamp = price.timestamp, confidence_bps = price.confidence_bps, "oracle price unusable");
                None
            }
            Ok(Err(err)) => {
                warn!(error = %err, "oracle price lookup failed");
                None
            }
            Err(_) => {
                warn!("oracle price lookup timed out");
                None
            }
        }
    }

    fn gas_or_default(&self, gas: u64) -> u64 {
        if gas == 0 {
            self.config.default_gas_estimate
        } else {
            gas
        }
    }
}

/// Marker for routes whose venue reported no impact.
const UNKNOWN_IMPACT: u32 = u32::MAX;
