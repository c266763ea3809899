// Router orchestrator and HTTP API implementation
// This file ties validation, route selection, execution and settlement together
// behind a single-writer engine state, and exposes it over HTTP
//
// Numan Thabit 2025 Nov

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::control::AdmissionControl;
use crate::errors::{ErrorClass, SwapError};
use crate::events::{EventBus, SwapEvent};
use crate::ledger::{Account, Ledger};
use crate::metrics::{self, SWAPS};
use crate::oracle::PriceOracle;
use crate::router::allocator::SplitStrategy;
use crate::router::execution::{ExecutionEngine, ExecutionStats, RouteOutcome, RouteResult};
use crate::router::replay::ReplayGuard;
use crate::router::routes::{apply_bps, Route, SwapRequest};
use crate::router::selector::{RouteSelection, RouteSelector, VenueFailure};
use crate::router::validation::SafetyValidator;
use crate::venues::adapter::{VenueInfo, VenueRegistry, VenueSummary};
use crate::venues::VenueId;
use alloy_primitives::{Address, B256, U256};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};

/// Aggregate counters kept across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwapCounters {
    pub swap_count: u64,
    /// Sum of settled `amount_in`, across tokens
    pub cumulative_volume: U256,
    pub cumulative_gas_saved: u64,
}

/// Everything a swap mutates. Held under one lock so calls are linearised.
#[derive(Debug)]
struct EngineState {
    ledger: Ledger,
    replay: ReplayGuard,
    counters: SwapCounters,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteResponse {
    /// Expected output net of the platform fee
    pub amount_out: U256,
    pub gas_estimate: u64,
    pub routes: Vec<Route>,
    pub failures: Vec<VenueFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapReceipt {
    pub request_id: B256,
    /// Net output delivered to the recipient
    pub amount_out: U256,
    pub fee_amount: U256,
    pub refunded_amount_in: U256,
    /// Gas estimate of the routes that filled
    pub gas_used: u64,
    pub gas_saved: u64,
    pub routes: Vec<RouteOutcome>,
    pub failures: Vec<VenueFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterStats {
    pub swaps: SwapCounters,
    pub quotes_served: u64,
    pub replay_entries: usize,
    pub execution: ExecutionStats,
    pub venues: usize,
    pub open_breakers: Vec<VenueId>,
}

struct Settled {
    receipt: SwapReceipt,
    amount_in: U256,
}

/// High-level Router that ties selection and execution together
pub struct Router {
    config: EngineConfig,
    venues: RwLock<VenueRegistry>,
    selector: RouteSelector,
    executor: ExecutionEngine,
    validator: SafetyValidator,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
    events: EventBus,
    quotes_served: AtomicU64,
    admission: Option<AdmissionControl>,
}

impl Router {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            venues: RwLock::new(VenueRegistry::new()),
            selector: RouteSelector::new(config.clone(), clock.clone()),
            executor: ExecutionEngine::new(),
            validator: SafetyValidator::from_config(&config),
            state: Mutex::new(EngineState {
                ledger: Ledger::new(),
                replay: ReplayGuard::new(config.replay_slot_secs),
                counters: SwapCounters::default(),
            }),
            events: EventBus::default(),
            quotes_served: AtomicU64::new(0),
            admission: None,
            clock,
            config,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.selector = self.selector.with_oracle(oracle);
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SplitStrategy>) -> Self {
        self.selector = self.selector.with_strategy(strategy);
        self
    }

    pub fn with_admission(mut self, admission: AdmissionControl) -> Self {
        self.admission = Some(admission);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.events.subscribe()
    }

    pub async fn register_venue(&self, venue: VenueInfo) {
        info!(venue = %venue.id, enabled = venue.enabled, "venue registered");
        self.venues.write().await.register(venue);
    }

    /// Returns false for unknown venues.
    pub async fn set_venue_enabled(&self, id: &VenueId, enabled: bool) -> bool {
        let updated = self.venues.write().await.set_enabled(id, enabled);
        if updated {
            info!(venue = %id, enabled = enabled, "venue toggled");
        }
        updated
    }

    pub async fn venues(&self) -> Vec<VenueSummary> {
        self.venues.read().await.summaries()
    }

    /// Credit a user's custody balance.
    pub async fn deposit(&self, account: Address, token: Address, amount: U256) {
        let mut state = self.state.lock().await;
        state.ledger.credit(&Account::User(account), token, amount);
    }

    pub async fn balance_of(&self, account: &Account, token: Address) -> U256 {
        self.state.lock().await.ledger.balance_of(account, token)
    }

    pub async fn stats(&self) -> RouterStats {
        let (swaps, replay_entries) = {
            let state = self.state.lock().await;
            (state.counters.clone(), state.replay.len())
        };
        RouterStats {
            swaps,
            quotes_served: self.quotes_served.load(Ordering::Relaxed),
            replay_entries,
            execution: self.executor.get_stats(),
            venues: self.venues.read().await.len(),
            open_breakers: self.selector.breakers().open_venues().await,
        }
    }

    /// Read path: expected output of the best split, without touching custody.
    #[tracing::instrument(skip_all, fields(token_in = %token_in, token_out = %token_out, amount_in = %amount_in))]
    pub async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        optimize_for_gas: bool,
    ) -> Result<QuoteResponse, SwapError> {
        self.validator.validate_pair(token_in, token_out, amount_in)?;
        let venues = self.venues.read().await.enabled();
        let selection = self
            .selector
            .select(&venues, token_in, token_out, amount_in, optimize_for_gas)
            .await;
        self.quotes_served.fetch_add(1, Ordering::Relaxed);

        let gross = selection.plan.expected_output;
        Ok(QuoteResponse {
            amount_out: gross.saturating_sub(self.fee_on(gross)),
            gas_estimate: selection.plan.gas_estimate,
            routes: selection.plan.routes,
            failures: selection.failures,
        })
    }

    /// Write path: either settles at or above `min_amount_out` or changes nothing.
    ///
    /// The swap runs on its own task. Dropping the returned future discards the
    /// receipt but never interrupts a swap that already holds custody.
    pub async fn execute(
        self: &Arc<Self>,
        caller: Address,
        req: SwapRequest,
    ) -> Result<SwapReceipt, SwapError> {
        let router = Arc::clone(self);
        let swap = tokio::spawn(
            async move { router.run_swap(caller, req).await }.in_current_span(),
        );
        match swap.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(SwapError::Interrupted(err.to_string())),
        }
    }

    #[tracing::instrument(skip_all, fields(caller = %caller, token_in = %req.token_in, token_out = %req.token_out, amount_in = %req.amount_in))]
    async fn run_swap(&self, caller: Address, req: SwapRequest) -> Result<SwapReceipt, SwapError> {
        let venues = self.venues.read().await.enabled();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let now = self.clock.now_secs();

        let request_id = ReplayGuard::fingerprint(
            caller,
            req.token_in,
            req.token_out,
            req.amount_in,
            state.replay.time_slot(now),
            req.nonce,
        );
        let result = if state.replay.seen(&request_id) {
            Err(SwapError::DuplicateRequest(request_id))
        } else {
            let snapshot = state.ledger.snapshot();
            let settled = self
                .settle(&mut state.ledger, &venues, caller, &req, request_id, now)
                .await;
            if settled.is_err() {
                state.ledger.restore(snapshot);
            }
            settled
        };

        match result {
            Ok(Settled { receipt, amount_in }) => {
                state.replay.record(request_id);
                let counters = &mut state.counters;
                counters.swap_count += 1;
                counters.cumulative_volume = counters.cumulative_volume.saturating_add(amount_in);
                counters.cumulative_gas_saved =
                    counters.cumulative_gas_saved.saturating_add(receipt.gas_saved);
                drop(guard);

                self.publish(caller, &req, &receipt);
                SWAPS.with_label_values(&["settled"]).inc();
                info!(
                    request_id = %request_id,
                    amount_out = %receipt.amount_out,
                    fee = %receipt.fee_amount,
                    refunded = %receipt.refunded_amount_in,
                    routes = receipt.routes.len(),
                    "swap settled"
                );
                Ok(receipt)
            }
            Err(err) => {
                drop(guard);
                SWAPS.with_label_values(&[err.kind()]).inc();
                warn!(request_id = %request_id, error = %err, class = ?err.class(), "swap rejected");
                Err(err)
            }
        }
    }

    /// Everything between TransferIn and Settle. The caller restores the ledger on error.
    async fn settle(
        &self,
        ledger: &mut Ledger,
        venues: &[VenueInfo],
        caller: Address,
        req: &SwapRequest,
        request_id: B256,
        now: u64,
    ) -> Result<Settled, SwapError> {
        self.validator.validate(req, now)?;

        let payer = Account::User(caller);
        ledger.transfer(&payer, &Account::Engine, req.token_in, req.amount_in)?;

        let RouteSelection {
            plan,
            failures,
            gas_saved,
            ..
        } = self
            .selector
            .select(venues, req.token_in, req.token_out, req.amount_in, req.optimize_for_gas)
            .await;
        if plan.is_empty() {
            return Err(SwapError::NoViableRoutes);
        }

        let expected = plan
            .expected_output
            .saturating_sub(self.fee_on(plan.expected_output));
        if !self.validator.slippage_ok(expected, req.min_amount_out) {
            return Err(SwapError::SlippageExceeded {
                expected,
                min_amount_out: req.min_amount_out,
            });
        }

        let fail_fast = self
            .config
            .fail_fast_on_shortfall
            .then_some(req.min_amount_out);
        let routes = self
            .executor
            .execute_plan(ledger, venues, &plan, fail_fast)
            .await;

        let gross = routes
            .iter()
            .fold(U256::ZERO, |acc, r| acc.saturating_add(r.amount_out()));
        let fee_amount = self.fee_on(gross);
        let amount_out = gross.saturating_sub(fee_amount);
        if amount_out < req.min_amount_out {
            return Err(SwapError::InsufficientOutput {
                amount_out,
                min_amount_out: req.min_amount_out,
            });
        }

        let consumed = routes
            .iter()
            .fold(U256::ZERO, |acc, r| acc.saturating_add(r.input_consumed()));
        let refunded_amount_in = req.amount_in.saturating_sub(consumed);

        ledger.transfer(&Account::Engine, &Account::Treasury, req.token_out, fee_amount)?;
        ledger.transfer(
            &Account::Engine,
            &Account::User(req.recipient),
            req.token_out,
            amount_out,
        )?;
        ledger.transfer(&Account::Engine, &payer, req.token_in, refunded_amount_in)?;

        let gas_used = routes
            .iter()
            .filter(|r| r.is_filled())
            .map(|r| r.gas_estimate)
            .fold(0u64, u64::saturating_add);
        Ok(Settled {
            receipt: SwapReceipt {
                request_id,
                amount_out,
                fee_amount,
                refunded_amount_in,
                gas_used,
                gas_saved,
                routes,
                failures,
            },
            amount_in: req.amount_in,
        })
    }

    fn publish(&self, caller: Address, req: &SwapRequest, receipt: &SwapReceipt) {
        self.events.publish(SwapEvent::Executed {
            request_id: receipt.request_id,
            caller,
            recipient: req.recipient,
            token_in: req.token_in,
            token_out: req.token_out,
            amount_in: req.amount_in,
            amount_out: receipt.amount_out,
            fee_amount: receipt.fee_amount,
            gas_used: receipt.gas_used,
            routes_used: receipt.routes.iter().filter(|r| r.is_filled()).count(),
            gas_saved: receipt.gas_saved,
        });
        for route in &receipt.routes {
            if let RouteResult::Failed { reason } = &route.result {
                self.events.publish(SwapEvent::RouteFailed {
                    request_id: receipt.request_id,
                    route_index: route.route_index,
                    venues: route.venues.clone(),
                    reason: reason.clone(),
                });
            }
        }
    }

    fn fee_on(&self, gross: U256) -> U256 {
        apply_bps(gross, self.config.platform_fee_bps)
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    #[serde(default)]
    pub optimize_for_gas: bool,
}

#[derive(Debug, Deserialize)]
pub struct SwapApiRequest {
    pub caller: Address,
    pub request: SwapRequest,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account: Address,
    pub token: Address,
    pub amount: U256,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// A user address, `engine` or `treasury`
    pub account: String,
    pub token: Address,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account: Account,
    pub token: Address,
    pub balance: U256,
}

#[derive(Debug, Deserialize)]
pub struct EnableRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub class: Option<ErrorClass>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn swap_error(err: SwapError) -> ApiError {
    let status = match (&err, err.class()) {
        (SwapError::DuplicateRequest(_), _) => StatusCode::CONFLICT,
        (_, ErrorClass::Input) => StatusCode::BAD_REQUEST,
        (_, ErrorClass::Venue) => StatusCode::BAD_GATEWAY,
        (_, ErrorClass::Global) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
            class: Some(err.class()),
        }),
    )
}

fn api_error(status: StatusCode, kind: &'static str, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            kind,
            class: None,
        }),
    )
}

/// Create the HTTP router with API endpoints
pub fn create_api_router(router: Arc<Router>) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/api/v1/quote", post(quote_route))
        .route("/api/v1/swap", post(execute_swap))
        .route("/api/v1/deposit", post(deposit))
        .route("/api/v1/balance", get(balance))
        .route("/api/v1/venues", get(list_venues))
        .route("/api/v1/venues/:id/enabled", post(set_venue_enabled))
        .route("/api/v1/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(router)
}

/// Health check endpoint
async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn render_metrics() -> Response {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
        .into_response()
}

async fn admit(router: &Router) -> Result<Option<crate::control::AdmissionPermit>, ApiError> {
    match &router.admission {
        Some(admission) => admission.acquire().await.map(Some).map_err(|err| {
            api_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded", err.to_string())
        }),
        None => Ok(None),
    }
}

/// Quote route endpoint - returns the split plan without executing
async fn quote_route(
    State(router): State<Arc<Router>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let _permit = admit(&router).await?;
    router
        .quote(req.token_in, req.token_out, req.amount_in, req.optimize_for_gas)
        .await
        .map(Json)
        .map_err(swap_error)
}

/// Swap endpoint - routes, executes and settles
async fn execute_swap(
    State(router): State<Arc<Router>>,
    Json(req): Json<SwapApiRequest>,
) -> Result<Json<SwapReceipt>, ApiError> {
    let _permit = admit(&router).await?;
    router
        .execute(req.caller, req.request)
        .await
        .map(Json)
        .map_err(swap_error)
}

async fn deposit(
    State(router): State<Arc<Router>>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    router.deposit(req.account, req.token, req.amount).await;
    let account = Account::User(req.account);
    let balance = router.balance_of(&account, req.token).await;
    Ok(Json(BalanceResponse {
        account,
        token: req.token,
        balance,
    }))
}

async fn balance(
    State(router): State<Arc<Router>>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = match query.account.as_str() {
        "engine" => Account::Engine,
        "treasury" => Account::Treasury,
        other => other.parse::<Address>().map(Account::User).map_err(|err| {
            api_error(StatusCode::BAD_REQUEST, "invalid_account", err.to_string())
        })?,
    };
    let balance = router.balance_of(&account, query.token).await;
    Ok(Json(BalanceResponse {
        account,
        token: query.token,
        balance,
    }))
}

async fn list_venues(State(router): State<Arc<Router>>) -> Json<Vec<VenueSummary>> {
    Json(router.venues().await)
}

async fn set_venue_enabled(
    State(router): State<Arc<Router>>,
    Path(id): Path<String>,
    Json(req): Json<EnableRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = VenueId::new(id);
    if !router.set_venue_enabled(&id, req.enabled).await {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "unknown_venue",
            format!("venue {id} not registered"),
        ));
    }
    Ok(Json(serde_json::json!({
        "id": id,
        "enabled": req.enabled,
    })))
}

/// Get swap counters and execution statistics
async fn get_stats(State(router): State<Arc<Router>>) -> Json<RouterStats> {
    Json(router.stats().await)
}
