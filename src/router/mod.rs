// Router module - main routing and execution plane
// This file wires together validation, scoring, split allocation, execution
// and replay protection behind the router orchestrator
//
// Numan Thabit 2025 Nov

pub mod allocator;
pub mod execution;
pub mod replay;
pub mod routes;
pub mod scorer;
pub mod selector;
pub mod validation;

#[allow(clippy::module_inception)]
pub mod router;

pub use allocator::{ProportionalSplit, SplitStrategy};
pub use execution::{ExecutionEngine, ExecutionStats, RouteOutcome, RouteResult};
pub use replay::ReplayGuard;
pub use router::{QuoteResponse, Router, RouterStats, SwapCounters, SwapReceipt};
pub use routes::{Route, RouteStep, SplitPlan, SwapRequest};
pub use scorer::RouteScorer;
pub use selector::{RouteSelection, RouteSelector, VenueFailure};
pub use validation::SafetyValidator;
