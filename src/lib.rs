// Library root module for split-aggr
// This file defines the public API and module structure for the split-aggr library
// It exports the main functionality that can be used by other crates
//
// Numan Thabit 2025 Nov

pub mod clock;
pub mod config;
pub mod control;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod oracle;
pub mod router;
pub mod transport;
pub mod venues;
