// Venue adapter module
// This file defines the uniform quote/execute interface every venue implements
// and the registry the router fans out over
//
// Numan Thabit 2025 Nov

use crate::errors::VenueError;
use crate::ledger::Settlement;
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Venue-specific routing hint passed through quote and execute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub fee_tiers: Vec<u32>,
    /// Opaque data a venue returned with its quote
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueQuote {
    pub amount_out: U256,
    pub gas_estimate: u64,
    /// Present when the venue can compute impact from its own reserves
    pub price_impact_bps: Option<u32>,
    #[serde(default)]
    pub venue_data: Bytes,
}

impl VenueQuote {
    /// What a venue reports when it cannot quote.
    pub fn unavailable(default_gas: u64) -> Self {
        Self {
            amount_out: U256::ZERO,
            gas_estimate: default_gas,
            price_impact_bps: None,
            venue_data: Bytes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub hint: Hint,
}

/// Uniform interface over an AMM pool or orderbook.
///
/// `quote` never fails: internal errors degrade to [`VenueQuote::unavailable`].
/// `execute` propagates every error so a route can never silently under-deliver.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        hint: &Hint,
    ) -> VenueQuote;

    /// Pull the approved input through `settlement`, deliver output back into it,
    /// and report the amount delivered.
    async fn execute(
        &self,
        settlement: &mut Settlement<'_>,
        req: &ExecuteRequest,
    ) -> Result<U256, VenueError>;
}

#[derive(Clone)]
pub struct VenueInfo {
    pub id: VenueId,
    pub adapter: Arc<dyn VenueAdapter>,
    pub enabled: bool,
    pub supported_fee_tiers: Vec<u32>,
}

impl VenueInfo {
    pub fn new(id: VenueId, adapter: Arc<dyn VenueAdapter>) -> Self {
        Self {
            id,
            adapter,
            enabled: true,
            supported_fee_tiers: Vec::new(),
        }
    }

    pub fn with_fee_tiers(mut self, fee_tiers: Vec<u32>) -> Self {
        self.supported_fee_tiers = fee_tiers;
        self
    }

    pub fn hint(&self, data: Bytes) -> Hint {
        Hint {
            fee_tiers: self.supported_fee_tiers.clone(),
            data,
        }
    }
}

impl fmt::Debug for VenueInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueInfo")
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .field("supported_fee_tiers", &self.supported_fee_tiers)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueSummary {
    pub id: VenueId,
    pub enabled: bool,
    pub supported_fee_tiers: Vec<u32>,
}

/// Known venues in discovery order.
#[derive(Debug, Default, Clone)]
pub struct VenueRegistry {
    venues: Vec<VenueInfo>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a venue, replacing any venue with the same id in place.
    pub fn register(&mut self, info: VenueInfo) {
        match self.venues.iter_mut().find(|v| v.id == info.id) {
            Some(existing) => *existing = info,
            None => self.venues.push(info),
        }
    }

    pub fn set_enabled(&mut self, id: &VenueId, enabled: bool) -> bool {
        match self.venues.iter_mut().find(|v| &v.id == id) {
            Some(venue) => {
                venue.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn enabled(&self) -> Vec<VenueInfo> {
        self.venues.iter().filter(|v| v.enabled).cloned().collect()
    }

    pub fn summaries(&self) -> Vec<VenueSummary> {
        self.venues
            .iter()
            .map(|v| VenueSummary {
                id: v.id.clone(),
                enabled: v.enabled,
                supported_fee_tiers: v.supported_fee_tiers.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}
