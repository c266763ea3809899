// Swap event bus
//
// Broadcasts settled swaps and failed routes to subscribers. Events are only
// published after a swap commits, so a rolled-back call never emits anything.
//
// Numan Thabit 2025 Nov

use crate::venues::VenueId;
use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwapEvent {
    Executed {
        request_id: B256,
        caller: Address,
        recipient: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        amount_out: U256,
        fee_amount: U256,
        gas_used: u64,
        routes_used: usize,
        gas_saved: u64,
    },
    RouteFailed {
        request_id: B256,
        route_index: usize,
        venues: Vec<VenueId>,
        reason: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SwapEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SwapEvent) {
        // no subscribers is fine
        if self.tx.send(event).is_err() {
            trace!("swap event dropped without subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
