// Replay protection
// Fingerprints swap requests and remembers the ones that settled
//
// Numan Thabit 2025 Nov

use alloy_primitives::{Address, B256, U256};
use blake2::{Blake2b512, Digest};
use std::collections::HashSet;

/// Request fingerprints of settled swaps. Grows without bound; entries are never
/// evicted because a settled fingerprint must stay rejected.
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    seen: HashSet<B256>,
    slot_secs: u64,
}

impl ReplayGuard {
    pub fn new(slot_secs: u64) -> Self {
        Self {
            seen: HashSet::new(),
            slot_secs: slot_secs.max(1),
        }
    }

    pub fn time_slot(&self, now: u64) -> u64 {
        now / self.slot_secs
    }

    /// Blake2b-512 over the request fields, truncated to 32 bytes.
    pub fn fingerprint(
        caller: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        time_slot: u64,
        nonce: u64,
    ) -> B256 {
        let mut hasher = Blake2b512::new();
        hasher.update(caller.as_slice());
        hasher.update(token_in.as_slice());
        hasher.update(token_out.as_slice());
        hasher.update(amount_in.to_be_bytes::<32>());
        hasher.update(time_slot.to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        let hash = hasher.finalize();
        B256::from_slice(&hash[..32])
    }

    pub fn seen(&self, id: &B256) -> bool {
        self.seen.contains(id)
    }

    pub fn record(&mut self, id: B256) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
