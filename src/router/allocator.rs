// Split allocation
// Turns scored candidate routes into a split plan. The strategy sits behind a trait
// so an exact solver can replace the greedy proportional split.
//
// Numan Thabit 2025 Nov

use crate::router::routes::{Route, ScoredRoute, BPS_DENOMINATOR};
use alloy_primitives::U256;
use tracing::debug;

pub trait SplitStrategy: Send + Sync {
    /// Allocate `total_amount` across `candidates`. Returned routes carry their
    /// `allocation_bps`, sum to at most 10000 and keep discovery order.
    fn allocate(&self, candidates: Vec<ScoredRoute>, total_amount: U256) -> Vec<Route>;
}

/// Greedy score-proportional split with a per-route floor.
///
/// Not a global optimum: output is not re-quoted at the allocated size, and the
/// floor can give a weak route more than its score alone would earn.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalSplit {
    min_allocation_bps: u32,
}

struct Share {
    candidate: ScoredRoute,
    bps: u32,
    /// Raised to the floor; excluded from renormalisation
    pinned: bool,
}

impl ProportionalSplit {
    pub fn new(min_allocation_bps: u32) -> Self {
        Self {
            min_allocation_bps: min_allocation_bps.min(BPS_DENOMINATOR),
        }
    }

    fn rebalance(&self, shares: &mut Vec<Share>) {
        let floor = u64::from(self.min_allocation_bps);
        let whole = u64::from(BPS_DENOMINATOR);
        loop {
            let sum: u64 = shares.iter().map(|s| u64::from(s.bps)).sum();
            if sum <= whole {
                return;
            }

            let pinned_total = floor * shares.iter().filter(|s| s.pinned).count() as u64;
            if pinned_total > whole {
                // floors alone overflow: drop the weakest pinned route, latest discovered first
                let weakest = shares
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.pinned)
                    .min_by(|(_, a), (_, b)| {
                        a.candidate.score.cmp(&b.candidate.score).then(
                            b.candidate
                                .discovery_index
                                .cmp(&a.candidate.discovery_index),
                        )
                    })
                    .map(|(i, _)| i);
                match weakest {
                    Some(i) => {
                        let dropped = shares.remove(i);
                        debug!(
                            route = %dropped.candidate.route.label(),
                            "dropped floored route to fit allocation budget"
                        );
                        continue;
                    }
                    None => return,
                }
            }

            let budget = whole - pinned_total;
            let free_total: u64 = shares
                .iter()
                .filter(|s| !s.pinned)
                .map(|s| u64::from(s.bps))
                .sum();
            if free_total == 0 {
                return;
            }
            for share in shares.iter_mut().filter(|s| !s.pinned) {
                let scaled = u64::from(share.bps) * budget / free_total;
                if scaled < floor {
                    share.bps = self.min_allocation_bps;
                    share.pinned = true;
                } else {
                    share.bps = scaled as u32;
                }
            }
        }
    }
}

impl SplitStrategy for ProportionalSplit {
    fn allocate(&self, mut candidates: Vec<ScoredRoute>, total_amount: U256) -> Vec<Route> {
        candidates.retain(|c| c.score > 0 && !c.route.expected_output.is_zero());
        candidates.sort_by_key(|c| c.discovery_index);

        // a lone viable route takes everything
        if candidates.len() <= 1 {
            return candidates
                .into_iter()
                .map(|c| c.route.allocate(BPS_DENOMINATOR, total_amount))
                .collect();
        }

        let total_score = candidates
            .iter()
            .fold(U256::ZERO, |acc, c| acc.saturating_add(U256::from(c.score)));

        let mut shares: Vec<Share> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let raw = U256::from(candidate.score) * U256::from(BPS_DENOMINATOR) / total_score;
                let raw = u32::try_from(raw).unwrap_or(BPS_DENOMINATOR);
                if raw == 0 {
                    return None;
                }
                let pinned = raw < self.min_allocation_bps;
                Some(Share {
                    candidate,
                    bps: raw.max(self.min_allocation_bps),
                    pinned,
                })
            })
            .collect();

        self.rebalance(&mut shares);

        shares
            .into_iter()
            .map(|s| s.candidate.route.allocate(s.bps, total_amount))
            .collect()
    }
}
