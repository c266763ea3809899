// Route scoring
// Converts a route's expected output and gas estimate into one comparable scalar.
// Pure: identical inputs always give identical scores, so quote and execute agree.
//
// Numan Thabit 2025 Nov

use crate::router::routes::Route;
use alloy_primitives::U256;

/// Output is normalised to units of 1e15 before weighting.
pub const OUTPUT_UNIT: u128 = 1_000_000_000_000_000;
/// Numerator of the inverse-gas term when optimising for gas.
pub const GAS_TERM_NUMERATOR: u128 = 100_000_000_000;
/// Gas term used when the caller does not optimise for gas.
pub const FLAT_GAS_TERM: u128 = 1_000;

const OUTPUT_WEIGHT: u128 = 70;
const GAS_WEIGHT: u128 = 30;

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteScorer;

impl RouteScorer {
    pub fn new() -> Self {
        Self
    }

    /// `(output_term * 70 + gas_term * 30) / 100`. Zero means non-viable.
    pub fn score(&self, route: &Route, optimize_for_gas: bool) -> u128 {
        let output_term = route.expected_output / U256::from(OUTPUT_UNIT);
        let output_term = u128::try_from(output_term).unwrap_or(u128::MAX);
        let gas_term = if optimize_for_gas {
            GAS_TERM_NUMERATOR / u128::from(route.gas_estimate.max(1))
        } else {
            FLAT_GAS_TERM
        };
        output_term
            .saturating_mul(OUTPUT_WEIGHT)
            .saturating_add(gas_term.saturating_mul(GAS_WEIGHT))
            / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::routes::RouteStep;
    use crate::venues::VenueId;
    use alloy_primitives::{Address, Bytes};

    fn route(out: U256, gas: u64) -> Route {
        Route::new(
            vec![RouteStep {
                venue_id: VenueId::new("v"),
                token_in: Address::repeat_byte(1),
                token_out: Address::repeat_byte(2),
                amount_in: U256::from(1),
                venue_data: Bytes::new(),
                expected_amount_out: out,
                min_amount_out: U256::ZERO,
            }],
            gas,
            0,
        )
    }

    fn e18(x: u64) -> U256 {
        U256::from(x) * U256::from(1_000_000_000_000_000_000u128)
    }

    #[test]
    fn weights_output_and_gas() {
        let scorer = RouteScorer::new();
        // output term 997_000, gas term 1e11 / 150_000 = 666_666
        assert_eq!(scorer.score(&route(e18(997), 150_000), true), 897_899);
        // flat gas term
        assert_eq!(scorer.score(&route(e18(997), 150_000), false), 698_200);
    }

    #[test]
    fn cheaper_gas_scores_higher_only_when_optimising() {
        let scorer = RouteScorer::new();
        let cheap = route(e18(900), 100_000);
        let pricey = route(e18(900), 400_000);
        assert!(scorer.score(&cheap, true) > scorer.score(&pricey, true));
        assert_eq!(scorer.score(&cheap, false), scorer.score(&pricey, false));
    }

    #[test]
    fn deterministic() {
        let scorer = RouteScorer::new();
        let r = route(e18(950), 180_000);
        assert_eq!(scorer.score(&r, true), scorer.score(&r.clone(), true));
    }

    #[test]
    fn zero_output_with_expensive_gas_is_non_viable() {
        let scorer = RouteScorer::new();
        assert_eq!(scorer.score(&route(U256::ZERO, u64::MAX), true), 0);
    }
}
