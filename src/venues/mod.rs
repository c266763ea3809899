// Venue adapters
// Uniform quote/execute interface over external liquidity sources
//
// Numan Thabit 2025 Nov

pub mod adapter;
pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use adapter::{
    ExecuteRequest, Hint, VenueAdapter, VenueId, VenueInfo, VenueQuote, VenueRegistry,
    VenueSummary,
};
pub use http::HttpVenue;
