// Error types and error handling module
// This file defines the error taxonomy for the split aggregator: input errors,
// venue errors and global errors, plus the custody and transport errors they wrap
//
// Numan Thabit 2025 Nov

use crate::ledger::Account;
use crate::venues::VenueId;
use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

/// How far an error propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rejected before any external call; the caller can retry with corrected input.
    Input,
    /// Recorded and routed around; never fatal on its own.
    Venue,
    /// Fatal to the whole call; all state changes are rolled back.
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    #[error("invalid token address")]
    InvalidToken,
    #[error("input and output token are identical")]
    IdenticalTokens,
    #[error("amount below minimum")]
    InsufficientAmount,
    #[error("deadline {deadline} outside of accepted window (now {now})")]
    DeadlineExpired { deadline: u64, now: u64 },
    #[error("duplicate request {0}")]
    DuplicateRequest(B256),
    #[error("custody transfer failed: {0}")]
    Custody(#[from] LedgerError),
    #[error("venue {0} unavailable")]
    AdapterUnavailable(VenueId),
    #[error("venue {venue} quote failed: {reason}")]
    QuoteFailed { venue: VenueId, reason: String },
    #[error("no viable routes")]
    NoViableRoutes,
    #[error("insufficient output: {amount_out} < {min_amount_out}")]
    InsufficientOutput { amount_out: U256, min_amount_out: U256 },
    #[error("slippage exceeded: expected {expected}, minimum {min_amount_out}")]
    SlippageExceeded { expected: U256, min_amount_out: U256 },
    #[error("swap task interrupted: {0}")]
    Interrupted(String),
}

impl SwapError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SwapError::InvalidToken
            | SwapError::IdenticalTokens
            | SwapError::InsufficientAmount
            | SwapError::DeadlineExpired { .. }
            | SwapError::DuplicateRequest(_)
            | SwapError::Custody(_) => ErrorClass::Input,
            SwapError::AdapterUnavailable(_) | SwapError::QuoteFailed { .. } => ErrorClass::Venue,
            SwapError::NoViableRoutes
            | SwapError::InsufficientOutput { .. }
            | SwapError::SlippageExceeded { .. }
            | SwapError::Interrupted(_) => ErrorClass::Global,
        }
    }

    /// Short stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SwapError::InvalidToken => "invalid_token",
            SwapError::IdenticalTokens => "identical_tokens",
            SwapError::InsufficientAmount => "insufficient_amount",
            SwapError::DeadlineExpired { .. } => "deadline_expired",
            SwapError::DuplicateRequest(_) => "duplicate_request",
            SwapError::Custody(_) => "custody",
            SwapError::AdapterUnavailable(_) => "adapter_unavailable",
            SwapError::QuoteFailed { .. } => "quote_failed",
            SwapError::NoViableRoutes => "no_viable_routes",
            SwapError::InsufficientOutput { .. } => "insufficient_output",
            SwapError::SlippageExceeded { .. } => "slippage_exceeded",
            SwapError::Interrupted(_) => "interrupted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{account} holds {available} of {token}, needs {needed}")]
    InsufficientBalance {
        account: Account,
        token: Address,
        needed: U256,
        available: U256,
    },
    #[error("{spender} may spend {available} of {token} from {owner}, needs {needed}")]
    InsufficientAllowance {
        owner: Account,
        spender: Account,
        token: Address,
        needed: U256,
        available: U256,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport error: {0}")]
    Send(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors raised by a venue adapter while executing a hop.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("venue {0} unavailable")]
    Unavailable(VenueId),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("venue rejected swap: {0}")]
    Rejected(String),
    #[error("delivered {delivered} below hop minimum {minimum}")]
    BelowMinimum { delivered: U256, minimum: U256 },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(SwapError::IdenticalTokens.class(), ErrorClass::Input);
        assert_eq!(
            SwapError::DuplicateRequest(B256::ZERO).class(),
            ErrorClass::Input
        );
        assert_eq!(
            SwapError::AdapterUnavailable(VenueId::new("uni")).class(),
            ErrorClass::Venue
        );
        assert_eq!(SwapError::NoViableRoutes.class(), ErrorClass::Global);
        assert_eq!(
            SwapError::InsufficientOutput {
                amount_out: U256::from(1),
                min_amount_out: U256::from(2)
            }
            .class(),
            ErrorClass::Global
        );
    }
}
