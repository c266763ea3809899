// Custody ledger
// In-memory token balances and allowances owned by the router. Venue accounts are
// external: their balances are not tracked, they only move tokens in and out of custody.
//
// Numan Thabit 2025 Nov

use crate::errors::LedgerError;
use crate::venues::VenueId;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    User(Address),
    /// Funds in flight during a swap
    Engine,
    /// Platform fees
    Treasury,
    Venue(VenueId),
}

impl Account {
    pub fn is_external(&self) -> bool {
        matches!(self, Account::Venue(_))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::User(addr) => write!(f, "user:{addr}"),
            Account::Engine => f.write_str("engine"),
            Account::Treasury => f.write_str("treasury"),
            Account::Venue(id) => write!(f, "venue:{id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: HashMap<(Account, Address), U256>,
    allowances: HashMap<(Account, Account, Address), U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Account, token: Address) -> U256 {
        self.balances
            .get(&(account.clone(), token))
            .copied()
            .unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Account, spender: &Account, token: Address) -> U256 {
        self.allowances
            .get(&(owner.clone(), spender.clone(), token))
            .copied()
            .unwrap_or_default()
    }

    /// Credit tokens arriving from outside the ledger.
    pub fn credit(&mut self, account: &Account, token: Address, amount: U256) {
        if account.is_external() || amount.is_zero() {
            return;
        }
        let entry = self.balances.entry((account.clone(), token)).or_default();
        *entry = entry.saturating_add(amount);
    }

    fn debit(&mut self, account: &Account, token: Address, amount: U256) -> Result<(), LedgerError> {
        if account.is_external() || amount.is_zero() {
            return Ok(());
        }
        let available = self.balance_of(account, token);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.clone(),
                token,
                needed: amount,
                available,
            });
        }
        self.balances
            .insert((account.clone(), token), available - amount);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &Account,
        to: &Account,
        token: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.debit(from, token, amount)?;
        self.credit(to, token, amount);
        Ok(())
    }

    /// Set (not increase) the allowance of `spender` over `owner`'s tokens.
    pub fn approve(&mut self, owner: &Account, spender: &Account, token: Address, amount: U256) {
        let key = (owner.clone(), spender.clone(), token);
        if amount.is_zero() {
            self.allowances.remove(&key);
        } else {
            self.allowances.insert(key, amount);
        }
    }

    pub fn transfer_from(
        &mut self,
        spender: &Account,
        owner: &Account,
        to: &Account,
        token: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(owner, spender, token);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                token,
                needed: amount,
                available,
            });
        }
        self.transfer(owner, to, token, amount)?;
        self.approve(owner, spender, token, available - amount);
        Ok(())
    }

    pub fn snapshot(&self) -> Ledger {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: Ledger) {
        *self = snapshot;
    }
}

/// Handle a venue adapter settles one hop through. The venue may only pull what
/// custody approved for it and delivers its output back into custody.
pub struct Settlement<'a> {
    ledger: &'a mut Ledger,
    custodian: Account,
    venue: Account,
    token_in: Address,
    token_out: Address,
}

impl<'a> Settlement<'a> {
    pub fn new(
        ledger: &'a mut Ledger,
        custodian: Account,
        venue: VenueId,
        token_in: Address,
        token_out: Address,
    ) -> Self {
        Self {
            ledger,
            custodian,
            venue: Account::Venue(venue),
            token_in,
            token_out,
        }
    }

    pub fn approved_input(&self) -> U256 {
        self.ledger
            .allowance(&self.custodian, &self.venue, self.token_in)
    }

    pub fn pull_input(&mut self, amount: U256) -> Result<(), LedgerError> {
        self.ledger.transfer_from(
            &self.venue,
            &self.custodian,
            &self.venue,
            self.token_in,
            amount,
        )
    }

    pub fn deliver_output(&mut self, amount: U256) -> Result<(), LedgerError> {
        self.ledger
            .transfer(&self.venue, &self.custodian, self.token_out, amount)
    }
}
