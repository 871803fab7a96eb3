//! Ledger interface consumed by components that hold balances on the ledger.
//!
//! Holders get no privileged access: every movement goes through the same
//! transfer-policy gate as any other account.

use crate::errors::LedgerError;
use crate::ledger::Ledger;
use rankfi_types::{AccountId, Amount};

/// Interface for token ledger operations.
pub trait TokenLedger: Send {
    /// Current balance of `account`.
    fn balance_of(&self, account: &AccountId) -> Amount;

    /// Move `amount` out of `from`, which is the acting account.
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` out of `owner` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;
}

impl TokenLedger for Ledger {
    fn balance_of(&self, account: &AccountId) -> Amount {
        Ledger::balance_of(self, account)
    }

    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        Ledger::transfer(self, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        Ledger::transfer_from(self, spender, owner, to, amount)
    }
}
