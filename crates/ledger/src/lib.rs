//! RankFi Ledger
//!
//! Fixed-supply balances with a one-time genesis split, allowances, burns and
//! an administrator-controlled transfer-policy gate (pause, trading switch,
//! per-transaction and per-wallet caps, exemptions, pool accounts).

pub mod errors;
pub mod genesis;
pub mod ledger;
pub mod policy;
pub mod token_ledger;

pub use errors::LedgerError;
pub use genesis::{split_supply, Allocation, GenesisConfig, RemainderPolicy, SupplySplit};
pub use ledger::{Ledger, LEDGER_MODULE};
pub use policy::{check_pause, check_transfer, PolicyConfig};
pub use token_ledger::TokenLedger;
