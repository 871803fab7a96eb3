//! Transfer-Policy Gate
//!
//! A pure decision over [`PolicyConfig`] consulted by the ledger before any
//! balance mutation is committed. Checks run in a fixed order and the first
//! failing check determines the error:
//!
//! 1. paused
//! 2. destination is the ledger's own holding account
//! 3. trading disabled and neither side exempt
//! 4. limits in effect and neither side exempt:
//!    a. per-transaction cap
//!    b. resulting wallet balance cap (pool accounts skip this one only)
//!
//! Mint and burn only run the pause check.

use crate::errors::LedgerError;
use rankfi_types::{tokens, AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Default per-transaction cap: 1% of the reference 5B supply.
pub const DEFAULT_MAX_TX_TOKENS: u128 = 50_000_000;
/// Default wallet cap: 2% of the reference 5B supply.
pub const DEFAULT_MAX_WALLET_TOKENS: u128 = 100_000_000;

/// Administrator-owned transfer policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// No balance mutation of any kind while set.
    pub paused: bool,
    /// When false only transfers touching an exempt account go through.
    pub trading_enabled: bool,
    /// Master switch for both caps.
    pub limits_in_effect: bool,
    pub max_tx_amount: Amount,
    pub max_wallet_amount: Amount,
    /// Skipped by the trading gate and both caps.
    pub exempt_accounts: BTreeSet<AccountId>,
    /// Unbounded sinks: skipped by the wallet cap only.
    pub pool_accounts: BTreeSet<AccountId>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            paused: false,
            trading_enabled: false,
            limits_in_effect: true,
            max_tx_amount: tokens(DEFAULT_MAX_TX_TOKENS),
            max_wallet_amount: tokens(DEFAULT_MAX_WALLET_TOKENS),
            exempt_accounts: BTreeSet::new(),
            pool_accounts: BTreeSet::new(),
        }
    }
}

impl PolicyConfig {
    /// Relaxed configuration used only while genesis allocations are minted.
    pub fn seeding() -> Self {
        Self {
            paused: false,
            trading_enabled: true,
            limits_in_effect: false,
            ..Self::default()
        }
    }

    pub fn is_exempt(&self, account: &AccountId) -> bool {
        self.exempt_accounts.contains(account)
    }

    pub fn is_pool(&self, account: &AccountId) -> bool {
        self.pool_accounts.contains(account)
    }
}

/// Decide whether `from -> to` of `amount` may be committed.
///
/// `to_balance` is the destination's balance before the transfer; the wallet
/// cap is applied to the resulting balance so repeated small transfers cannot
/// step over it.
pub fn check_transfer(
    config: &PolicyConfig,
    ledger_account: &AccountId,
    from: &AccountId,
    to: &AccountId,
    amount: Amount,
    to_balance: Amount,
) -> Result<(), LedgerError> {
    check_pause(config)?;

    if to == ledger_account {
        return Err(LedgerError::SelfTransferForbidden);
    }

    let exempt = config.is_exempt(from) || config.is_exempt(to);

    if !config.trading_enabled && !exempt {
        debug!(target: "ledger", from = %from, to = %to, "Trading gate rejected transfer");
        return Err(LedgerError::TradingDisabled {
            from: *from,
            to: *to,
        });
    }

    if config.limits_in_effect && !exempt {
        if amount > config.max_tx_amount {
            return Err(LedgerError::ExceedsMaxTx {
                amount,
                max: config.max_tx_amount,
            });
        }

        if !config.is_pool(to) {
            let resulting = to_balance.saturating_add(amount);
            if resulting > config.max_wallet_amount {
                return Err(LedgerError::ExceedsMaxWallet {
                    account: *to,
                    resulting,
                    max: config.max_wallet_amount,
                });
            }
        }
    }

    Ok(())
}

/// Gate for supply changes (mint, burn): only the pause flag applies.
pub fn check_pause(config: &PolicyConfig) -> Result<(), LedgerError> {
    if config.paused {
        return Err(LedgerError::Paused);
    }
    Ok(())
}
