//! Fixed-supply ledger.
//!
//! Every balance change is validated completely (accounts, policy gate,
//! balances, allowances) before anything is written, so a rejected call never
//! leaves partial effects. Supply is fixed at genesis and only burns reduce it.

use crate::errors::LedgerError;
use crate::genesis::{split_supply, Allocation, GenesisConfig, RemainderPolicy};
use crate::policy::{check_pause, check_transfer, PolicyConfig};
use rankfi_types::{module_account_id, AccessControl, AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Name the ledger's own holding account is derived from.
pub const LEDGER_MODULE: &str = "ledger";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// The ledger's own holding account; nothing may be sent here.
    account: AccountId,
    access: AccessControl,
    policy: PolicyConfig,
    balances: HashMap<AccountId, Amount>,
    /// owner → spender → remaining allowance
    allowances: HashMap<AccountId, HashMap<AccountId, Amount>>,
    initial_supply: Amount,
    total_supply: Amount,
    total_burned: Amount,
    seeded: bool,
}

impl Ledger {
    /// Build a ledger and seed it from `genesis`.
    ///
    /// Seeding runs under [`PolicyConfig::seeding`]; the steady-state policy
    /// (with the administrator and the ledger account made exempt) is
    /// installed before this returns.
    pub fn genesis(genesis: GenesisConfig) -> Result<Self, LedgerError> {
        let access = AccessControl::new(genesis.administrator)?;
        let account = module_account_id(LEDGER_MODULE);

        let mut ledger = Self {
            account,
            access,
            policy: PolicyConfig::seeding(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            initial_supply: 0,
            total_supply: 0,
            total_burned: 0,
            seeded: false,
        };

        ledger.mint_once(genesis.nominal_supply, &genesis.allocations, &genesis.remainder)?;

        let mut policy = genesis.policy;
        policy.exempt_accounts.insert(genesis.administrator);
        policy.exempt_accounts.insert(account);
        ledger.policy = policy;

        info!(
            target: "ledger",
            administrator = %genesis.administrator,
            total_supply = ledger.total_supply,
            holders = ledger.balances.len(),
            "Ledger seeded"
        );

        Ok(ledger)
    }

    fn mint_once(
        &mut self,
        nominal_supply: Amount,
        allocations: &[Allocation],
        remainder_policy: &RemainderPolicy,
    ) -> Result<(), LedgerError> {
        if self.seeded {
            return Err(LedgerError::AlreadySeeded);
        }
        check_pause(&self.policy)?;

        let split = split_supply(nominal_supply, allocations)?;
        for (destination, _) in &split.shares {
            if destination == &self.account {
                return Err(LedgerError::SelfTransferForbidden);
            }
        }
        if let RemainderPolicy::AssignTo(destination) = remainder_policy {
            if destination.is_null() {
                return Err(LedgerError::InvalidAccount(*destination));
            }
            if destination == &self.account {
                return Err(LedgerError::SelfTransferForbidden);
            }
        }

        for (destination, share) in &split.shares {
            *self.balances.entry(*destination).or_insert(0) += share;
        }

        let minted = match remainder_policy {
            RemainderPolicy::Discard => split.distributed,
            RemainderPolicy::AssignTo(destination) => {
                if split.remainder > 0 {
                    *self.balances.entry(*destination).or_insert(0) += split.remainder;
                }
                nominal_supply
            }
        };

        self.initial_supply = minted;
        self.total_supply = minted;
        self.seeded = true;

        debug!(
            target: "ledger",
            nominal = nominal_supply,
            minted = minted,
            remainder = split.remainder,
            "Genesis allocations minted"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn administrator(&self) -> AccountId {
        self.access.administrator()
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn initial_supply(&self) -> Amount {
        self.initial_supply
    }

    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    /// Snapshot of all non-zero balances.
    pub fn balances(&self) -> HashMap<AccountId, Amount> {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(account, balance)| (*account, *balance))
            .collect()
    }

    /// `sum(balances) == total_supply` and `total_supply + total_burned ==
    /// initial_supply`.
    pub fn supply_is_consistent(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(*balance));
        sum == Some(self.total_supply)
            && self.total_supply.checked_add(self.total_burned) == Some(self.initial_supply)
    }

    // -------------------------------------------------------------------------
    // Balance mutations
    // -------------------------------------------------------------------------

    pub fn transfer(
        &mut self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.move_funds(caller, to, amount)?;
        info!(target: "ledger", from = %caller, to = %to, amount = amount, "Transfer");
        Ok(())
    }

    pub fn approve(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if owner.is_null() {
            return Err(LedgerError::InvalidAccount(*owner));
        }
        if spender.is_null() {
            return Err(LedgerError::InvalidAccount(*spender));
        }
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        info!(target: "ledger", owner = %owner, spender = %spender, amount = amount, "Approval");
        Ok(())
    }

    /// Move `amount` from `owner` to `to` on behalf of `spender`, consuming
    /// allowance only if the transfer commits.
    pub fn transfer_from(
        &mut self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(owner, spender);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                available,
                required: amount,
            });
        }

        self.move_funds(owner, to, amount)?;

        if let Some(spenders) = self.allowances.get_mut(owner) {
            spenders.insert(*spender, available - amount);
        }
        info!(
            target: "ledger",
            spender = %spender,
            from = %owner,
            to = %to,
            amount = amount,
            "Transfer via allowance"
        );
        Ok(())
    }

    /// Destroy `amount` from the caller's balance. Only blocked while paused.
    pub fn burn(&mut self, caller: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        check_pause(&self.policy)?;

        let available = self.balance_of(caller);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *caller,
                available,
                required: amount,
            });
        }
        let total_burned = self
            .total_burned
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("total burned"))?;

        self.balances.insert(*caller, available - amount);
        self.total_supply -= amount;
        self.total_burned = total_burned;

        info!(
            target: "ledger",
            from = %caller,
            amount = amount,
            total_supply = self.total_supply,
            total_burned = self.total_burned,
            "Burn"
        );
        Ok(())
    }

    fn move_funds(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from.is_null() {
            return Err(LedgerError::InvalidAccount(*from));
        }
        if to.is_null() {
            return Err(LedgerError::InvalidAccount(*to));
        }

        let to_balance = self.balance_of(to);
        check_transfer(&self.policy, &self.account, from, to, amount, to_balance)?;

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *from,
                available: from_balance,
                required: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let credited = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("recipient balance"))?;
        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    pub fn set_paused(&mut self, caller: &AccountId, paused: bool) -> Result<(), LedgerError> {
        self.access.require_administrator(caller)?;
        self.policy.paused = paused;
        info!(target: "ledger", paused, "Pause flag updated");
        Ok(())
    }

    pub fn set_trading_enabled(
        &mut self,
        caller: &AccountId,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        self.access.require_administrator(caller)?;
        self.policy.trading_enabled = enabled;
        info!(target: "ledger", enabled, "Trading flag updated");
        Ok(())
    }

    pub fn set_limits(
        &mut self,
        caller: &AccountId,
        max_tx_amount: Amount,
        max_wallet_amount: Amount,
    ) -> Result<(), LedgerError> {
        self.access.require_administrator(caller)?;
        self.policy.max_tx_amount = max_tx_amount;
        self.policy.max_wallet_amount = max_wallet_amount;
        info!(
            target: "ledger",
            max_tx_amount,
            max_wallet_amount,
            "Transfer limits updated"
        );
        Ok(())
    }

    pub fn set_limits_in_effect(
        &mut self,
        caller: &AccountId,
        in_effect: bool,
    ) -> Result<(), LedgerError> {
        self.access.require_administrator(caller)?;
        self.policy.limits_in_effect = in_effect;
        info!(target: "ledger", in_effect, "Limits switch updated");
        Ok(())
    }

    pub fn set_limit_exempt(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        exempt: bool,
    ) -> Result<(), LedgerError> {
        self.access.require_administrator(caller)?;
        if exempt {
            self.policy.exempt_accounts.insert(*account);
        } else {
            self.policy.exempt_accounts.remove(account);
        }
        info!(target: "ledger", account = %account, exempt, "Exemption updated");
        Ok(())
    }

    pub fn set_pool_account(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        is_pool: bool,
    ) -> Result<(), LedgerError> {
        self.access.require_administrator(caller)?;
        if is_pool {
            self.policy.pool_accounts.insert(*account);
        } else {
            self.policy.pool_accounts.remove(account);
        }
        info!(target: "ledger", account = %account, is_pool, "Pool account updated");
        Ok(())
    }

    pub fn transfer_administrator(
        &mut self,
        caller: &AccountId,
        new_administrator: AccountId,
    ) -> Result<(), LedgerError> {
        self.access.transfer(caller, new_administrator)?;
        Ok(())
    }

    pub fn renounce_administrator(&mut self, caller: &AccountId) -> Result<(), LedgerError> {
        self.access.renounce(caller)?;
        Ok(())
    }
}
