//! Reward Engine
//!
//! Pays tiered rewards out of a pool held as an ordinary ledger account.
//!
//! ## Key Invariants
//! - Only signers may trigger payouts; only the administrator configures
//! - `claimed[account][day]` never exceeds the daily cap in force when it was
//!   written and only grows within a day
//! - Daily bookkeeping is committed only after the ledger transfer succeeds
//! - A payout cannot be re-entered while another is in flight
//! - The administrator role can never be renounced

use crate::config::RewardConfig;
use crate::errors::RewardError;
use crate::tiers::reward_for;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rankfi_ledger::TokenLedger;
use rankfi_types::{
    day_index, module_account_id, AccessControl, AccountId, Amount, DayIndex, TimeSource,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name the engine's default pool account is derived from.
pub const REWARD_ENGINE_MODULE: &str = "rewards";

/// Number of recent payouts kept for inspection.
pub const MAX_PAYOUT_HISTORY: usize = 1_024;

/// A committed payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub account: AccountId,
    pub metric: u64,
    pub amount: Amount,
    pub day: DayIndex,
    pub timestamp: u64,
}

/// Summary statistics about the reward engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStatistics {
    pub total_payouts: u64,
    pub unique_accounts: usize,
    pub total_paid: Amount,
    pub average_payout: Amount,
    pub signers: usize,
}

/// Persistent engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    account: AccountId,
    access: AccessControl,
    signers: BTreeSet<AccountId>,
    max_reward_per_call: Amount,
    max_daily_per_account: Amount,
    /// account → day → cumulative amount claimed that day
    claimed: HashMap<AccountId, BTreeMap<DayIndex, Amount>>,
    payouts: VecDeque<PayoutRecord>,
    total_payouts: u64,
    total_paid: Amount,
}

impl EngineState {
    fn claimed_on(&self, account: &AccountId, day: DayIndex) -> Amount {
        self.claimed
            .get(account)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or(0)
    }
}

/// Tiered, rate-limited reward payouts.
///
/// The engine is `Send + Sync` and shared by reference. Calls from different
/// threads are serialised by `call_gate`; a nested `reward_player` on the same
/// thread (for example from a ledger hook) is rejected with
/// [`RewardError::ReentrantCall`].
pub struct RewardEngine {
    state: Mutex<EngineState>,
    /// Holds `true` while a payout is in flight.
    call_gate: ReentrantMutex<Cell<bool>>,
    clock: Arc<dyn TimeSource>,
}

/// Clears the in-flight flag when a payout finishes, however it finishes.
struct InFlight<'a> {
    gate: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate.set(false);
    }
}

impl RewardEngine {
    pub fn new(
        administrator: AccountId,
        config: RewardConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, RewardError> {
        let access = AccessControl::new(administrator)?;
        let account = config
            .account
            .unwrap_or_else(|| module_account_id(REWARD_ENGINE_MODULE));
        if account.is_null() {
            return Err(RewardError::InvalidAccount(account));
        }

        let state = EngineState {
            account,
            access,
            signers: config.signers,
            max_reward_per_call: config.max_reward_per_call,
            max_daily_per_account: config.max_daily_per_account,
            claimed: HashMap::new(),
            payouts: VecDeque::new(),
            total_payouts: 0,
            total_paid: 0,
        };

        info!(
            target: "rewards",
            account = %account,
            administrator = %administrator,
            max_per_call = state.max_reward_per_call,
            max_daily = state.max_daily_per_account,
            "Reward engine created"
        );

        Ok(Self::restore(state, clock))
    }

    /// Rebuild an engine from a persisted snapshot.
    pub fn restore(state: EngineState, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            state: Mutex::new(state),
            call_gate: ReentrantMutex::new(Cell::new(false)),
            clock,
        }
    }

    pub fn snapshot(&self) -> EngineState {
        let _serial = self.call_gate.lock();
        self.state.lock().clone()
    }

    fn enter(&self) -> Result<InFlight<'_>, RewardError> {
        let gate = self.call_gate.lock();
        if gate.replace(true) {
            return Err(RewardError::ReentrantCall);
        }
        Ok(InFlight { gate })
    }

    // -------------------------------------------------------------------------
    // Payouts
    // -------------------------------------------------------------------------

    /// Pay `account` the tier reward for `metric`.
    pub fn reward_player(
        &self,
        caller: &AccountId,
        account: &AccountId,
        metric: u64,
        ledger: &mut dyn TokenLedger,
    ) -> Result<PayoutRecord, RewardError> {
        let _in_flight = self.enter()?;

        let result = self.pay(caller, account, metric, ledger);
        if let Err(err) = &result {
            warn!(
                target: "rewards",
                caller = %caller,
                account = %account,
                metric,
                error = %err,
                "Reward payout rejected"
            );
        }
        result
    }

    fn pay(
        &self,
        caller: &AccountId,
        account: &AccountId,
        metric: u64,
        ledger: &mut dyn TokenLedger,
    ) -> Result<PayoutRecord, RewardError> {
        let now = self.clock.now_secs();
        let day = day_index(now);

        let (engine_account, amount) = {
            let state = self.state.lock();

            if !state.signers.contains(caller) {
                return Err(RewardError::UnauthorizedCaller(*caller));
            }
            if account.is_null() || *account == state.account {
                return Err(RewardError::InvalidAccount(*account));
            }

            let amount = reward_for(metric);
            if amount == 0 {
                return Err(RewardError::NoReward { metric });
            }
            if amount > state.max_reward_per_call {
                return Err(RewardError::ExceedsPerCallCap {
                    amount,
                    max: state.max_reward_per_call,
                });
            }

            let claimed = state.claimed_on(account, day);
            let new_total = claimed
                .checked_add(amount)
                .ok_or(RewardError::Overflow("daily total"))?;
            if new_total > state.max_daily_per_account {
                return Err(RewardError::ExceedsDailyCap {
                    account: *account,
                    claimed,
                    amount,
                    max: state.max_daily_per_account,
                });
            }

            (state.account, amount)
        };

        let available = ledger.balance_of(&engine_account);
        if available < amount {
            return Err(RewardError::InsufficientPool {
                available,
                required: amount,
            });
        }

        // State lock is released here: the ledger may call back into the
        // engine's read side.
        ledger.transfer(&engine_account, account, amount)?;

        let record = PayoutRecord {
            account: *account,
            metric,
            amount,
            day,
            timestamp: now,
        };

        let mut state = self.state.lock();
        let claimed = state
            .claimed
            .entry(*account)
            .or_default()
            .entry(day)
            .or_insert(0);
        *claimed = claimed.saturating_add(amount);
        let claimed_total = *claimed;
        state.total_payouts += 1;
        state.total_paid = state.total_paid.saturating_add(amount);
        if state.payouts.len() == MAX_PAYOUT_HISTORY {
            state.payouts.pop_front();
        }
        state.payouts.push_back(record.clone());

        info!(
            target: "rewards",
            account = %account,
            metric,
            amount,
            day,
            claimed_today = claimed_total,
            "Reward paid"
        );

        Ok(record)
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    /// Add or remove a signer. Repeating the same call changes nothing.
    pub fn set_signer(
        &self,
        caller: &AccountId,
        signer: &AccountId,
        allowed: bool,
    ) -> Result<(), RewardError> {
        let _serial = self.call_gate.lock();
        let mut state = self.state.lock();
        state.access.require_administrator(caller)?;
        let changed = if allowed {
            state.signers.insert(*signer)
        } else {
            state.signers.remove(signer)
        };
        info!(target: "rewards", signer = %signer, allowed, changed, "Signer updated");
        Ok(())
    }

    /// Replace both caps. Already-recorded daily totals are left as they are.
    pub fn set_caps(
        &self,
        caller: &AccountId,
        max_reward_per_call: Amount,
        max_daily_per_account: Amount,
    ) -> Result<(), RewardError> {
        let _serial = self.call_gate.lock();
        let mut state = self.state.lock();
        state.access.require_administrator(caller)?;
        state.max_reward_per_call = max_reward_per_call;
        state.max_daily_per_account = max_daily_per_account;
        info!(
            target: "rewards",
            max_reward_per_call,
            max_daily_per_account,
            "Reward caps updated"
        );
        Ok(())
    }

    /// Pull `amount` from the administrator into the pool. The administrator
    /// must have approved the engine account as spender on the ledger.
    pub fn top_up(
        &self,
        caller: &AccountId,
        amount: Amount,
        ledger: &mut dyn TokenLedger,
    ) -> Result<(), RewardError> {
        let _serial = self.call_gate.lock();
        let engine_account = {
            let state = self.state.lock();
            state.access.require_administrator(caller)?;
            state.account
        };

        ledger.transfer_from(&engine_account, caller, &engine_account, amount)?;
        info!(
            target: "rewards",
            from = %caller,
            amount,
            pool = ledger.balance_of(&engine_account),
            "Reward pool topped up"
        );
        Ok(())
    }

    /// Move `amount` out of the pool to `to`. Still subject to the ledger's
    /// transfer policy.
    pub fn rescue(
        &self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
        ledger: &mut dyn TokenLedger,
    ) -> Result<(), RewardError> {
        let _serial = self.call_gate.lock();
        let engine_account = {
            let state = self.state.lock();
            state.access.require_administrator(caller)?;
            state.account
        };

        ledger.transfer(&engine_account, to, amount)?;
        info!(target: "rewards", to = %to, amount, "Reward pool rescued");
        Ok(())
    }

    pub fn transfer_administrator(
        &self,
        caller: &AccountId,
        new_administrator: AccountId,
    ) -> Result<(), RewardError> {
        let _serial = self.call_gate.lock();
        self.state.lock().access.transfer(caller, new_administrator)?;
        Ok(())
    }

    /// Always rejected: the engine must stay administrable.
    pub fn renounce_administrator(&self, caller: &AccountId) -> Result<(), RewardError> {
        let _serial = self.call_gate.lock();
        self.state.lock().access.renounce(caller)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn account(&self) -> AccountId {
        self.state.lock().account
    }

    pub fn administrator(&self) -> AccountId {
        self.state.lock().access.administrator()
    }

    pub fn is_signer(&self, account: &AccountId) -> bool {
        self.state.lock().signers.contains(account)
    }

    pub fn signers(&self) -> Vec<AccountId> {
        self.state.lock().signers.iter().copied().collect()
    }

    /// `(max_reward_per_call, max_daily_per_account)`
    pub fn caps(&self) -> (Amount, Amount) {
        let state = self.state.lock();
        (state.max_reward_per_call, state.max_daily_per_account)
    }

    pub fn claimed_on(&self, account: &AccountId, day: DayIndex) -> Amount {
        self.state.lock().claimed_on(account, day)
    }

    pub fn claimed_today(&self, account: &AccountId) -> Amount {
        self.claimed_on(account, self.clock.today())
    }

    /// Remaining allowance for `account` today under the current cap.
    pub fn remaining_today(&self, account: &AccountId) -> Amount {
        let day = self.clock.today();
        let state = self.state.lock();
        state
            .max_daily_per_account
            .saturating_sub(state.claimed_on(account, day))
    }

    pub fn pool_balance(&self, ledger: &dyn TokenLedger) -> Amount {
        ledger.balance_of(&self.account())
    }

    /// Most recent payouts, oldest first.
    pub fn recent_payouts(&self, limit: usize) -> Vec<PayoutRecord> {
        let state = self.state.lock();
        let skip = state.payouts.len().saturating_sub(limit);
        state.payouts.iter().skip(skip).cloned().collect()
    }

    pub fn get_statistics(&self) -> RewardStatistics {
        let state = self.state.lock();
        let average_payout = if state.total_payouts > 0 {
            state.total_paid / state.total_payouts as u128
        } else {
            0
        };
        debug!(
            target: "rewards",
            total_payouts = state.total_payouts,
            "Computed reward statistics"
        );
        RewardStatistics {
            total_payouts: state.total_payouts,
            unique_accounts: state.claimed.len(),
            total_paid: state.total_paid,
            average_payout,
            signers: state.signers.len(),
        }
    }
}

impl std::fmt::Debug for RewardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardEngine")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankfi_ledger::{Allocation, GenesisConfig, Ledger, LedgerError, PolicyConfig};
    use rankfi_types::{tokens, ManualClock, SECONDS_PER_DAY};

    fn id(s: &str) -> AccountId {
        AccountId::from_label(s)
    }

    struct Fixture {
        ledger: Ledger,
        engine: RewardEngine,
        clock: Arc<ManualClock>,
    }

    /// Ledger with trading on and limits off; engine exempt and funded with
    /// 100 tokens; `signer` authorised.
    fn fixture() -> Fixture {
        let admin = id("admin");
        let mut ledger = Ledger::genesis(GenesisConfig {
            administrator: admin,
            nominal_supply: tokens(1_000_000),
            allocations: vec![Allocation::new(admin, 10_000)],
            remainder: Default::default(),
            policy: PolicyConfig {
                trading_enabled: true,
                limits_in_effect: false,
                ..PolicyConfig::default()
            },
        })
        .unwrap();

        let clock = Arc::new(ManualClock::new(10 * SECONDS_PER_DAY));
        let mut config = RewardConfig::default();
        config.signers.insert(id("signer"));
        let engine = RewardEngine::new(admin, config, clock.clone()).unwrap();

        ledger
            .set_limit_exempt(&admin, &engine.account(), true)
            .unwrap();
        ledger
            .transfer(&admin, &engine.account(), tokens(100))
            .unwrap();

        Fixture {
            ledger,
            engine,
            clock,
        }
    }

    #[test]
    fn test_reward_player_pays_tier_amount() {
        let mut fx = fixture();
        let record = fx
            .engine
            .reward_player(&id("signer"), &id("player"), 5, &mut fx.ledger)
            .unwrap();
        assert_eq!(record.amount, tokens(5));
        assert_eq!(record.day, 10);
        assert_eq!(fx.ledger.balance_of(&id("player")), tokens(5));
        assert_eq!(fx.engine.pool_balance(&fx.ledger), tokens(95));
        assert_eq!(fx.engine.claimed_today(&id("player")), tokens(5));
    }

    #[test]
    fn test_rejection_order() {
        let mut fx = fixture();
        assert_eq!(
            fx.engine
                .reward_player(&id("stranger"), &AccountId::NULL, 500, &mut fx.ledger),
            Err(RewardError::UnauthorizedCaller(id("stranger")))
        );
        assert_eq!(
            fx.engine
                .reward_player(&id("signer"), &AccountId::NULL, 500, &mut fx.ledger),
            Err(RewardError::InvalidAccount(AccountId::NULL))
        );
        assert_eq!(
            fx.engine
                .reward_player(&id("signer"), &id("player"), 101, &mut fx.ledger),
            Err(RewardError::NoReward { metric: 101 })
        );

        fx.engine.set_caps(&id("admin"), tokens(3), tokens(50)).unwrap();
        assert_eq!(
            fx.engine
                .reward_player(&id("signer"), &id("player"), 0, &mut fx.ledger),
            Err(RewardError::ExceedsPerCallCap {
                amount: tokens(5),
                max: tokens(3)
            })
        );
        assert!(fx
            .engine
            .reward_player(&id("signer"), &id("player"), 11, &mut fx.ledger)
            .is_ok());
    }

    #[test]
    fn test_daily_cap_and_new_day() {
        let mut fx = fixture();
        fx.engine.set_caps(&id("admin"), tokens(5), tokens(10)).unwrap();

        for _ in 0..2 {
            fx.engine
                .reward_player(&id("signer"), &id("player"), 1, &mut fx.ledger)
                .unwrap();
        }
        assert_eq!(
            fx.engine
                .reward_player(&id("signer"), &id("player"), 1, &mut fx.ledger),
            Err(RewardError::ExceedsDailyCap {
                account: id("player"),
                claimed: tokens(10),
                amount: tokens(5),
                max: tokens(10)
            })
        );
        // A smaller tier still fits nowhere today: 10 + 1 > 10.
        assert!(fx
            .engine
            .reward_player(&id("signer"), &id("player"), 99, &mut fx.ledger)
            .is_err());

        fx.clock.advance(SECONDS_PER_DAY);
        fx.engine
            .reward_player(&id("signer"), &id("player"), 1, &mut fx.ledger)
            .unwrap();
        assert_eq!(fx.engine.claimed_on(&id("player"), 10), tokens(10));
        assert_eq!(fx.engine.claimed_on(&id("player"), 11), tokens(5));
    }

    #[test]
    fn test_failed_transfer_does_not_consume_daily_allowance() {
        let mut fx = fixture();
        let admin = id("admin");
        let engine_account = fx.engine.account();
        fx.ledger
            .set_limit_exempt(&admin, &engine_account, false)
            .unwrap();
        fx.ledger.set_trading_enabled(&admin, false).unwrap();

        let result = fx
            .engine
            .reward_player(&id("signer"), &id("player"), 1, &mut fx.ledger);
        assert!(matches!(
            result,
            Err(RewardError::Ledger(LedgerError::TradingDisabled { .. }))
        ));
        assert_eq!(fx.engine.claimed_today(&id("player")), 0);
        assert_eq!(fx.engine.get_statistics().total_payouts, 0);
        assert_eq!(fx.engine.pool_balance(&fx.ledger), tokens(100));
    }

    #[test]
    fn test_insufficient_pool() {
        let mut fx = fixture();
        fx.engine
            .rescue(&id("admin"), &id("admin"), tokens(98), &mut fx.ledger)
            .unwrap();
        assert_eq!(
            fx.engine
                .reward_player(&id("signer"), &id("player"), 1, &mut fx.ledger),
            Err(RewardError::InsufficientPool {
                available: tokens(2),
                required: tokens(5)
            })
        );
        assert_eq!(fx.engine.claimed_today(&id("player")), 0);
        assert!(fx
            .engine
            .reward_player(&id("signer"), &id("player"), 60, &mut fx.ledger)
            .is_ok());
    }

    #[test]
    fn test_pool_account_cannot_be_rewarded() {
        let mut fx = fixture();
        let pool = fx.engine.account();
        assert_eq!(
            fx.engine
                .reward_player(&id("signer"), &pool, 0, &mut fx.ledger),
            Err(RewardError::InvalidAccount(pool))
        );
        assert_eq!(fx.engine.pool_balance(&fx.ledger), tokens(100));
        assert_eq!(fx.engine.claimed_today(&pool), 0);
        assert_eq!(fx.engine.get_statistics().total_payouts, 0);
        assert!(fx.engine.recent_payouts(10).is_empty());
    }

    #[test]
    fn test_rescue_goes_through_transfer_gate() {
        let mut fx = fixture();
        let admin = id("admin");
        let ledger_account = fx.ledger.account();

        assert_eq!(
            fx.engine
                .rescue(&admin, &ledger_account, tokens(10), &mut fx.ledger),
            Err(RewardError::Ledger(LedgerError::SelfTransferForbidden))
        );

        fx.ledger.set_paused(&admin, true).unwrap();
        assert_eq!(
            fx.engine.rescue(&admin, &admin, tokens(10), &mut fx.ledger),
            Err(RewardError::Ledger(LedgerError::Paused))
        );
        assert_eq!(fx.engine.pool_balance(&fx.ledger), tokens(100));

        fx.ledger.set_paused(&admin, false).unwrap();
        fx.engine
            .rescue(&admin, &admin, tokens(10), &mut fx.ledger)
            .unwrap();
        assert_eq!(fx.engine.pool_balance(&fx.ledger), tokens(90));
    }

    #[test]
    fn test_set_signer_idempotent() {
        let fx = fixture();
        let admin = id("admin");
        fx.engine.set_signer(&admin, &id("bot"), true).unwrap();
        let once = fx.engine.snapshot();
        fx.engine.set_signer(&admin, &id("bot"), true).unwrap();
        assert_eq!(fx.engine.snapshot(), once);
        assert_eq!(fx.engine.signers().len(), 2);

        fx.engine.set_signer(&admin, &id("bot"), false).unwrap();
        fx.engine.set_signer(&admin, &id("bot"), false).unwrap();
        assert!(!fx.engine.is_signer(&id("bot")));
    }

    #[test]
    fn test_admin_only_operations() {
        let mut fx = fixture();
        let outsider = id("signer");
        let expected = Err(RewardError::NotAdministrator(outsider));
        assert_eq!(fx.engine.set_signer(&outsider, &outsider, true), expected);
        assert_eq!(fx.engine.set_caps(&outsider, 1, 1), expected);
        assert_eq!(fx.engine.top_up(&outsider, 1, &mut fx.ledger), expected);
        assert_eq!(
            fx.engine.rescue(&outsider, &outsider, 1, &mut fx.ledger),
            expected
        );
        assert_eq!(
            fx.engine.transfer_administrator(&outsider, outsider),
            expected
        );
    }

    #[test]
    fn test_ownership_cannot_be_renounced() {
        let fx = fixture();
        let admin = id("admin");
        assert_eq!(
            fx.engine.renounce_administrator(&admin),
            Err(RewardError::OwnershipRenounceDisabled)
        );
        assert_eq!(
            fx.engine.transfer_administrator(&admin, AccountId::NULL),
            Err(RewardError::OwnershipRenounceDisabled)
        );
        fx.engine.transfer_administrator(&admin, id("next")).unwrap();
        assert_eq!(fx.engine.administrator(), id("next"));
    }

    #[test]
    fn test_top_up_requires_allowance() {
        let mut fx = fixture();
        let admin = id("admin");
        let engine_account = fx.engine.account();
        assert!(matches!(
            fx.engine.top_up(&admin, tokens(10), &mut fx.ledger),
            Err(RewardError::Ledger(LedgerError::InsufficientAllowance { .. }))
        ));

        fx.ledger
            .approve(&admin, &engine_account, tokens(10))
            .unwrap();
        fx.engine.top_up(&admin, tokens(10), &mut fx.ledger).unwrap();
        assert_eq!(fx.engine.pool_balance(&fx.ledger), tokens(110));
        assert_eq!(fx.ledger.allowance(&admin, &engine_account), 0);
    }

    #[test]
    fn test_statistics_and_history() {
        let mut fx = fixture();
        fx.engine
            .reward_player(&id("signer"), &id("a"), 5, &mut fx.ledger)
            .unwrap();
        fx.engine
            .reward_player(&id("signer"), &id("b"), 75, &mut fx.ledger)
            .unwrap();

        let stats = fx.engine.get_statistics();
        assert_eq!(stats.total_payouts, 2);
        assert_eq!(stats.unique_accounts, 2);
        assert_eq!(stats.total_paid, tokens(6));
        assert_eq!(stats.average_payout, tokens(3));

        let recent = fx.engine.recent_payouts(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].account, id("b"));
        assert_eq!(recent[0].metric, 75);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut fx = fixture();
        fx.engine
            .reward_player(&id("signer"), &id("a"), 5, &mut fx.ledger)
            .unwrap();
        let json = serde_json::to_string(&fx.engine.snapshot()).unwrap();
        let state: EngineState = serde_json::from_str(&json).unwrap();
        let restored = RewardEngine::restore(state, fx.clock.clone());
        assert_eq!(restored.claimed_today(&id("a")), tokens(5));
        assert_eq!(restored.account(), fx.engine.account());
    }
}
