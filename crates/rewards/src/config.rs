use rankfi_types::{tokens, AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default per-call cap: the top tier.
pub const DEFAULT_MAX_REWARD_PER_CALL_TOKENS: u128 = 5;
/// Default per-account daily cap.
pub const DEFAULT_MAX_DAILY_PER_ACCOUNT_TOKENS: u128 = 50;

/// Reward engine construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Ledger account holding the pool. Derived from the module name when unset.
    pub account: Option<AccountId>,
    pub max_reward_per_call: Amount,
    pub max_daily_per_account: Amount,
    pub signers: BTreeSet<AccountId>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            account: None,
            max_reward_per_call: tokens(DEFAULT_MAX_REWARD_PER_CALL_TOKENS),
            max_daily_per_account: tokens(DEFAULT_MAX_DAILY_PER_ACCOUNT_TOKENS),
            signers: BTreeSet::new(),
        }
    }
}
