//! Metric → reward step function.
//!
//! Lower metrics earn more. The table is ordered by `max_metric`; the first
//! tier whose bound covers the metric wins and anything past the last bound
//! earns nothing.

use rankfi_types::{tokens, Amount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTier {
    /// Inclusive upper bound of the metric range.
    pub max_metric: u64,
    /// Whole tokens paid for this tier.
    pub reward_tokens: u128,
}

pub const REWARD_TIERS: [RewardTier; 3] = [
    RewardTier {
        max_metric: 10,
        reward_tokens: 5,
    },
    RewardTier {
        max_metric: 50,
        reward_tokens: 3,
    },
    RewardTier {
        max_metric: 100,
        reward_tokens: 1,
    },
];

/// Reward in fixed-point units for `metric`. Zero means no payout.
pub fn reward_for(metric: u64) -> Amount {
    REWARD_TIERS
        .iter()
        .find(|tier| metric <= tier.max_metric)
        .map(|tier| tokens(tier.reward_tokens))
        .unwrap_or(0)
}
