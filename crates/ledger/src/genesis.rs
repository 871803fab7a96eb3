//! One-time supply seeding.
//!
//! Shares are `floor(supply * bps / 10_000)` per destination, computed in the
//! order given. Cumulative basis points may not exceed 10_000. What happens
//! to the integer-division remainder is chosen by [`RemainderPolicy`].

use crate::errors::LedgerError;
use crate::policy::PolicyConfig;
use rankfi_types::{bps_share, tokens, AccountId, Amount, BasisPoints, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

/// Reference supply: 5,000,000,000 whole tokens.
pub const DEFAULT_SUPPLY_TOKENS: u128 = 5_000_000_000;

/// One genesis destination and its share in basis points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: AccountId,
    pub bps: BasisPoints,
}

impl Allocation {
    pub fn new(account: AccountId, bps: BasisPoints) -> Self {
        Self { account, bps }
    }
}

/// Where the rounding remainder of the split goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "account")]
pub enum RemainderPolicy {
    /// The remainder is never minted; total supply equals the amount
    /// actually distributed.
    #[default]
    Discard,
    /// Credit the remainder to this account so the full nominal supply exists.
    AssignTo(AccountId),
}

/// Everything needed to construct a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub administrator: AccountId,
    pub nominal_supply: Amount,
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub remainder: RemainderPolicy,
    /// Steady-state policy installed once seeding is complete.
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl GenesisConfig {
    /// Reference 25/30/15/10/10/5/5 split of 5B tokens over seven
    /// label-derived accounts.
    pub fn reference(administrator: AccountId) -> Self {
        let split: [(&str, BasisPoints); 7] = [
            ("treasury", 2_500),
            ("liquidity", 3_000),
            ("rewards", 1_500),
            ("team", 1_000),
            ("marketing", 1_000),
            ("partners", 500),
            ("reserve", 500),
        ];
        Self {
            administrator,
            nominal_supply: tokens(DEFAULT_SUPPLY_TOKENS),
            allocations: split
                .iter()
                .map(|(label, bps)| Allocation::new(AccountId::from_label(label), *bps))
                .collect(),
            remainder: RemainderPolicy::default(),
            policy: PolicyConfig::default(),
        }
    }
}

/// Outcome of a split: per-destination shares plus what was left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplySplit {
    pub shares: Vec<(AccountId, Amount)>,
    pub distributed: Amount,
    pub remainder: Amount,
}

/// Compute genesis shares without touching any state.
pub fn split_supply(
    nominal_supply: Amount,
    allocations: &[Allocation],
) -> Result<SupplySplit, LedgerError> {
    let mut cumulative_bps: u32 = 0;
    let mut shares = Vec::with_capacity(allocations.len());
    let mut distributed: Amount = 0;

    for allocation in allocations {
        cumulative_bps += allocation.bps as u32;
        if cumulative_bps as u128 > BPS_DENOMINATOR {
            return Err(LedgerError::InvalidSplit { cumulative_bps });
        }
        if allocation.account.is_null() {
            return Err(LedgerError::InvalidAccount(allocation.account));
        }

        let share = bps_share(nominal_supply, allocation.bps)
            .ok_or(LedgerError::Overflow("genesis share"))?;
        distributed = distributed
            .checked_add(share)
            .ok_or(LedgerError::Overflow("genesis total"))?;
        shares.push((allocation.account, share));
    }

    Ok(SupplySplit {
        shares,
        distributed,
        remainder: nominal_supply - distributed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_split_is_exact() {
        let config = GenesisConfig::reference(AccountId::from_label("admin"));
        let split = split_supply(config.nominal_supply, &config.allocations).unwrap();
        assert_eq!(split.shares.len(), 7);
        assert_eq!(split.shares[0].1, tokens(1_250_000_000));
        assert_eq!(split.shares[1].1, tokens(1_500_000_000));
        assert_eq!(split.remainder, 0);
        assert_eq!(split.distributed, tokens(DEFAULT_SUPPLY_TOKENS));
    }

    #[test]
    fn test_remainder_is_deterministic() {
        let allocations = vec![
            Allocation::new(AccountId::from_label("a"), 3_333),
            Allocation::new(AccountId::from_label("b"), 3_333),
            Allocation::new(AccountId::from_label("c"), 3_333),
        ];
        let split = split_supply(1_000, &allocations).unwrap();
        assert_eq!(
            split.shares.iter().map(|(_, s)| *s).collect::<Vec<_>>(),
            vec![333, 333, 333]
        );
        assert_eq!(split.remainder, 1);
        assert_eq!(split_supply(1_000, &allocations).unwrap(), split);
    }

    #[test]
    fn test_over_allocation_rejected_at_crossing_entry() {
        let allocations = vec![
            Allocation::new(AccountId::from_label("a"), 6_000),
            Allocation::new(AccountId::from_label("b"), 4_000),
            Allocation::new(AccountId::from_label("c"), 1),
        ];
        assert_eq!(
            split_supply(1_000, &allocations),
            Err(LedgerError::InvalidSplit {
                cumulative_bps: 10_001
            })
        );
    }

    #[test]
    fn test_null_destination_rejected() {
        let allocations = vec![Allocation::new(AccountId::NULL, 100)];
        assert_eq!(
            split_supply(1_000, &allocations),
            Err(LedgerError::InvalidAccount(AccountId::NULL))
        );
    }

    #[test]
    fn test_remainder_policy_serde_shape() {
        let assign = RemainderPolicy::AssignTo(AccountId::from_label("reserve"));
        let json = serde_json::to_value(&assign).unwrap();
        assert_eq!(json["mode"], "assign_to");
        let back: RemainderPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, assign);
    }
}
