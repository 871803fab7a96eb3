//! RankFi Reward Engine
//!
//! Pays tiered rewards for an externally supplied performance metric out of a
//! pool held on the RankFi ledger, with per-call and per-account daily caps.

pub mod config;
pub mod engine;
pub mod errors;
pub mod tiers;

pub use config::RewardConfig;
pub use engine::{
    EngineState, PayoutRecord, RewardEngine, RewardStatistics, MAX_PAYOUT_HISTORY,
    REWARD_ENGINE_MODULE,
};
pub use errors::RewardError;
pub use tiers::{reward_for, RewardTier, REWARD_TIERS};
