//! RankFi shared types
//!
//! Account identifiers, fixed-point units, day buckets and the
//! single-administrator guard used by the ledger and the reward engine.

pub mod access;
pub mod address;
pub mod time_service;
pub mod units;

pub use access::*;
pub use address::*;
pub use time_service::*;
pub use units::*;
