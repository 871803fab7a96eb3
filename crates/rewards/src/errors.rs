use rankfi_ledger::LedgerError;
use rankfi_types::{AccessError, AccountId, Amount};
use thiserror::Error;

/// Reasons a reward engine call is rejected. Nothing is committed on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardError {
    #[error("caller {0} is not an authorised signer")]
    UnauthorizedCaller(AccountId),

    #[error("invalid reward recipient: {0}")]
    InvalidAccount(AccountId),

    #[error("metric {metric} earns no reward")]
    NoReward { metric: u64 },

    #[error("reward {amount} exceeds per-call cap {max}")]
    ExceedsPerCallCap { amount: Amount, max: Amount },

    #[error("daily cap exceeded for {account}: claimed={claimed}, requested={amount}, cap={max}")]
    ExceedsDailyCap {
        account: AccountId,
        claimed: Amount,
        amount: Amount,
        max: Amount,
    },

    #[error("reward pool too small: available={available}, required={required}")]
    InsufficientPool { available: Amount, required: Amount },

    #[error("caller {0} is not the administrator")]
    NotAdministrator(AccountId),

    #[error("administrator role cannot be renounced")]
    OwnershipRenounceDisabled,

    #[error("reward payout re-entered while another payout is in flight")]
    ReentrantCall,

    #[error("arithmetic overflow in reward accounting: {0}")]
    Overflow(&'static str),

    #[error("ledger rejected reward transfer: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<AccessError> for RewardError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotAdministrator(caller) => RewardError::NotAdministrator(caller),
            AccessError::OwnershipRenounceDisabled => RewardError::OwnershipRenounceDisabled,
        }
    }
}
