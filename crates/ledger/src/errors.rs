use rankfi_types::{AccessError, AccountId, Amount};
use thiserror::Error;

/// Reasons a ledger call is rejected. Every rejection leaves state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger is paused")]
    Paused,

    #[error("transfers into the ledger's own account are forbidden")]
    SelfTransferForbidden,

    #[error("trading is disabled and neither {from} nor {to} is exempt")]
    TradingDisabled { from: AccountId, to: AccountId },

    #[error("amount {amount} exceeds max transaction amount {max}")]
    ExceedsMaxTx { amount: Amount, max: Amount },

    #[error("resulting balance {resulting} of {account} exceeds max wallet amount {max}")]
    ExceedsMaxWallet {
        account: AccountId,
        resulting: Amount,
        max: Amount,
    },

    #[error("insufficient balance in {account}: available={available}, required={required}")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("insufficient allowance from {owner} to {spender}: available={available}, required={required}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("allocation basis points sum to {cumulative_bps}, exceeding 10000")]
    InvalidSplit { cumulative_bps: u32 },

    #[error("ledger supply has already been seeded")]
    AlreadySeeded,

    #[error("invalid account: {0}")]
    InvalidAccount(AccountId),

    #[error("caller {0} is not the administrator")]
    NotAdministrator(AccountId),

    #[error("administrator role cannot be renounced")]
    OwnershipRenounceDisabled,

    #[error("arithmetic overflow while updating ledger: {0}")]
    Overflow(&'static str),
}

impl From<AccessError> for LedgerError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotAdministrator(caller) => LedgerError::NotAdministrator(caller),
            AccessError::OwnershipRenounceDisabled => LedgerError::OwnershipRenounceDisabled,
        }
    }
}
