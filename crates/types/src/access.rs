//! Single-administrator access control shared by the ledger and the reward
//! engine. The administrator role can be handed over but never dropped.

use crate::address::AccountId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("caller {0} is not the administrator")]
    NotAdministrator(AccountId),
    #[error("administrator role cannot be renounced")]
    OwnershipRenounceDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    administrator: AccountId,
}

impl AccessControl {
    /// Create a guard owned by `administrator`.
    ///
    /// A null administrator would leave the component unrecoverable and is
    /// rejected the same way an explicit renounce is.
    pub fn new(administrator: AccountId) -> Result<Self, AccessError> {
        if administrator.is_null() {
            return Err(AccessError::OwnershipRenounceDisabled);
        }
        Ok(Self { administrator })
    }

    pub fn administrator(&self) -> AccountId {
        self.administrator
    }

    pub fn is_administrator(&self, caller: &AccountId) -> bool {
        &self.administrator == caller
    }

    pub fn require_administrator(&self, caller: &AccountId) -> Result<(), AccessError> {
        if !self.is_administrator(caller) {
            return Err(AccessError::NotAdministrator(*caller));
        }
        Ok(())
    }

    /// Hand the role to `new_administrator`.
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        new_administrator: AccountId,
    ) -> Result<(), AccessError> {
        self.require_administrator(caller)?;
        if new_administrator.is_null() {
            return Err(AccessError::OwnershipRenounceDisabled);
        }
        let previous = std::mem::replace(&mut self.administrator, new_administrator);
        info!(
            target: "access",
            previous = %previous,
            current = %new_administrator,
            "Administrator transferred"
        );
        Ok(())
    }

    /// Always fails for the administrator; non-administrators get
    /// `NotAdministrator` first.
    pub fn renounce(&mut self, caller: &AccountId) -> Result<(), AccessError> {
        self.require_administrator(caller)?;
        Err(AccessError::OwnershipRenounceDisabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_administrator() {
        let admin = AccountId::from_label("admin");
        let other = AccountId::from_label("other");
        let access = AccessControl::new(admin).unwrap();

        assert!(access.require_administrator(&admin).is_ok());
        assert_eq!(
            access.require_administrator(&other),
            Err(AccessError::NotAdministrator(other))
        );
    }

    #[test]
    fn test_transfer_and_renounce() {
        let admin = AccountId::from_label("admin");
        let next = AccountId::from_label("next");
        let mut access = AccessControl::new(admin).unwrap();

        assert_eq!(
            access.transfer(&admin, AccountId::NULL),
            Err(AccessError::OwnershipRenounceDisabled)
        );
        assert_eq!(
            access.renounce(&admin),
            Err(AccessError::OwnershipRenounceDisabled)
        );
        assert_eq!(access.administrator(), admin);

        access.transfer(&admin, next).unwrap();
        assert_eq!(access.administrator(), next);
        assert!(access.require_administrator(&admin).is_err());
    }

    #[test]
    fn test_null_administrator_rejected() {
        assert_eq!(
            AccessControl::new(AccountId::NULL),
            Err(AccessError::OwnershipRenounceDisabled)
        );
    }
}
