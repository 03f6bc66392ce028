//! Account Aggregate
//!
//! The balance embedded in a user record. Commands return the event to be
//! persisted; the new balance is derived by applying that event.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountEvent, Amount, Balance, DomainError};

use super::Aggregate;

/// Account Aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Owner user ID (accounts are embedded in users)
    user_id: Uuid,

    /// Current balance
    balance: Balance,
}

impl Account {
    /// Create an account from its stored row
    pub fn from_db_state(user_id: Uuid, balance: Decimal) -> Self {
        Self {
            user_id,
            balance: Balance::from_stored(balance),
        }
    }

    // =========================================================================
    // Account::debit()
    // =========================================================================

    /// Debit money for a settled transfer.
    ///
    /// Without `allow_overdraft` the balance must cover the amount.
    pub fn debit(
        &self,
        amount: &Amount,
        transfer_id: Uuid,
        allow_overdraft: bool,
    ) -> Result<AccountEvent, DomainError> {
        if !allow_overdraft && !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_balance(
                amount.value(),
                self.balance.value(),
            ));
        }

        let balance_after = self.balance.debit(amount, allow_overdraft)?;

        Ok(AccountEvent::MoneyDebited {
            user_id: self.user_id,
            amount: amount.value(),
            transfer_id,
            balance_after: balance_after.value(),
        })
    }

    // =========================================================================
    // Account::credit()
    // =========================================================================

    /// Credit money for a settled transfer
    pub fn credit(&self, amount: &Amount, transfer_id: Uuid) -> Result<AccountEvent, DomainError> {
        let balance_after = self.balance.credit(amount)?;

        Ok(AccountEvent::MoneyCredited {
            user_id: self.user_id,
            amount: amount.value(),
            transfer_id,
            balance_after: balance_after.value(),
        })
    }

    /// Replace the balance wholesale (administrative override)
    pub fn adjust(&self, new_balance: Balance, adjusted_by: Uuid) -> AccountEvent {
        AccountEvent::BalanceAdjusted {
            user_id: self.user_id,
            previous_balance: self.balance.value(),
            new_balance: new_balance.value(),
            adjusted_by,
            adjusted_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }
}

impl Aggregate for Account {
    type Event = AccountEvent;

    fn aggregate_type() -> &'static str {
        "Account"
    }

    fn id(&self) -> Uuid {
        self.user_id
    }

    fn apply(mut self, event: Self::Event) -> Self {
        match event {
            AccountEvent::MoneyCredited { balance_after, .. }
            | AccountEvent::MoneyDebited { balance_after, .. } => {
                self.balance = Balance::from_stored(balance_after);
            }
            AccountEvent::BalanceAdjusted { new_balance, .. } => {
                self.balance = Balance::from_stored(new_balance);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_account_credit() {
        let account = Account::from_db_state(Uuid::new_v4(), dec!(0.00));

        let event = account.credit(&amount(dec!(50.00)), Uuid::new_v4()).unwrap();
        assert!(matches!(event, AccountEvent::MoneyCredited { .. }));

        let account = account.apply(event);
        assert_eq!(account.balance().value(), dec!(50.00));
    }

    #[test]
    fn test_account_debit() {
        let account = Account::from_db_state(Uuid::new_v4(), dec!(100.00));

        let event = account.debit(&amount(dec!(30.25)), Uuid::new_v4(), false).unwrap();
        let account = account.apply(event);

        assert_eq!(account.balance().value(), dec!(69.75));
    }

    #[test]
    fn test_account_insufficient_balance() {
        let account = Account::from_db_state(Uuid::new_v4(), dec!(10.00));

        let result = account.debit(&amount(dec!(10.01)), Uuid::new_v4(), false);
        assert!(matches!(result, Err(DomainError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_account_overdraft_allowed() {
        let account = Account::from_db_state(Uuid::new_v4(), dec!(10.00));

        let event = account.debit(&amount(dec!(25.00)), Uuid::new_v4(), true).unwrap();
        let account = account.apply(event);
        assert_eq!(account.balance().value(), dec!(-15.00));
    }

    #[test]
    fn test_account_adjust() {
        let user_id = Uuid::new_v4();
        let admin_id = Uuid::new_v4();
        let account = Account::from_db_state(user_id, dec!(12.34));

        let event = account.adjust(Balance::new(dec!(500)).unwrap(), admin_id);
        match &event {
            AccountEvent::BalanceAdjusted {
                previous_balance,
                new_balance,
                adjusted_by,
                ..
            } => {
                assert_eq!(*previous_balance, dec!(12.34));
                assert_eq!(*new_balance, dec!(500));
                assert_eq!(*adjusted_by, admin_id);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let account = account.apply(event);
        assert_eq!(account.balance().value(), dec!(500));
        assert_eq!(account.id(), user_id);
    }
}
