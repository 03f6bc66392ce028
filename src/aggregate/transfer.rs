//! Transfer Aggregate
//!
//! Lifecycle of a requested fund movement:
//!
//! ```text
//! pending --completed--> completed
//! pending --failed-----> failed
//! ```
//!
//! Both terminal states are final. Balances move only when a pending
//! transfer is settled as completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AccountEvent, Amount, DomainError, SettlementOutcome, TransferEvent, TransferStatus,
};

use super::{Account, Aggregate};

/// Transfer Aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    amount: Amount,
    status: TransferStatus,
    created_at: DateTime<Utc>,
}

/// Everything a completed or failed settlement changes
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub transfer: Transfer,
    pub transfer_event: TransferEvent,
    /// Debit and credit events; empty for a failed settlement
    pub account_events: Vec<AccountEvent>,
    pub sender: Account,
    pub receiver: Account,
}

impl Transfer {
    // =========================================================================
    // Transfer::request()
    // =========================================================================

    /// Create a pending transfer. Balances are not checked or reserved here.
    pub fn request(
        transfer_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        amount: Amount,
    ) -> Result<(Self, TransferEvent), DomainError> {
        if sender_id == receiver_id {
            return Err(DomainError::SelfTransfer);
        }

        let now = Utc::now();
        let event = TransferEvent::TransferRequested {
            transfer_id,
            sender_id,
            receiver_id,
            amount: amount.value(),
            requested_at: now,
        };

        let transfer = Self {
            id: transfer_id,
            sender_id,
            receiver_id,
            amount,
            status: TransferStatus::Pending,
            created_at: now,
        };

        Ok((transfer, event))
    }

    /// Rebuild a transfer from its stored row
    pub fn from_db_state(
        id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        amount: Amount,
        status: TransferStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender_id,
            receiver_id,
            amount,
            status,
            created_at,
        }
    }

    // =========================================================================
    // Transfer::settle()
    // =========================================================================

    /// Produce the terminal event for this transfer.
    ///
    /// Fails with `AlreadySettled` unless the transfer is pending.
    pub fn settle(
        &self,
        outcome: SettlementOutcome,
        settled_by: Uuid,
    ) -> Result<TransferEvent, DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::AlreadySettled {
                transfer_id: self.id,
                status: self.status,
            });
        }

        let now = Utc::now();
        Ok(match outcome {
            SettlementOutcome::Completed => TransferEvent::TransferCompleted {
                transfer_id: self.id,
                settled_by,
                completed_at: now,
            },
            SettlementOutcome::Failed => TransferEvent::TransferFailed {
                transfer_id: self.id,
                settled_by,
                failed_at: now,
            },
        })
    }

    /// Settle against the current sender and receiver accounts.
    ///
    /// On `completed` the sender is debited and the receiver credited by
    /// exactly the transfer amount. On `failed` neither account changes.
    /// Nothing is returned unless every step validates, so callers can
    /// persist the whole settlement or none of it.
    pub fn settle_with_accounts(
        &self,
        outcome: SettlementOutcome,
        settled_by: Uuid,
        sender: Account,
        receiver: Account,
        allow_overdraft: bool,
    ) -> Result<Settlement, DomainError> {
        if sender.user_id() != self.sender_id || receiver.user_id() != self.receiver_id {
            return Err(DomainError::InvalidInput(
                "accounts do not match transfer parties".to_string(),
            ));
        }

        let transfer_event = self.settle(outcome, settled_by)?;

        let (account_events, sender, receiver) = match outcome {
            SettlementOutcome::Completed => {
                let debit = sender.debit(&self.amount, self.id, allow_overdraft)?;
                let credit = receiver.credit(&self.amount, self.id)?;
                let sender = sender.apply(debit.clone());
                let receiver = receiver.apply(credit.clone());
                (vec![debit, credit], sender, receiver)
            }
            SettlementOutcome::Failed => (Vec::new(), sender, receiver),
        };

        Ok(Settlement {
            transfer: self.clone().apply(transfer_event.clone()),
            transfer_event,
            account_events,
            sender,
            receiver,
        })
    }

    pub fn sender_id(&self) -> Uuid {
        self.sender_id
    }

    pub fn receiver_id(&self) -> Uuid {
        self.receiver_id
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Aggregate for Transfer {
    type Event = TransferEvent;

    fn aggregate_type() -> &'static str {
        "Transfer"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(mut self, event: Self::Event) -> Self {
        match event {
            TransferEvent::TransferRequested {
                transfer_id,
                sender_id,
                receiver_id,
                requested_at,
                ..
            } => {
                self.id = transfer_id;
                self.sender_id = sender_id;
                self.receiver_id = receiver_id;
                self.status = TransferStatus::Pending;
                self.created_at = requested_at;
            }
            TransferEvent::TransferCompleted { .. } => {
                self.status = TransferStatus::Completed;
            }
            TransferEvent::TransferFailed { .. } => {
                self.status = TransferStatus::Failed;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn pending(sender: Uuid, receiver: Uuid, amount: Decimal) -> Transfer {
        let (transfer, _) =
            Transfer::request(Uuid::new_v4(), sender, receiver, Amount::new(amount).unwrap())
                .unwrap();
        transfer
    }

    #[test]
    fn test_request_creates_pending() {
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let (transfer, event) = Transfer::request(
            Uuid::new_v4(),
            sender,
            receiver,
            Amount::new(dec!(50.00)).unwrap(),
        )
        .unwrap();

        assert_eq!(transfer.status(), TransferStatus::Pending);
        assert_eq!(event.event_type(), "TransferRequested");
        assert_eq!(event.transfer_id(), transfer.id());
    }

    #[test]
    fn test_request_rejects_self_transfer() {
        let user = Uuid::new_v4();
        let result = Transfer::request(Uuid::new_v4(), user, user, Amount::new(dec!(1)).unwrap());
        assert!(matches!(result, Err(DomainError::SelfTransfer)));
    }

    #[test]
    fn test_completed_settlement_moves_exact_amount() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transfer = pending(a, b, dec!(50.00));

        let settlement = transfer
            .settle_with_accounts(
                SettlementOutcome::Completed,
                Uuid::new_v4(),
                Account::from_db_state(a, dec!(100.00)),
                Account::from_db_state(b, dec!(0.00)),
                false,
            )
            .unwrap();

        assert_eq!(settlement.transfer.status(), TransferStatus::Completed);
        assert_eq!(settlement.sender.balance().value(), dec!(50.00));
        assert_eq!(settlement.receiver.balance().value(), dec!(50.00));
        assert_eq!(settlement.account_events.len(), 2);
    }

    #[test]
    fn test_failed_settlement_changes_no_balance() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transfer = pending(a, b, dec!(75.10));

        let settlement = transfer
            .settle_with_accounts(
                SettlementOutcome::Failed,
                Uuid::new_v4(),
                Account::from_db_state(a, dec!(100.00)),
                Account::from_db_state(b, dec!(3.00)),
                false,
            )
            .unwrap();

        assert_eq!(settlement.transfer.status(), TransferStatus::Failed);
        assert_eq!(settlement.sender.balance().value(), dec!(100.00));
        assert_eq!(settlement.receiver.balance().value(), dec!(3.00));
        assert!(settlement.account_events.is_empty());
    }

    #[test]
    fn test_terminal_transfer_cannot_be_settled_again() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transfer = pending(a, b, dec!(10));
        let admin = Uuid::new_v4();

        let settled = transfer.clone().apply(transfer.settle(SettlementOutcome::Completed, admin).unwrap());

        for outcome in [SettlementOutcome::Completed, SettlementOutcome::Failed] {
            let result = settled.settle_with_accounts(
                outcome,
                admin,
                Account::from_db_state(a, dec!(0)),
                Account::from_db_state(b, dec!(10)),
                false,
            );
            assert!(matches!(
                result,
                Err(DomainError::AlreadySettled { status: TransferStatus::Completed, .. })
            ));
        }
    }

    #[test]
    fn test_insufficient_balance_blocks_completion() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transfer = pending(a, b, dec!(150.00));

        let result = transfer.settle_with_accounts(
            SettlementOutcome::Completed,
            Uuid::new_v4(),
            Account::from_db_state(a, dec!(100.00)),
            Account::from_db_state(b, dec!(0.00)),
            false,
        );

        assert!(matches!(result, Err(DomainError::InsufficientBalance { .. })));
    }

    #[test]
    fn test_overdraft_policy_allows_negative_sender() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transfer = pending(a, b, dec!(150.00));

        let settlement = transfer
            .settle_with_accounts(
                SettlementOutcome::Completed,
                Uuid::new_v4(),
                Account::from_db_state(a, dec!(100.00)),
                Account::from_db_state(b, dec!(0.00)),
                true,
            )
            .unwrap();

        assert_eq!(settlement.sender.balance().value(), dec!(-50.00));
        assert_eq!(settlement.receiver.balance().value(), dec!(150.00));
    }

    #[test]
    fn test_mismatched_accounts_rejected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transfer = pending(a, b, dec!(1));

        let result = transfer.settle_with_accounts(
            SettlementOutcome::Completed,
            Uuid::new_v4(),
            Account::from_db_state(b, dec!(100)),
            Account::from_db_state(a, dec!(0)),
            false,
        );
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }
}
