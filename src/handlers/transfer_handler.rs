//! Transfer Handlers
//!
//! Requesting a transfer records intent only. Balances move when an
//! administrator settles it.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::aggregate::{Account, Aggregate, Transfer};
use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::domain::{
    require_admin, AccountEvent, Amount, DomainError, OperationContext, SettlementOutcome,
    TransferStatus,
};
use crate::error::AppError;

use super::{RequestTransferCommand, SettleTransferCommand, SettleTransferResult, TransferResult};

// =========================================================================
// RequestTransferHandler
// =========================================================================

/// Handler for transfer requests
pub struct RequestTransferHandler {
    pool: PgPool,
}

impl RequestTransferHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending transfer from the caller to `receiver_id`.
    ///
    /// The sender's balance is neither checked nor reserved.
    pub async fn execute(
        &self,
        command: RequestTransferCommand,
        context: &OperationContext,
    ) -> Result<TransferResult, AppError> {
        let sender_id = context.actor_id();

        // Parse and validate amount
        let amount: Amount = command.amount.parse().map_err(DomainError::from)?;

        let (transfer, event) =
            Transfer::request(Uuid::new_v4(), sender_id, command.receiver_id, amount)?;

        let mut tx = self.pool.begin().await?;

        let receiver_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(command.receiver_id)
                .fetch_one(&mut *tx)
                .await?;
        if !receiver_exists {
            return Err(DomainError::UserNotFound(command.receiver_id).into());
        }

        sqlx::query(
            r#"
            INSERT INTO transfers (id, sender_id, receiver_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(transfer.id())
        .bind(transfer.sender_id())
        .bind(transfer.receiver_id())
        .bind(transfer.amount().value())
        .bind(transfer.status().as_str())
        .bind(transfer.created_at())
        .execute(&mut *tx)
        .await?;

        let audit = AuditLogBuilder::new(AuditAction::TransferRequested)
            .resource_type(Transfer::aggregate_type())
            .resource_id(transfer.id())
            .after_state(&event)?;
        AuditLogService::append(&mut tx, audit, context).await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = %transfer.id(),
            sender_id = %sender_id,
            receiver_id = %command.receiver_id,
            amount = %transfer.amount(),
            "Transfer requested"
        );

        Ok(TransferResult {
            id: transfer.id(),
            sender_id: transfer.sender_id(),
            receiver_id: transfer.receiver_id(),
            amount: transfer.amount().value(),
            status: transfer.status(),
            created_at: transfer.created_at(),
        })
    }
}

// =========================================================================
// SettleTransferHandler
// =========================================================================

/// Handler for administrative settlement
pub struct SettleTransferHandler {
    pool: PgPool,
    allow_overdraft: bool,
}

impl SettleTransferHandler {
    pub fn new(pool: PgPool, allow_overdraft: bool) -> Self {
        Self {
            pool,
            allow_overdraft,
        }
    }

    /// Move a pending transfer to `completed` or `failed`.
    ///
    /// The transfer row and both user rows are locked for the whole
    /// transaction, so concurrent settlements of the same transfer serialize
    /// and exactly one of them observes `pending`.
    pub async fn execute(
        &self,
        command: SettleTransferCommand,
        context: &OperationContext,
    ) -> Result<SettleTransferResult, AppError> {
        require_admin(&context.principal)?;

        let outcome: SettlementOutcome = command.status.parse()?;
        let admin_id = context.actor_id();

        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, Uuid, Uuid, Decimal, String, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                r#"
                SELECT id, sender_id, receiver_id, amount, status, created_at
                FROM transfers
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(command.transfer_id)
            .fetch_optional(&mut *tx)
            .await?;

        let (id, sender_id, receiver_id, amount, status, created_at) =
            row.ok_or(DomainError::TransferNotFound(command.transfer_id))?;

        let status: TransferStatus = status
            .parse()
            .map_err(|e: DomainError| AppError::Internal(e.to_string()))?;
        if status.is_terminal() {
            return Err(DomainError::AlreadySettled {
                transfer_id: id,
                status,
            }
            .into());
        }

        let amount = Amount::new(amount).map_err(|e| AppError::Internal(e.to_string()))?;
        let transfer =
            Transfer::from_db_state(id, sender_id, receiver_id, amount, status, created_at);

        // Parties are always locked in id order.
        let (first, second) = if sender_id < receiver_id {
            (sender_id, receiver_id)
        } else {
            (receiver_id, sender_id)
        };
        let first_balance = lock_balance(&mut tx, first).await?;
        let second_balance = lock_balance(&mut tx, second).await?;
        let (sender_balance, receiver_balance) = if first == sender_id {
            (first_balance, second_balance)
        } else {
            (second_balance, first_balance)
        };

        let settlement = transfer.settle_with_accounts(
            outcome,
            admin_id,
            Account::from_db_state(sender_id, sender_balance),
            Account::from_db_state(receiver_id, receiver_balance),
            self.allow_overdraft,
        )?;

        for event in &settlement.account_events {
            let (user_id, balance_after) = match event {
                AccountEvent::MoneyCredited {
                    user_id,
                    balance_after,
                    ..
                }
                | AccountEvent::MoneyDebited {
                    user_id,
                    balance_after,
                    ..
                } => (*user_id, *balance_after),
                AccountEvent::BalanceAdjusted { .. } => continue,
            };

            sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
                .bind(user_id)
                .bind(balance_after)
                .execute(&mut *tx)
                .await?;
        }

        let settled_at = Utc::now();
        let new_status = settlement.transfer.status();

        sqlx::query(
            r#"
            UPDATE transfers
            SET status = $2, settled_at = $3, settled_by = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_status.as_str())
        .bind(settled_at)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;

        let action = match outcome {
            SettlementOutcome::Completed => AuditAction::TransferCompleted,
            SettlementOutcome::Failed => AuditAction::TransferFailed,
        };
        let audit = AuditLogBuilder::new(action)
            .resource_type(Transfer::aggregate_type())
            .resource_id(id)
            .after_state(&serde_json::json!({
                "event": settlement.transfer_event,
                "accountEvents": settlement.account_events,
            }))?;
        AuditLogService::append(&mut tx, audit, context).await?;

        tx.commit().await?;

        tracing::info!(
            transfer_id = %id,
            status = %new_status,
            settled_by = %admin_id,
            "Transfer settled"
        );

        Ok(SettleTransferResult {
            id,
            status: new_status,
            sender_balance: settlement.sender.balance().value(),
            receiver_balance: settlement.receiver.balance().value(),
            settled_at,
        })
    }
}

/// Lock a user row for the rest of the transaction and read its balance
async fn lock_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> Result<Decimal, AppError> {
    let balance: Option<Decimal> =
        sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

    balance.ok_or_else(|| DomainError::UserNotFound(user_id).into())
}
