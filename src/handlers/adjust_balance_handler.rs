//! Adjust Balance Handler
//!
//! Administrative override that replaces a user's balance wholesale.
//! No transfer record is created.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::aggregate::{Account, Aggregate};
use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::domain::{require_admin, Balance, DomainError, OperationContext};
use crate::error::AppError;

use super::{AdjustBalanceCommand, AdjustBalanceResult};

/// Handler for balance overrides
pub struct AdjustBalanceHandler {
    pool: PgPool,
}

impl AdjustBalanceHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn execute(
        &self,
        command: AdjustBalanceCommand,
        context: &OperationContext,
    ) -> Result<AdjustBalanceResult, AppError> {
        require_admin(&context.principal)?;

        let new_balance = Balance::new(command.new_balance).map_err(DomainError::from)?;

        let mut tx = self.pool.begin().await?;

        let current: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
                .bind(command.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or(DomainError::UserNotFound(command.user_id))?;

        let account = Account::from_db_state(command.user_id, current);
        let event = account.adjust(new_balance, context.actor_id());

        let previous_balance = account.balance().value();
        let new_balance = new_balance.value();

        sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
            .bind(command.user_id)
            .bind(new_balance)
            .execute(&mut *tx)
            .await?;

        let audit = AuditLogBuilder::new(AuditAction::BalanceAdjusted)
            .resource_type(Account::aggregate_type())
            .resource_id(command.user_id)
            .after_state(&event)?;
        AuditLogService::append(&mut tx, audit, context).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %command.user_id,
            previous_balance = %previous_balance,
            new_balance = %new_balance,
            adjusted_by = %context.actor_id(),
            "Balance adjusted"
        );

        Ok(AdjustBalanceResult {
            user_id: command.user_id,
            previous_balance,
            balance: new_balance,
        })
    }
}
