//! User Directory
//!
//! Registers user records. Identity verification happens upstream; this only
//! stores the profile and its embedded balance.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Balance, DomainError};
use crate::error::AppError;

use super::{CreateUserCommand, CreateUserResult};

/// Write side of the user registry
pub struct UserDirectory {
    pool: PgPool,
}

impl UserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user; username and email must both be unused.
    pub async fn create_user(&self, command: CreateUserCommand) -> Result<CreateUserResult, AppError> {
        let username = command.username.trim().to_string();
        let email = command.email.trim().to_string();
        if username.is_empty() || email.is_empty() {
            return Err(AppError::InvalidRequest(
                "username and email are required".to_string(),
            ));
        }

        let balance = Balance::new(command.initial_balance).map_err(DomainError::from)?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
                .bind(&username)
                .bind(&email)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            return Err(AppError::InvalidRequest(
                "User with this username or email already exists".to_string(),
            ));
        }

        let user_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, role, balance)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(&username)
        .bind(&email)
        .bind(command.role.as_str())
        .bind(balance.value())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, username = %username, role = %command.role, "User created");

        Ok(CreateUserResult {
            user_id,
            username,
            role: command.role,
        })
    }
}
