//! Read Model
//!
//! Queries backing the history, detail, admin and dashboard views.
//! Money columns are rendered as two-fractional-digit strings.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::amount::money_string;
use crate::domain::{DomainError, Principal};
use crate::error::AppError;

/// Maximum rows returned by the user search
const SEARCH_LIMIT: i64 = 10;

// =========================================================================
// Views
// =========================================================================

/// One stored assessment attempt
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TestResultView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub iq_score: i32,
    pub completed_at: DateTime<Utc>,
}

/// Answer trail entry enriched with the question it refers to.
///
/// Question fields are `None` when the id no longer resolves.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetailView {
    pub question_id: Uuid,
    pub selected_answer: String,
    pub is_correct: bool,
    pub question_text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetailView {
    #[serde(flatten)]
    pub result: TestResultView,
    pub answers: Vec<AnswerDetailView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    #[serde(serialize_with = "money_string::serialize")]
    pub balance: Decimal,
}

/// Which side of a transfer the caller is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransferView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub sender_username: String,
    pub receiver_username: String,
    #[serde(serialize_with = "money_string::serialize")]
    pub amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    /// Present only on the caller's own history
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(serialize_with = "money_string::serialize")]
    pub balance: Decimal,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailView {
    #[serde(flatten)]
    pub user: UserView,
    pub test_count: i64,
    /// Rounded mean derived score; `None` before the first attempt
    #[serde(rename = "averageIQ")]
    pub average_iq: Option<i32>,
}

/// Transfer counterparty lookup result
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSearchView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub total_users: i64,
    pub total_tests: i64,
    pub pending_transactions: i64,
    /// Sum over completed transfers only
    #[serde(serialize_with = "money_string::serialize")]
    pub total_transaction_volume: Decimal,
}

const TRANSFER_COLUMNS: &str = r#"
    SELECT t.id, t.sender_id, t.receiver_id,
           s.username AS sender_username, r.username AS receiver_username,
           t.amount, t.status, t.created_at, t.settled_at
    FROM transfers t
    JOIN users s ON s.id = t.sender_id
    JOIN users r ON r.id = t.receiver_id
"#;

// =========================================================================
// ReadModel
// =========================================================================

/// Query service for the read side
#[derive(Debug, Clone)]
pub struct ReadModel {
    pool: PgPool,
}

impl ReadModel {
    /// Create a new ReadModel
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Assessment views
    // =========================================================================

    /// All attempts owned by `user_id`, most recent first
    pub async fn test_history(&self, user_id: Uuid) -> Result<Vec<TestResultView>, AppError> {
        let results = sqlx::query_as::<_, TestResultView>(
            r#"
            SELECT id, user_id, score, total_questions, iq_score, completed_at
            FROM test_results
            WHERE user_id = $1
            ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    /// One attempt with its enriched answer trail.
    ///
    /// Only the owner or an administrator may read it.
    pub async fn result_detail(
        &self,
        result_id: Uuid,
        requester: &Principal,
    ) -> Result<ResultDetailView, AppError> {
        let result = sqlx::query_as::<_, TestResultView>(
            r#"
            SELECT id, user_id, score, total_questions, iq_score, completed_at
            FROM test_results
            WHERE id = $1
            "#,
        )
        .bind(result_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::ResultNotFound(result_id))?;

        if !requester.can_read_owned_by(result.user_id) {
            tracing::warn!(
                result_id = %result_id,
                requester = %requester.user_id,
                "Result detail denied"
            );
            return Err(DomainError::Forbidden("not the owner of this result".to_string()).into());
        }

        let answers = sqlx::query_as::<_, AnswerDetailView>(
            r#"
            SELECT a.question_id, a.selected_answer, a.is_correct,
                   q.question_text, q.option_a, q.option_b, q.option_c, q.option_d,
                   q.correct_answer::TEXT AS correct_answer
            FROM user_answers a
            LEFT JOIN questions q ON q.id = a.question_id
            WHERE a.test_result_id = $1
            ORDER BY a.position
            "#,
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ResultDetailView { result, answers })
    }

    // =========================================================================
    // Ledger views
    // =========================================================================

    pub async fn balance(&self, user_id: Uuid) -> Result<BalanceView, AppError> {
        let balance: Option<Decimal> = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let balance = balance.ok_or(DomainError::UserNotFound(user_id))?;
        Ok(BalanceView { balance })
    }

    /// Transfers the user sent or received, newest first
    pub async fn transfer_history(&self, user_id: Uuid) -> Result<Vec<TransferView>, AppError> {
        let sql = format!(
            "{} WHERE t.sender_id = $1 OR t.receiver_id = $1 ORDER BY t.created_at DESC",
            TRANSFER_COLUMNS
        );
        let mut transfers = sqlx::query_as::<_, TransferView>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        for transfer in &mut transfers {
            transfer.direction = Some(direction_for(transfer.sender_id, user_id));
        }

        Ok(transfers)
    }

    /// Every transfer, newest first
    pub async fn transfers(&self) -> Result<Vec<TransferView>, AppError> {
        let sql = format!("{} ORDER BY t.created_at DESC", TRANSFER_COLUMNS);
        let transfers = sqlx::query_as::<_, TransferView>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(transfers)
    }

    /// Case-insensitive username lookup excluding the caller
    pub async fn search_users(
        &self,
        query: &str,
        exclude: Uuid,
    ) -> Result<Vec<UserSearchView>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserSearchView>(
            r#"
            SELECT id, username, email
            FROM users
            WHERE (username ILIKE $1 OR email ILIKE $1) AND id <> $2
            ORDER BY username
            LIMIT $3
            "#,
        )
        .bind(like_pattern(query))
        .bind(exclude)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Admin views
    // =========================================================================

    /// All users, newest first
    pub async fn users(&self) -> Result<Vec<UserView>, AppError> {
        let users = sqlx::query_as::<_, UserView>(
            r#"
            SELECT id, username, email, balance, role, created_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn user_detail(&self, user_id: Uuid) -> Result<UserDetailView, AppError> {
        let user = sqlx::query_as::<_, UserView>(
            r#"
            SELECT id, username, email, balance, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::UserNotFound(user_id))?;

        let (test_count, mean): (i64, Option<Decimal>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(iq_score)::NUMERIC FROM test_results WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserDetailView {
            user,
            test_count,
            average_iq: mean.and_then(round_mean),
        })
    }

    /// Dashboard counters
    pub async fn stats(&self) -> Result<StatsView, AppError> {
        let (total_users, total_tests, pending_transactions, total_transaction_volume): (
            i64,
            i64,
            i64,
            Decimal,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM test_results),
                (SELECT COUNT(*) FROM transfers WHERE status = 'pending'),
                (SELECT COALESCE(SUM(amount), 0) FROM transfers WHERE status = 'completed')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StatsView {
            total_users,
            total_tests,
            pending_transactions,
            total_transaction_volume,
        })
    }
}

fn direction_for(sender_id: Uuid, viewer: Uuid) -> Direction {
    if sender_id == viewer {
        Direction::Sent
    } else {
        Direction::Received
    }
}

fn round_mean(mean: Decimal) -> Option<i32> {
    mean.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
}

/// Substring ILIKE pattern with wildcards in the input escaped
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
