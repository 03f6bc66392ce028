//! Command definitions
//!
//! Commands represent intentions to change the system state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::amount::money_string;
use crate::domain::{Role, SubmittedAnswer, TransferStatus};

// =========================================================================
// SubmitTestCommand
// =========================================================================

/// Command to grade and persist one assessment attempt
#[derive(Debug, Clone)]
pub struct SubmitTestCommand {
    pub answers: Vec<SubmittedAnswer>,
}

impl SubmitTestCommand {
    pub fn new(answers: Vec<SubmittedAnswer>) -> Self {
        Self { answers }
    }
}

/// Scored attempt as returned to the test taker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestResult {
    pub id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub iq_score: i32,
    /// Rounded half away from zero
    pub percentage: i32,
}

// =========================================================================
// RequestTransferCommand
// =========================================================================

/// Command to request a transfer from the caller to another user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTransferCommand {
    pub receiver_id: Uuid,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
}

impl RequestTransferCommand {
    pub fn new(receiver_id: Uuid, amount: String) -> Self {
        Self { receiver_id, amount }
    }
}

/// A stored transfer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    #[serde(serialize_with = "money_string::serialize")]
    pub amount: Decimal,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
}

// =========================================================================
// SettleTransferCommand
// =========================================================================

/// Command to move a pending transfer to a terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleTransferCommand {
    pub transfer_id: Uuid,
    /// Requested outcome, `completed` or `failed`
    pub status: String,
}

impl SettleTransferCommand {
    pub fn new(transfer_id: Uuid, status: String) -> Self {
        Self { transfer_id, status }
    }
}

/// Outcome of a settlement with the parties' balances afterwards
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleTransferResult {
    pub id: Uuid,
    pub status: TransferStatus,
    #[serde(serialize_with = "money_string::serialize")]
    pub sender_balance: Decimal,
    #[serde(serialize_with = "money_string::serialize")]
    pub receiver_balance: Decimal,
    pub settled_at: DateTime<Utc>,
}

// =========================================================================
// AdjustBalanceCommand
// =========================================================================

/// Administrative override of a user's balance
#[derive(Debug, Clone)]
pub struct AdjustBalanceCommand {
    pub user_id: Uuid,
    pub new_balance: Decimal,
}

impl AdjustBalanceCommand {
    pub fn new(user_id: Uuid, new_balance: Decimal) -> Self {
        Self { user_id, new_balance }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceResult {
    pub user_id: Uuid,
    #[serde(serialize_with = "money_string::serialize")]
    pub previous_balance: Decimal,
    #[serde(serialize_with = "money_string::serialize")]
    pub balance: Decimal,
}

// =========================================================================
// CreateUserCommand
// =========================================================================

/// Command to register a user record
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub initial_balance: Decimal,
}

impl CreateUserCommand {
    pub fn new(username: String, email: String) -> Self {
        Self {
            username,
            email,
            role: Role::User,
            initial_balance: Decimal::ZERO,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_initial_balance(mut self, balance: Decimal) -> Self {
        self.initial_balance = balance;
        self
    }
}

/// Result of a successful user creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResult {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}
