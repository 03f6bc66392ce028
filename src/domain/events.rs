//! Domain Events
//!
//! Immutable facts produced by aggregates. Handlers persist the resulting
//! state and record each event in the audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DomainError;

/// Transfer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "completed" => Ok(TransferStatus::Completed),
            "failed" => Ok(TransferStatus::Failed),
            other => Err(DomainError::InvalidInput(format!("unknown transfer status: {}", other))),
        }
    }
}

/// Terminal outcome chosen by the settling administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Completed,
    Failed,
}

impl SettlementOutcome {
    pub fn as_status(&self) -> TransferStatus {
        match self {
            SettlementOutcome::Completed => TransferStatus::Completed,
            SettlementOutcome::Failed => TransferStatus::Failed,
        }
    }
}

impl FromStr for SettlementOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SettlementOutcome::Completed),
            "failed" => Ok(SettlementOutcome::Failed),
            other => Err(DomainError::InvalidOutcome(other.to_string())),
        }
    }
}

/// Transfer-related events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransferEvent {
    /// A user asked to move funds; balances untouched
    TransferRequested {
        transfer_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        amount: Decimal,
        requested_at: DateTime<Utc>,
    },

    /// An administrator approved the transfer; both balances moved
    TransferCompleted {
        transfer_id: Uuid,
        settled_by: Uuid,
        completed_at: DateTime<Utc>,
    },

    /// An administrator rejected the transfer
    TransferFailed {
        transfer_id: Uuid,
        settled_by: Uuid,
        failed_at: DateTime<Utc>,
    },
}

impl TransferEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferRequested { .. } => "TransferRequested",
            TransferEvent::TransferCompleted { .. } => "TransferCompleted",
            TransferEvent::TransferFailed { .. } => "TransferFailed",
        }
    }

    /// Get the transfer ID this event relates to
    pub fn transfer_id(&self) -> Uuid {
        match self {
            TransferEvent::TransferRequested { transfer_id, .. } => *transfer_id,
            TransferEvent::TransferCompleted { transfer_id, .. } => *transfer_id,
            TransferEvent::TransferFailed { transfer_id, .. } => *transfer_id,
        }
    }
}

/// Account balance events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccountEvent {
    /// Balance increased by a settled transfer
    MoneyCredited {
        user_id: Uuid,
        amount: Decimal,
        transfer_id: Uuid,
        balance_after: Decimal,
    },

    /// Balance decreased by a settled transfer
    MoneyDebited {
        user_id: Uuid,
        amount: Decimal,
        transfer_id: Uuid,
        balance_after: Decimal,
    },

    /// Administrator replaced the balance wholesale
    BalanceAdjusted {
        user_id: Uuid,
        previous_balance: Decimal,
        new_balance: Decimal,
        adjusted_by: Uuid,
        adjusted_at: DateTime<Utc>,
    },
}

impl AccountEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::MoneyCredited { .. } => "MoneyCredited",
            AccountEvent::MoneyDebited { .. } => "MoneyDebited",
            AccountEvent::BalanceAdjusted { .. } => "BalanceAdjusted",
        }
    }

    /// Get the account owner this event relates to
    pub fn user_id(&self) -> Uuid {
        match self {
            AccountEvent::MoneyCredited { user_id, .. } => *user_id,
            AccountEvent::MoneyDebited { user_id, .. } => *user_id,
            AccountEvent::BalanceAdjusted { user_id, .. } => *user_id,
        }
    }
}

/// Assessment events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssessmentEvent {
    /// A scored result and its full answer trail were persisted
    TestSubmitted {
        result_id: Uuid,
        user_id: Uuid,
        score: i32,
        total_questions: i32,
        iq_score: i32,
        submitted_at: DateTime<Utc>,
    },
}
