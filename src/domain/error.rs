//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::TransferStatus;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant failures.
/// They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid amount (zero, negative, non-numeric, or exceeds limit)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer where sender and receiver are the same account
    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    /// Insufficient balance at settlement time
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    /// Role or ownership mismatch
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transfer is already in a terminal state
    #[error("Transfer {transfer_id} is already settled ({status})")]
    AlreadySettled {
        transfer_id: Uuid,
        status: TransferStatus,
    },

    /// Settlement outcome must be terminal
    #[error("Invalid settlement outcome: {0}")]
    InvalidOutcome(String),

    /// The question bank has no items to sample
    #[error("Question pool is empty")]
    EmptyPool,

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Transfer not found: {0}")]
    TransferNotFound(Uuid),

    #[error("Test result not found: {0}")]
    ResultNotFound(Uuid),
}

impl DomainError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance { required, available }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidAmount(_)
                | Self::SelfTransfer
                | Self::InsufficientBalance { .. }
                | Self::Forbidden(_)
                | Self::InvalidOutcome(_)
        )
    }

    /// Check if this is a conflict with current state
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::AlreadySettled { .. })
    }

    /// Check if this reports an unknown id
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EmptyPool
                | Self::UserNotFound(_)
                | Self::TransferNotFound(_)
                | Self::ResultNotFound(_)
        )
    }
}

impl From<super::AmountError> for DomainError {
    fn from(err: super::AmountError) -> Self {
        DomainError::InvalidAmount(err.to_string())
    }
}
