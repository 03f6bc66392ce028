//! Domain module
//!
//! Core domain types and business logic.

pub mod amount;
pub mod context;
pub mod error;
pub mod events;
pub mod question;
pub mod scoring;

pub use amount::{Amount, AmountError, Balance};
pub use context::{require_admin, OperationContext, Principal, Role};
pub use error::DomainError;
pub use events::{AccountEvent, AssessmentEvent, SettlementOutcome, TransferEvent, TransferStatus};
pub use question::{NewQuestion, OptionTag, PublicQuestion, Question};
pub use scoring::{GradedAnswer, ScoreSummary, SubmittedAnswer};
