//! aptitude_ledger Library
//!
//! Aptitude assessment scoring and an admin-settled transfer ledger.
//! Re-exports modules for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod audit;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod projection;
pub mod question_store;

mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext};
pub use domain::{AccountEvent, AssessmentEvent, TransferEvent};
pub use error::{AppError, AppResult, ErrorResponse};
