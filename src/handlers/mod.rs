//! Command Handlers module
//!
//! Handlers that orchestrate state-changing operations.
//! Each handler validates, runs the domain rules, and persists the outcome
//! together with its audit entry in one transaction.

mod adjust_balance_handler;
mod commands;
mod submit_test_handler;
mod transfer_handler;
mod user_handler;


pub use adjust_balance_handler::AdjustBalanceHandler;
pub use commands::*;
pub use submit_test_handler::SubmitTestHandler;
pub use transfer_handler::{RequestTransferHandler, SettleTransferHandler};
pub use user_handler::UserDirectory;
