//! Aggregate module
//!
//! Aggregates validate commands against their current state and emit the
//! events that describe the resulting change.

pub mod account;
pub mod transfer;

pub use account::Account;
pub use transfer::{Settlement, Transfer};

/// Aggregate trait that all aggregates implement
pub trait Aggregate: Sized {
    /// The type of events this aggregate handles
    type Event;

    /// Get the aggregate type name (for audit records)
    fn aggregate_type() -> &'static str;

    /// Get the aggregate ID
    fn id(&self) -> uuid::Uuid;

    /// Apply an event to update the aggregate state
    fn apply(self, event: Self::Event) -> Self;
}
