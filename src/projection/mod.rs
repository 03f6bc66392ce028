//! Projection module
//!
//! Read side: query-shaped views over the stored results, users and
//! transfers. Nothing here mutates state.

mod service;

pub use service::{
    AnswerDetailView, BalanceView, Direction, ReadModel, ResultDetailView, StatsView,
    TestResultView, TransferView, UserDetailView, UserSearchView, UserView,
};
