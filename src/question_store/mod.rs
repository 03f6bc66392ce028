//! Question store module
//!
//! Catalog of assessment items. Serves random, key-free samples and the
//! answer key used at grading time.

mod repository;

pub use repository::{sample_from, QuestionStore};
