//! Assessment scoring
//!
//! Pure functions that grade submitted answers against the answer key and
//! derive the published aptitude ("IQ") score from the percentage correct.
//! All arithmetic is decimal-exact so identical input always yields the
//! identical score.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use uuid::Uuid;

use super::question::OptionTag;

/// One answer as submitted by the test taker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    /// Selected option tag; empty means unanswered
    pub selected: String,
}

/// One graded entry of the answer trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub selected: String,
    pub is_correct: bool,
}

/// Aggregate outcome of grading a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct_count: i32,
    pub total_questions: i32,
    pub percentage: Decimal,
    pub iq_score: i32,
    pub answers: Vec<GradedAnswer>,
}

impl ScoreSummary {
    /// Percentage rounded to the nearest integer for display
    pub fn display_percentage(&self) -> i32 {
        display_percentage(self.percentage)
    }
}

/// A single band of the derived-score schedule:
/// `base + floor((p - lower) * slope)` for `p >= lower`.
struct Band {
    lower: Decimal,
    base: i32,
    slope: Decimal,
}

/// Bands ordered top-down; the first band whose lower bound is reached wins.
fn bands() -> [Band; 5] {
    [
        Band { lower: Decimal::from(90), base: 130, slope: Decimal::from(2) },
        Band { lower: Decimal::from(75), base: 115, slope: Decimal::ONE },
        Band { lower: Decimal::from(50), base: 100, slope: Decimal::new(6, 1) },
        Band { lower: Decimal::from(25), base: 85, slope: Decimal::new(6, 1) },
        Band { lower: Decimal::ZERO, base: 70, slope: Decimal::new(6, 1) },
    ]
}

/// Percentage of correct answers, using the submitted count as denominator.
///
/// Returns zero for an empty submission.
pub fn percentage(correct: i32, total: i32) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    Decimal::from(correct) * Decimal::ONE_HUNDRED / Decimal::from(total)
}

/// Map a percentage in [0, 100] to the derived score.
pub fn derived_score(percentage: Decimal) -> i32 {
    let p = percentage.max(Decimal::ZERO);
    for band in bands() {
        if p >= band.lower {
            let step = ((p - band.lower) * band.slope).floor();
            return band.base + step.to_i32().unwrap_or(0);
        }
    }
    // Unreachable for p >= 0; the lowest band starts at zero.
    70
}

/// Round a percentage half away from zero.
pub fn display_percentage(percentage: Decimal) -> i32 {
    percentage
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
        .unwrap_or(0)
}

/// Whether a selected option matches the key. Case-sensitive; an empty
/// selection or an unknown question is always incorrect.
pub fn is_correct(selected: &str, key: Option<OptionTag>) -> bool {
    match key {
        Some(tag) => !selected.is_empty() && selected == tag.as_str(),
        None => false,
    }
}

/// Grade a submission against the answer key.
///
/// Every submitted answer produces exactly one graded entry, in submission
/// order, so the trail length always equals `total_questions`.
pub fn grade(answers: &[SubmittedAnswer], key: &HashMap<Uuid, OptionTag>) -> ScoreSummary {
    let graded: Vec<GradedAnswer> = answers
        .iter()
        .map(|answer| GradedAnswer {
            question_id: answer.question_id,
            selected: answer.selected.clone(),
            is_correct: is_correct(&answer.selected, key.get(&answer.question_id).copied()),
        })
        .collect();

    let total_questions = graded.len() as i32;
    let correct_count = graded.iter().filter(|a| a.is_correct).count() as i32;
    let percentage = percentage(correct_count, total_questions);

    ScoreSummary {
        correct_count,
        total_questions,
        percentage,
        iq_score: derived_score(percentage),
        answers: graded,
    }
}
