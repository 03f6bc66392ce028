//! Submit Test Handler
//!
//! Grades an assessment attempt and stores the result with its full answer
//! trail in a single transaction.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogBuilder, AuditLogService};
use crate::domain::scoring;
use crate::domain::{AssessmentEvent, DomainError, OperationContext};
use crate::error::AppError;
use crate::question_store::QuestionStore;

use super::{SubmitTestCommand, SubmitTestResult};

// =========================================================================
// SubmitTestHandler
// =========================================================================

/// Handler for assessment submissions
pub struct SubmitTestHandler {
    questions: QuestionStore,
    pool: PgPool,
}

impl SubmitTestHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            questions: QuestionStore::new(pool.clone()),
            pool,
        }
    }

    /// Grade the submission for the calling user and persist it.
    ///
    /// The result row and every answer row commit together or not at all.
    pub async fn execute(
        &self,
        command: SubmitTestCommand,
        context: &OperationContext,
    ) -> Result<SubmitTestResult, AppError> {
        if command.answers.is_empty() {
            return Err(DomainError::InvalidInput("answers are required".to_string()).into());
        }

        let user_id = context.actor_id();

        let question_ids: Vec<Uuid> = command.answers.iter().map(|a| a.question_id).collect();
        let key = self.questions.correct_answers(&question_ids).await?;

        let summary = scoring::grade(&command.answers, &key);

        let result_id = Uuid::new_v4();
        let completed_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO test_results (id, user_id, score, total_questions, iq_score, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(result_id)
        .bind(user_id)
        .bind(summary.correct_count)
        .bind(summary.total_questions)
        .bind(summary.iq_score)
        .bind(completed_at)
        .execute(&mut *tx)
        .await?;

        for (position, answer) in summary.answers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO user_answers (
                    id, test_result_id, position, question_id, selected_answer, is_correct
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(result_id)
            .bind(position as i32)
            .bind(answer.question_id)
            .bind(&answer.selected)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        let event = AssessmentEvent::TestSubmitted {
            result_id,
            user_id,
            score: summary.correct_count,
            total_questions: summary.total_questions,
            iq_score: summary.iq_score,
            submitted_at: completed_at,
        };

        let audit = AuditLogBuilder::new(AuditAction::TestSubmitted)
            .resource_type("TestResult")
            .resource_id(result_id)
            .after_state(&event)?;
        AuditLogService::append(&mut tx, audit, context).await?;

        tx.commit().await?;

        tracing::info!(
            result_id = %result_id,
            user_id = %user_id,
            score = summary.correct_count,
            total = summary.total_questions,
            iq_score = summary.iq_score,
            "Test submitted"
        );

        Ok(SubmitTestResult {
            id: result_id,
            score: summary.correct_count,
            total_questions: summary.total_questions,
            iq_score: summary.iq_score,
            percentage: summary.display_percentage(),
        })
    }
}
