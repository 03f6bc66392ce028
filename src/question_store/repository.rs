//! Question Repository
//!
//! Postgres-backed catalog access.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DomainError, NewQuestion, OptionTag, PublicQuestion, Question};
use crate::error::AppError;

type QuestionRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i32,
);

/// Repository over the `questions` table
#[derive(Debug, Clone)]
pub struct QuestionStore {
    pool: PgPool,
}

impl QuestionStore {
    /// Create a new QuestionStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // QuestionStore::sample()
    // =========================================================================

    /// Draw up to `size` distinct questions, answer keys stripped.
    ///
    /// Returns fewer than `size` when the catalog is smaller and fails with
    /// `EmptyPool` when it has nothing at all.
    pub async fn sample(&self, size: usize) -> Result<Vec<PublicQuestion>, AppError> {
        let all = self.all().await?;
        if all.is_empty() {
            return Err(DomainError::EmptyPool.into());
        }

        let picked = sample_from(all, size, &mut rand::thread_rng());

        tracing::debug!(requested = size, served = picked.len(), "Question sample drawn");

        Ok(picked.iter().map(Question::to_public).collect())
    }

    /// Answer key for the given ids; unknown ids are simply absent.
    pub async fn correct_answers(
        &self,
        question_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, OptionTag>, AppError> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, correct_answer FROM questions WHERE id = ANY($1)")
                .bind(question_ids)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, key)| {
                key.parse::<OptionTag>()
                    .map(|tag| (id, tag))
                    .map_err(|e| AppError::Internal(format!("corrupt answer key for {}: {}", id, e)))
            })
            .collect()
    }

    /// Add a catalog item
    pub async fn insert(&self, question: NewQuestion) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        let [option_a, option_b, option_c, option_d] = question.options;

        sqlx::query(
            r#"
            INSERT INTO questions (
                id, question_text, option_a, option_b, option_c, option_d,
                correct_answer, image_url, difficulty
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&question.question_text)
        .bind(option_a)
        .bind(option_b)
        .bind(option_c)
        .bind(option_d)
        .bind(question.correct_answer.as_str())
        .bind(&question.image_url)
        .bind(question.difficulty)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn all(&self) -> Result<Vec<Question>, AppError> {
        let rows: Vec<QuestionRow> = sqlx::query_as(
            r#"
            SELECT id, question_text, option_a, option_b, option_c, option_d,
                   correct_answer, image_url, difficulty
            FROM questions
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_question).collect()
    }
}

fn row_to_question(row: QuestionRow) -> Result<Question, AppError> {
    let (id, question_text, a, b, c, d, key, image_url, difficulty) = row;
    let correct_answer = key
        .parse::<OptionTag>()
        .map_err(|e| AppError::Internal(format!("corrupt answer key for {}: {}", id, e)))?;

    Ok(Question {
        id,
        question_text,
        options: [a, b, c, d],
        correct_answer,
        image_url,
        difficulty,
    })
}

/// Uniform sample without replacement of at most `size` items.
pub fn sample_from<T, R: Rng + ?Sized>(mut items: Vec<T>, size: usize, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items.truncate(size);
    items
}
