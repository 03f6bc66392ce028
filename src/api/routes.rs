//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditLogService, ChainVerificationResult};
use crate::domain::amount::parse_decimal;
use crate::domain::{require_admin, DomainError, OperationContext, PublicQuestion, SubmittedAnswer};
use crate::error::AppError;
use crate::handlers::{
    AdjustBalanceCommand, AdjustBalanceHandler, RequestTransferCommand, RequestTransferHandler,
    SettleTransferCommand, SettleTransferHandler, SubmitTestCommand, SubmitTestHandler,
};
use crate::projection::{
    BalanceView, ReadModel, ResultDetailView, StatsView, TestResultView, TransferView,
    UserDetailView, UserSearchView, UserView,
};
use crate::question_store::QuestionStore;

use super::AppState;

// =========================================================================
// Request types
// =========================================================================

/// JSON body extractor whose rejections render as `AppError`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as `AppError`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor whose rejections render as `AppError`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    #[serde(default)]
    pub answers: Option<Vec<AnswerRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    /// Kept raw; ids that are not UUIDs are graded as unknown questions
    #[serde(default)]
    pub question_id: Value,
    /// Missing and `null` both mean unanswered
    #[serde(default)]
    pub selected_answer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub receiver_id: Uuid,
    /// JSON number or decimal string
    pub amount: Value,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    #[serde(default)]
    pub amount: Value,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub limit: Option<i64>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Assessment
        .route("/test/questions", get(get_questions))
        .route("/test/submit", post(submit_test))
        .route("/test/history", get(get_test_history))
        .route("/test/result/:id", get(get_test_result))
        // Ledger
        .route("/transactions/transfer", post(request_transfer))
        .route("/transactions/balance", get(get_balance))
        .route("/transactions/history", get(get_transfer_history))
        .route("/transactions/users/search", get(search_users))
        .route("/transactions/admin/all", get(get_all_transfers))
        .route("/transactions/admin/:id/status", patch(settle_transfer))
        // Admin control plane
        .route("/admin/users", get(get_users))
        .route("/admin/users/:id", get(get_user_detail))
        .route("/admin/users/:id/balance", patch(adjust_balance))
        .route("/admin/stats", get(get_stats))
        .route("/admin/audit/verify", get(verify_audit_chain))
}

// =========================================================================
// Assessment endpoints
// =========================================================================

/// GET /test/questions
async fn get_questions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicQuestion>>, AppError> {
    let questions = QuestionStore::new(state.pool)
        .sample(state.question_sample_size)
        .await?;

    Ok(Json(questions))
}

/// POST /test/submit
async fn submit_test(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<SubmitTestRequest>,
) -> Result<Json<Value>, AppError> {
    let answers = submitted_answers(request)?;

    let result = SubmitTestHandler::new(pool)
        .execute(SubmitTestCommand::new(answers), &context)
        .await?;

    Ok(Json(json!({
        "message": "Test submitted successfully",
        "result": result,
    })))
}

/// GET /test/history
async fn get_test_history(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<TestResultView>>, AppError> {
    let history = ReadModel::new(pool).test_history(context.actor_id()).await?;
    Ok(Json(history))
}

/// GET /test/result/:id
async fn get_test_result(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiPath(result_id): ApiPath<Uuid>,
) -> Result<Json<ResultDetailView>, AppError> {
    let detail = ReadModel::new(pool)
        .result_detail(result_id, &context.principal)
        .await?;
    Ok(Json(detail))
}

// =========================================================================
// Ledger endpoints
// =========================================================================

/// POST /transactions/transfer
async fn request_transfer(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let amount = amount_text(&request.amount)?;

    let transfer = RequestTransferHandler::new(pool)
        .execute(RequestTransferCommand::new(request.receiver_id, amount), &context)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Transfer requested",
            "transfer": transfer,
        })),
    ))
}

/// GET /transactions/balance
async fn get_balance(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<BalanceView>, AppError> {
    let balance = ReadModel::new(pool).balance(context.actor_id()).await?;
    Ok(Json(balance))
}

/// GET /transactions/history
async fn get_transfer_history(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<TransferView>>, AppError> {
    let history = ReadModel::new(pool)
        .transfer_history(context.actor_id())
        .await?;
    Ok(Json(history))
}

/// GET /transactions/users/search?q=
async fn search_users(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<UserSearchView>>, AppError> {
    let users = ReadModel::new(pool)
        .search_users(&query.q, context.actor_id())
        .await?;
    Ok(Json(users))
}

/// GET /transactions/admin/all
async fn get_all_transfers(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<TransferView>>, AppError> {
    require_admin(&context.principal)?;
    let transfers = ReadModel::new(pool).transfers().await?;
    Ok(Json(transfers))
}

/// PATCH /transactions/admin/:id/status
async fn settle_transfer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiPath(transfer_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<SettleRequest>,
) -> Result<Json<Value>, AppError> {
    let result = SettleTransferHandler::new(state.pool, state.allow_overdraft)
        .execute(SettleTransferCommand::new(transfer_id, request.status), &context)
        .await?;

    Ok(Json(json!({
        "message": "Transfer status updated",
        "transfer": result,
    })))
}

// =========================================================================
// Admin endpoints
// =========================================================================

/// GET /admin/users
async fn get_users(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<Vec<UserView>>, AppError> {
    require_admin(&context.principal)?;
    let users = ReadModel::new(pool).users().await?;
    Ok(Json(users))
}

/// GET /admin/users/:id
async fn get_user_detail(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<UserDetailView>, AppError> {
    require_admin(&context.principal)?;
    let user = ReadModel::new(pool).user_detail(user_id).await?;
    Ok(Json(user))
}

/// PATCH /admin/users/:id/balance
async fn adjust_balance(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AdjustBalanceRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&context.principal)?;
    let new_balance = numeric_amount(&request.amount)?;

    let result = AdjustBalanceHandler::new(pool)
        .execute(AdjustBalanceCommand::new(user_id, new_balance), &context)
        .await?;

    Ok(Json(json!({
        "message": "Balance updated",
        "user": result,
    })))
}

/// GET /admin/stats
async fn get_stats(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<StatsView>, AppError> {
    require_admin(&context.principal)?;
    let stats = ReadModel::new(pool).stats().await?;
    Ok(Json(stats))
}

/// GET /admin/audit/verify
async fn verify_audit_chain(
    State(pool): State<PgPool>,
    Extension(context): Extension<OperationContext>,
    ApiQuery(query): ApiQuery<VerifyQuery>,
) -> Result<Json<ChainVerificationResult>, AppError> {
    require_admin(&context.principal)?;
    let result = AuditLogService::new(pool)
        .verify_hash_chain(query.limit)
        .await?;

    if !result.is_valid {
        tracing::error!(
            first_invalid_entry = ?result.first_invalid_entry,
            "Audit chain verification failed"
        );
    }

    Ok(Json(result))
}

// =========================================================================
// Body helpers
// =========================================================================

fn submitted_answers(request: SubmitTestRequest) -> Result<Vec<SubmittedAnswer>, AppError> {
    let answers = request.answers.unwrap_or_default();
    if answers.is_empty() {
        return Err(AppError::InvalidRequest("answers are required".to_string()));
    }

    Ok(answers
        .into_iter()
        .map(|a| SubmittedAnswer {
            question_id: question_ref(&a.question_id),
            selected: a.selected_answer.unwrap_or_default(),
        })
        .collect())
}

/// Question ids that are not UUID strings map to the nil id, which no
/// stored question carries.
fn question_ref(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::nil)
}

/// Transfer amounts may arrive as a JSON number or a decimal string.
fn amount_text(value: &Value) -> Result<String, AppError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(DomainError::InvalidAmount("amount must be a number".to_string()).into()),
    }
}

/// Balance overrides accept JSON numbers only.
fn numeric_amount(value: &Value) -> Result<Decimal, AppError> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string())
            .map_err(|e| DomainError::from(e).into()),
        _ => Err(DomainError::InvalidAmount("amount must be a number".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_submit_request_deserialize() {
        let json = r#"{
            "answers": [
                {"questionId": "550e8400-e29b-41d4-a716-446655440000", "selectedAnswer": "B"},
                {"questionId": "550e8400-e29b-41d4-a716-446655440001", "selectedAnswer": null},
                {"questionId": "550e8400-e29b-41d4-a716-446655440002"}
            ]
        }"#;

        let request: SubmitTestRequest = serde_json::from_str(json).unwrap();
        let answers = submitted_answers(request).unwrap();

        assert_eq!(answers.len(), 3);
        assert_eq!(answers[0].selected, "B");
        assert_eq!(answers[1].selected, "");
        assert_eq!(answers[2].selected, "");
    }

    #[test]
    fn test_non_uuid_question_ids_do_not_reject_submission() {
        let json = r#"{
            "answers": [
                {"questionId": 999, "selectedAnswer": "A"},
                {"questionId": "q-17", "selectedAnswer": "B"},
                {"selectedAnswer": "C"},
                {"questionId": "550e8400-e29b-41d4-a716-446655440000", "selectedAnswer": "D"}
            ]
        }"#;

        let request: SubmitTestRequest = serde_json::from_str(json).unwrap();
        let answers = submitted_answers(request).unwrap();

        assert_eq!(answers.len(), 4);
        assert!(answers[..3].iter().all(|a| a.question_id.is_nil()));
        assert_eq!(
            answers[3].question_id.to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_submit_request_requires_answers() {
        let missing: SubmitTestRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(submitted_answers(missing), Err(AppError::InvalidRequest(_))));

        let empty: SubmitTestRequest = serde_json::from_str(r#"{"answers": []}"#).unwrap();
        assert!(matches!(submitted_answers(empty), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_transfer_request_accepts_number_or_string() {
        let json = r#"{"receiverId": "550e8400-e29b-41d4-a716-446655440002", "amount": 50}"#;
        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(amount_text(&request.amount).unwrap(), "50");

        let json = r#"{"receiverId": "550e8400-e29b-41d4-a716-446655440002", "amount": "12.50"}"#;
        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(amount_text(&request.amount).unwrap(), "12.50");

        assert!(amount_text(&json!(true)).is_err());
    }

    #[test]
    fn test_adjust_balance_requires_number() {
        assert_eq!(numeric_amount(&json!(250.5)).unwrap(), dec!(250.5));
        assert_eq!(numeric_amount(&json!(0)).unwrap(), dec!(0));
        assert!(numeric_amount(&json!("250")).is_err());
        assert!(numeric_amount(&Value::Null).is_err());
    }
}
