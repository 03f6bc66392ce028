//! Audit Log Service
//!
//! Tamper-evident audit logging with a SHA-256 hash chain. Entries are
//! appended inside the caller's transaction, so an audited mutation and its
//! audit record commit or roll back together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::OperationContext;

/// Hash preceding the first entry of the chain
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Advisory lock key serializing chain appends
const AUDIT_CHAIN_LOCK: i64 = 0x6175_6469_74;

// =========================================================================
// AuditLogService
// =========================================================================

/// Audit log entry for database storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub sequence_number: i64,
    pub actor_id: Option<Uuid>,
    pub correlation_id: Option<Uuid>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub after_state: Option<serde_json::Value>,
    pub previous_hash: String,
    pub current_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    TestSubmitted,
    TransferRequested,
    TransferCompleted,
    TransferFailed,
    BalanceAdjusted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TestSubmitted => "test.submitted",
            AuditAction::TransferRequested => "transfer.requested",
            AuditAction::TransferCompleted => "transfer.completed",
            AuditAction::TransferFailed => "transfer.failed",
            AuditAction::BalanceAdjusted => "balance.adjusted",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builder for creating audit log entries
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
    action: String,
    resource_type: Option<String>,
    resource_id: Option<Uuid>,
    after_state: Option<serde_json::Value>,
}

impl AuditLogBuilder {
    /// Create a new audit log builder
    pub fn new(action: AuditAction) -> Self {
        Self {
            action: action.as_str().to_string(),
            resource_type: None,
            resource_id: None,
            after_state: None,
        }
    }

    /// Set the resource type
    pub fn resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self
    }

    /// Set the resource ID
    pub fn resource_id(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Set the after state
    pub fn after_state<T: Serialize>(mut self, state: &T) -> Result<Self, AuditLogError> {
        self.after_state = Some(serde_json::to_value(state)?);
        Ok(self)
    }
}

/// Audit Log Service
#[derive(Debug, Clone)]
pub struct AuditLogService {
    pool: PgPool,
}

impl AuditLogService {
    /// Create a new AuditLogService
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Audit log write
    // =========================================================================

    /// Append an entry to the chain within an open transaction.
    pub async fn append(
        tx: &mut Transaction<'_, Postgres>,
        builder: AuditLogBuilder,
        context: &OperationContext,
    ) -> Result<Uuid, AuditLogError> {
        let id = Uuid::new_v4();
        let actor_id = Some(context.actor_id());

        // Held until the surrounding transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(AUDIT_CHAIN_LOCK)
            .execute(&mut **tx)
            .await?;

        let previous_hash: Option<String> = sqlx::query_scalar(
            "SELECT current_hash FROM audit_logs ORDER BY sequence_number DESC LIMIT 1",
        )
        .fetch_optional(&mut **tx)
        .await?;
        let previous_hash = previous_hash.unwrap_or_else(|| GENESIS_HASH.to_string());

        let current_hash = entry_hash(
            id,
            &builder.action,
            actor_id,
            builder.resource_type.as_deref(),
            builder.resource_id,
            builder.after_state.as_ref(),
            &previous_hash,
        );

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, actor_id, correlation_id, action, resource_type, resource_id,
                after_state, previous_hash, current_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(actor_id)
        .bind(context.correlation_id)
        .bind(&builder.action)
        .bind(&builder.resource_type)
        .bind(builder.resource_id)
        .bind(&builder.after_state)
        .bind(&previous_hash)
        .bind(&current_hash)
        .execute(&mut **tx)
        .await?;

        tracing::debug!(
            audit_id = %id,
            action = %builder.action,
            "Audit log entry appended"
        );

        Ok(id)
    }

    // =========================================================================
    // Audit log verification (hash chain)
    // =========================================================================

    /// Verify the integrity of the first `limit` entries of the chain
    pub async fn verify_hash_chain(
        &self,
        limit: Option<i64>,
    ) -> Result<ChainVerificationResult, AuditLogError> {
        let limit = limit.unwrap_or(1000);
        let entries = self.fetch(
            r#"
            SELECT id, sequence_number, actor_id, correlation_id, action, resource_type,
                   resource_id, after_state, previous_hash, current_hash, created_at
            FROM audit_logs
            ORDER BY sequence_number ASC
            LIMIT $1
            "#,
            limit,
        )
        .await?;

        Ok(verify_chain(&entries))
    }

    async fn fetch(&self, sql: &str, limit: i64) -> Result<Vec<AuditLogEntry>, AuditLogError> {
        let rows: Vec<(
            Uuid,
            i64,
            Option<Uuid>,
            Option<Uuid>,
            String,
            Option<String>,
            Option<Uuid>,
            Option<serde_json::Value>,
            String,
            String,
            DateTime<Utc>,
        )> = sqlx::query_as(sql).bind(limit).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    id,
                    sequence_number,
                    actor_id,
                    correlation_id,
                    action,
                    resource_type,
                    resource_id,
                    after_state,
                    previous_hash,
                    current_hash,
                    created_at,
                )| AuditLogEntry {
                    id,
                    sequence_number,
                    actor_id,
                    correlation_id,
                    action,
                    resource_type,
                    resource_id,
                    after_state,
                    previous_hash,
                    current_hash,
                    created_at,
                },
            )
            .collect())
    }
}

/// Result of hash chain verification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerificationResult {
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_entry: Option<Uuid>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

/// Walk entries in sequence order, re-computing every link.
pub fn verify_chain(entries: &[AuditLogEntry]) -> ChainVerificationResult {
    let mut previous_hash = GENESIS_HASH.to_string();

    for (checked, entry) in entries.iter().enumerate() {
        if entry.previous_hash != previous_hash {
            return ChainVerificationResult {
                is_valid: false,
                entries_checked: checked as u64 + 1,
                first_invalid_entry: Some(entry.id),
                expected_hash: Some(previous_hash),
                actual_hash: Some(entry.previous_hash.clone()),
            };
        }

        let calculated = entry_hash(
            entry.id,
            &entry.action,
            entry.actor_id,
            entry.resource_type.as_deref(),
            entry.resource_id,
            entry.after_state.as_ref(),
            &entry.previous_hash,
        );

        if calculated != entry.current_hash {
            return ChainVerificationResult {
                is_valid: false,
                entries_checked: checked as u64 + 1,
                first_invalid_entry: Some(entry.id),
                expected_hash: Some(calculated),
                actual_hash: Some(entry.current_hash.clone()),
            };
        }

        previous_hash = entry.current_hash.clone();
    }

    ChainVerificationResult {
        is_valid: true,
        entries_checked: entries.len() as u64,
        first_invalid_entry: None,
        expected_hash: None,
        actual_hash: None,
    }
}

/// Hash of one entry's content linked to its predecessor
fn entry_hash(
    id: Uuid,
    action: &str,
    actor_id: Option<Uuid>,
    resource_type: Option<&str>,
    resource_id: Option<Uuid>,
    after_state: Option<&serde_json::Value>,
    previous_hash: &str,
) -> String {
    let hash_input = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        id,
        action,
        actor_id.map(|u| u.to_string()).unwrap_or_default(),
        resource_type.unwrap_or_default(),
        resource_id.map(|u| u.to_string()).unwrap_or_default(),
        after_state.map(|v| v.to_string()).unwrap_or_default(),
        previous_hash
    );

    sha256_hex(&hash_input)
}

/// Calculate SHA-256 hash and return as hex string
pub fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Audit log errors
#[derive(Debug, thiserror::Error)]
pub enum AuditLogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(len: usize) -> Vec<AuditLogEntry> {
        let mut previous = GENESIS_HASH.to_string();
        (0..len)
            .map(|i| {
                let id = Uuid::new_v4();
                let actor = Some(Uuid::new_v4());
                let state = json!({ "amount": "50.00", "index": i });
                let current = entry_hash(
                    id,
                    "transfer.completed",
                    actor,
                    Some("Transfer"),
                    None,
                    Some(&state),
                    &previous,
                );
                let entry = AuditLogEntry {
                    id,
                    sequence_number: i as i64 + 1,
                    actor_id: actor,
                    correlation_id: None,
                    action: "transfer.completed".to_string(),
                    resource_type: Some("Transfer".to_string()),
                    resource_id: None,
                    after_state: Some(state),
                    previous_hash: previous.clone(),
                    current_hash: current.clone(),
                    created_at: Utc::now(),
                };
                previous = current;
                entry
            })
            .collect()
    }

    #[test]
    fn test_audit_action_as_str() {
        assert_eq!(AuditAction::TestSubmitted.as_str(), "test.submitted");
        assert_eq!(AuditAction::TransferCompleted.as_str(), "transfer.completed");
        assert_eq!(AuditAction::BalanceAdjusted.as_str(), "balance.adjusted");
    }

    #[test]
    fn test_audit_log_builder() {
        let resource = Uuid::new_v4();
        let builder = AuditLogBuilder::new(AuditAction::TransferRequested)
            .resource_type("Transfer")
            .resource_id(resource)
            .after_state(&json!({ "status": "pending" }))
            .unwrap();

        assert_eq!(builder.action, "transfer.requested");
        assert_eq!(builder.resource_type, Some("Transfer".to_string()));
        assert_eq!(builder.resource_id, Some(resource));
        assert!(builder.after_state.is_some());
    }

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test input");
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_intact_chain_verifies() {
        let entries = chain(5);
        let result = verify_chain(&entries);
        assert!(result.is_valid);
        assert_eq!(result.entries_checked, 5);
    }

    #[test]
    fn test_empty_chain_verifies() {
        let result = verify_chain(&[]);
        assert!(result.is_valid);
        assert_eq!(result.entries_checked, 0);
    }

    #[test]
    fn test_tampered_state_detected() {
        let mut entries = chain(4);
        entries[2].after_state = Some(json!({ "amount": "5000.00", "index": 2 }));

        let result = verify_chain(&entries);
        assert!(!result.is_valid);
        assert_eq!(result.first_invalid_entry, Some(entries[2].id));
        assert_eq!(result.entries_checked, 3);
    }

    #[test]
    fn test_removed_entry_detected() {
        let mut entries = chain(4);
        entries.remove(1);

        let result = verify_chain(&entries);
        assert!(!result.is_valid);
        assert_eq!(result.first_invalid_entry, Some(entries[1].id));
    }
}
