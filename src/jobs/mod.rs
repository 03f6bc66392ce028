//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance: audit chain verification and
//! reporting of transfers left pending too long.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;
use uuid::Uuid;

use crate::audit::{AuditLogError, AuditLogService};

// =========================================================================
// Audit Chain Verification Job
// =========================================================================

/// Re-verify the audit hash chain; returns whether it is intact.
pub async fn verify_audit_chain(pool: &PgPool, limit: i64) -> Result<bool, JobError> {
    let result = AuditLogService::new(pool.clone())
        .verify_hash_chain(Some(limit))
        .await?;

    if result.is_valid {
        tracing::debug!(entries_checked = result.entries_checked, "Audit chain intact");
    } else {
        tracing::error!(
            entries_checked = result.entries_checked,
            first_invalid_entry = ?result.first_invalid_entry,
            expected_hash = ?result.expected_hash,
            actual_hash = ?result.actual_hash,
            "Audit chain tampering detected"
        );
    }

    Ok(result.is_valid)
}

// =========================================================================
// Stale Pending Transfer Report
// =========================================================================

/// Transfers still pending after `max_age`; they are logged, never changed.
pub async fn report_stale_transfers(
    pool: &PgPool,
    max_age: ChronoDuration,
) -> Result<Vec<Uuid>, JobError> {
    let cutoff = stale_cutoff(Utc::now(), max_age);

    let stale: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM transfers
        WHERE status = 'pending' AND created_at < $1
        ORDER BY created_at
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    if !stale.is_empty() {
        tracing::warn!(
            count = stale.len(),
            older_than = %cutoff,
            "Transfers awaiting settlement"
        );
    }

    Ok(stale)
}

fn stale_cutoff(now: DateTime<Utc>, max_age: ChronoDuration) -> DateTime<Utc> {
    now.checked_sub_signed(max_age).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for audit chain verification (default: 1 hour)
    pub audit_verification_interval: Duration,
    /// Entries checked per verification run
    pub audit_verification_limit: i64,
    /// Interval for the stale transfer report (default: 15 minutes)
    pub stale_transfer_interval: Duration,
    /// Age after which a pending transfer is reported
    pub stale_transfer_age: ChronoDuration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            audit_verification_interval: Duration::from_secs(3600),
            audit_verification_limit: 10_000,
            stale_transfer_interval: Duration::from_secs(900),
            stale_transfer_age: ChronoDuration::hours(24),
        }
    }
}

impl JobSchedulerConfig {
    pub fn with_stale_transfer_hours(mut self, hours: i64) -> Self {
        self.stale_transfer_age = ChronoDuration::hours(hours);
        self
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut audit_interval = interval(self.config.audit_verification_interval);
        let mut stale_interval = interval(self.config.stale_transfer_interval);

        loop {
            tokio::select! {
                _ = audit_interval.tick() => {
                    if let Err(e) = verify_audit_chain(&self.pool, self.config.audit_verification_limit).await {
                        tracing::error!(error = %e, "Audit chain verification failed");
                    }
                }
                _ = stale_interval.tick() => {
                    if let Err(e) = report_stale_transfers(&self.pool, self.config.stale_transfer_age).await {
                        tracing::error!(error = %e, "Stale transfer report failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match verify_audit_chain(&self.pool, self.config.audit_verification_limit).await {
            Ok(valid) => report.audit_chain_valid = Some(valid),
            Err(e) => report.errors.push(format!("Audit verification: {}", e)),
        }

        match report_stale_transfers(&self.pool, self.config.stale_transfer_age).await {
            Ok(ids) => report.stale_transfers = ids,
            Err(e) => report.errors.push(format!("Stale transfer report: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    /// `None` when verification could not run
    pub audit_chain_valid: Option<bool>,
    pub stale_transfers: Vec<Uuid>,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditLogError),
}

// =========================================================================
// Tests
// =========================================================================
