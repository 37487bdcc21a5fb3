use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audit record per (table, job run) produced by a `RetentionJob`
/// sweep (spec.md §4.11). Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RetentionAuditRecord {
    pub id: Uuid,
    pub job_run_id: Uuid,
    pub table_name: String,
    pub record_count: i64,
    pub rows_scanned: i64,
    pub min_deleted_id: Option<Uuid>,
    pub max_deleted_id: Option<Uuid>,
    pub rule: String,
    pub cutoff: DateTime<Utc>,
    pub duration_ms: i64,
    pub actor: String,
    pub trigger: String,
    pub environment: String,
    pub dry_run: bool,
    pub created_at: DateTime<Utc>,
}

impl RetentionAuditRecord {
    pub const TABLE: &'static str = "retention_audit_records";
}

/// Where a `RetentionJob` run was invoked from (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionTrigger {
    Cron,
    Manual,
    Ci,
    Api,
}

impl RetentionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionTrigger::Cron => "cron",
            RetentionTrigger::Manual => "manual",
            RetentionTrigger::Ci => "ci",
            RetentionTrigger::Api => "api",
        }
    }
}
