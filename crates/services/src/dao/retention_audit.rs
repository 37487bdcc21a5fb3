use chrono::{DateTime, Utc};
use memoire_db::RetentionAuditRecord;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::base::DaoResult;

#[derive(Clone)]
pub struct RetentionAuditDao {
    pool: PgPool,
}

impl RetentionAuditDao {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        id: Uuid,
        job_run_id: Uuid,
        table_name: &str,
        record_count: i64,
        rows_scanned: i64,
        min_deleted_id: Option<Uuid>,
        max_deleted_id: Option<Uuid>,
        rule: &str,
        cutoff: DateTime<Utc>,
        duration_ms: i64,
        actor: &str,
        trigger: &str,
        environment: &str,
        dry_run: bool,
    ) -> DaoResult<RetentionAuditRecord> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO retention_audit_records
                (id, job_run_id, table_name, record_count, rows_scanned, min_deleted_id,
                 max_deleted_id, rule, cutoff, duration_ms, actor, trigger, environment, dry_run)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(job_run_id)
        .bind(table_name)
        .bind(record_count)
        .bind(rows_scanned)
        .bind(min_deleted_id)
        .bind(max_deleted_id)
        .bind(rule)
        .bind(cutoff)
        .bind(duration_ms)
        .bind(actor)
        .bind(trigger)
        .bind(environment)
        .bind(dry_run)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn for_job_run(&self, job_run_id: Uuid) -> DaoResult<Vec<RetentionAuditRecord>> {
        Ok(
            sqlx::query_as("SELECT * FROM retention_audit_records WHERE job_run_id = $1")
                .bind(job_run_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
