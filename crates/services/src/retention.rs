//! `RetentionJob` (spec.md §4.11): periodic TTL sweep per configured
//! rule, with a dry-run mode and one `RetentionAuditRecord` per
//! (table, run). Scheduling uses `tokio-cron-scheduler`, already a
//! teacher workspace dependency, in place of a hand-rolled ticker.

use chrono::{DateTime, Utc};
use memoire_config::{RetentionAction, RetentionRule};
use sqlx::postgres::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;
use uuid::Uuid;

use crate::dao::RetentionAuditDao;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionTrigger {
    Cron,
    Manual,
    Ci,
    Api,
}

impl RetentionTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            RetentionTrigger::Cron => "cron",
            RetentionTrigger::Manual => "manual",
            RetentionTrigger::Ci => "ci",
            RetentionTrigger::Api => "api",
        }
    }
}

pub struct RetentionJob {
    pool: PgPool,
    rules: Vec<RetentionRule>,
    environment: String,
}

impl RetentionJob {
    pub fn new(pool: PgPool, rules: Vec<RetentionRule>, environment: String) -> Self {
        Self {
            pool,
            rules,
            environment,
        }
    }

    /// Runs every configured rule once. Returns the job_run_id tying
    /// together the audit records this run wrote.
    pub async fn run_once(&self, trigger: RetentionTrigger, dry_run: bool) -> Uuid {
        let job_run_id = Uuid::new_v4();
        let audit = RetentionAuditDao::new(self.pool.clone());

        for rule in &self.rules {
            let started = std::time::Instant::now();
            let cutoff = Utc::now() - chrono::Duration::days(rule.age_days);

            let (record_count, rows_scanned, min_id, max_id) =
                match self.sweep_table(&rule.table, cutoff, dry_run).await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(table = %rule.table, error = %e, "retention sweep failed");
                        continue;
                    }
                };

            let duration_ms = started.elapsed().as_millis() as i64;

            let _ = audit
                .insert(
                    Uuid::new_v4(),
                    job_run_id,
                    &rule.table,
                    record_count,
                    rows_scanned,
                    min_id,
                    max_id,
                    rule_description(rule),
                    cutoff,
                    duration_ms,
                    "retention-job",
                    trigger.as_str(),
                    &self.environment,
                    dry_run,
                )
                .await;

            info!(
                table = %rule.table,
                record_count,
                dry_run,
                job_run_id = %job_run_id,
                "retention sweep complete"
            );
        }

        job_run_id
    }

    async fn sweep_table(
        &self,
        table: &str,
        cutoff: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<(i64, i64, Option<Uuid>, Option<Uuid>), sqlx::Error> {
        let scanned_sql = format!("SELECT COUNT(*) FROM {table} WHERE created_at < $1");
        let rows_scanned: (i64,) = sqlx::query_as(&scanned_sql)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;

        if dry_run {
            let sql = format!(
                "SELECT COUNT(*), MIN(id), MAX(id) FROM {table} WHERE created_at < $1"
            );
            let row: (i64, Option<Uuid>, Option<Uuid>) =
                sqlx::query_as(&sql).bind(cutoff).fetch_one(&self.pool).await?;
            return Ok((row.0, rows_scanned.0, row.1, row.2));
        }

        let sql = format!("DELETE FROM {table} WHERE created_at < $1 RETURNING id");
        let rows: Vec<(Uuid,)> = sqlx::query_as(&sql).bind(cutoff).fetch_all(&self.pool).await?;
        let count = rows.len() as i64;
        let min_id = rows.iter().map(|(id,)| *id).min();
        let max_id = rows.iter().map(|(id,)| *id).max();
        Ok((count, rows_scanned.0, min_id, max_id))
    }

    /// Wires this job onto a `tokio-cron-scheduler` cron expression
    /// (the teacher's workspace already depends on this crate).
    pub async fn schedule(
        self: std::sync::Arc<Self>,
        scheduler: &JobScheduler,
        cron_expr: &str,
    ) -> anyhow::Result<()> {
        let job_self = self.clone();
        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let job_self = job_self.clone();
            Box::pin(async move {
                job_self.run_once(RetentionTrigger::Cron, false).await;
            })
        })?;
        scheduler.add(job).await?;
        Ok(())
    }
}

fn rule_description(rule: &RetentionRule) -> &'static str {
    match rule.action {
        RetentionAction::Delete => "delete",
    }
}
