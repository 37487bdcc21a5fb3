//! `RetentionJob` scenarios (spec.md §4.11): rule-driven sweep, one
//! audit record per (table, run), dry-run mode writes the audit record
//! without deleting anything.

use chrono::{Duration as ChronoDuration, Utc};
use memoire_config::{RetentionAction, RetentionRule};
use memoire_services::retention::{RetentionJob, RetentionTrigger};
use uuid::Uuid;

use crate::fixtures::test_app::TestApp;

/// Inserts an `integrity_events` row with an explicit `created_at`,
/// bypassing the hash chain (these rows exist only to give the sweep
/// something to count/delete — no FK constraints reference this table).
async fn seed_event(pool: &sqlx::PgPool, segment_id: Uuid, age_days: i64) -> Uuid {
    let id = Uuid::new_v4();
    let created_at = Utc::now() - ChronoDuration::days(age_days);
    sqlx::query(
        "INSERT INTO integrity_events (id, segment_id, stage, content_hash, prev_hash, metadata, created_at)
         VALUES ($1, $2, 'ingest_received', 'deadbeef', NULL, '{}', $3)",
    )
    .bind(id)
    .bind(segment_id)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("seed integrity event");
    id
}

fn rule() -> RetentionRule {
    RetentionRule {
        table: "integrity_events".to_string(),
        age_days: 30,
        action: RetentionAction::Delete,
    }
}

#[tokio::test]
async fn sweep_deletes_only_rows_older_than_the_cutoff() {
    let app = TestApp::spawn().await;
    let old_id = seed_event(&app.pool, Uuid::new_v4(), 60).await;
    let recent_id = seed_event(&app.pool, Uuid::new_v4(), 1).await;

    let job = RetentionJob::new(app.pool.clone(), vec![rule()], "test".to_string());
    let job_run_id = job.run_once(RetentionTrigger::Manual, false).await;

    let old_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM integrity_events WHERE id = $1)")
        .bind(old_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let recent_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM integrity_events WHERE id = $1)")
        .bind(recent_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(!old_exists, "the 60-day-old row should be swept");
    assert!(recent_exists, "the 1-day-old row should survive a 30-day cutoff");

    let audit_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM retention_audit_records WHERE job_run_id = $1 AND table_name = 'integrity_events'",
    )
    .bind(job_run_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(audit_count, 1, "exactly one audit record per (table, run)");

    let record_count: i64 = sqlx::query_scalar(
        "SELECT record_count FROM retention_audit_records WHERE job_run_id = $1",
    )
    .bind(job_run_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(record_count, 1);
}

#[tokio::test]
async fn dry_run_writes_audit_but_deletes_nothing() {
    let app = TestApp::spawn().await;
    let old_id = seed_event(&app.pool, Uuid::new_v4(), 60).await;

    let job = RetentionJob::new(app.pool.clone(), vec![rule()], "test".to_string());
    let job_run_id = job.run_once(RetentionTrigger::Manual, true).await;

    let still_there: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM integrity_events WHERE id = $1)")
        .bind(old_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(still_there, "dry run must not delete rows");

    let (record_count, dry_run): (i64, bool) = sqlx::query_as(
        "SELECT record_count, dry_run FROM retention_audit_records WHERE job_run_id = $1",
    )
    .bind(job_run_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(record_count, 1, "dry run still reports what it would have deleted");
    assert!(dry_run);
}
