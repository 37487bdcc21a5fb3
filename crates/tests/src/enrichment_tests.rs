//! `EnrichmentWorker` scenarios (spec.md §4.9, §8 property 7, §6
//! `/enrichment/{segment_id}`). Enrichment runs on a detached background
//! task after the client response is already sent, so these tests poll
//! the DB / the lookup endpoint rather than awaiting a synchronous call.

use std::time::Duration;

use memoire_services::enrichment::EnrichmentOutput;
use uuid::Uuid;

use crate::fixtures::stub_asr::meaningful_result;
use crate::fixtures::stub_enrichment::sample_output;
use crate::fixtures::test_app::TestApp;
use crate::fixtures::wav_gen;

async fn poll_until<F, Fut>(mut check: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn successful_enrichment_is_reachable_via_the_lookup_endpoint() {
    let app = TestApp::spawn().await;
    app.asr_backend
        .push_result(meaningful_result("Нужно позвонить Ивану завтра в три."))
        .await;
    app.enrichment_backend.push(Ok(sample_output())).await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;
    assert_eq!(messages.last().unwrap()["type"], "transcription");

    let found = poll_until(
        || async {
            let (status, _) = app.get_json(&format!("/enrichment/{segment_id}")).await;
            status == 200
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(found, "enrichment should complete and become visible");

    let (status, body) = app.get_json(&format!("/enrichment/{segment_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["event"]["domains"].as_array().unwrap()[0], "work");

    let enriched_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM integrity_events WHERE segment_id = $1 AND stage = 'enriched'",
    )
    .bind(segment_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(enriched_count, 1);
}

#[tokio::test]
async fn unenriched_segment_returns_404() {
    let app = TestApp::spawn().await;
    app.asr_backend
        .push_result(meaningful_result("Короткая фраза без обогащения пока что."))
        .await;
    // No enrichment result queued: the stub backend returns a permanent
    // error on the first (and only) attempt, so no StructuredEvent is
    // ever written (spec.md §4.9 "On final failure: no StructuredEvent
    // is written").

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;
    assert_eq!(messages.last().unwrap()["type"], "transcription");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let (status, _) = app.get_json(&format!("/enrichment/{segment_id}")).await;
    assert_eq!(status, 404);
}

/// Spec.md §8 property 7: two transient failures then a success write
/// exactly one StructuredEvent, and `enrichment_latency_ms` reflects
/// only the successful attempt's latency (not the two failed attempts
/// plus backoff sleeps).
#[tokio::test]
async fn transient_failures_then_success_write_exactly_one_event() {
    let app = TestApp::spawn_with(|s| {
        // Backoff of 0s between attempts keeps this test fast; the
        // *count* of attempts (not the schedule's duration) is what
        // property 7 asserts.
        s.enrichment_backoff_schedule_secs = vec![0, 0, 0];
    })
    .await;
    app.asr_backend
        .push_result(meaningful_result("Завтра нужно подготовить отчёт к дедлайну."))
        .await;

    app.enrichment_backend
        .push(Err(memoire_services::enrichment::EnrichmentError::Transient(
            "rate limited".into(),
        )))
        .await;
    app.enrichment_backend
        .push(Err(memoire_services::enrichment::EnrichmentError::Transient(
            "rate limited again".into(),
        )))
        .await;
    let mut output: EnrichmentOutput = sample_output();
    output.summary = "Подготовка ежедневного отчёта по проекту к дедлайну".into();
    app.enrichment_backend.push(Ok(output)).await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;
    assert_eq!(messages.last().unwrap()["type"], "transcription");

    let found = poll_until(
        || async {
            let (status, _) = app.get_json(&format!("/enrichment/{segment_id}")).await;
            status == 200
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(found, "enrichment should eventually succeed after retries");

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM structured_events se
         JOIN transcriptions t ON t.id = se.transcription_id
         WHERE t.segment_id = $1",
    )
    .bind(segment_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(count, 1, "exactly one StructuredEvent despite two prior transient failures");
}
