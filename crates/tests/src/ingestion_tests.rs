//! End-to-end `/ingest` scenarios (spec.md §8 S1-S3, S6) driven through
//! the real axum router with queue-backed ASR/enrichment backends.

use uuid::Uuid;

use crate::fixtures::stub_asr::meaningful_result;
use crate::fixtures::test_app::TestApp;
use crate::fixtures::wav_gen;

#[tokio::test]
async fn happy_path_produces_transcription_and_persisted_event() {
    let app = TestApp::spawn().await;
    app.asr_backend
        .push_result(meaningful_result("Нужно позвонить Ивану завтра в три."))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(3.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    assert_eq!(messages.len(), 2, "expected a received ack then a terminal message");
    assert_eq!(messages[0]["type"], "received");
    assert_eq!(messages[1]["type"], "transcription");
    assert!(messages[1]["text"].as_str().unwrap().contains("позвонить"));

    let transcription: memoire_db::Transcription =
        sqlx::query_as("SELECT * FROM transcriptions WHERE segment_id = $1")
            .bind(segment_id)
            .fetch_one(&app.pool)
            .await
            .expect("transcription row persisted");
    assert!(transcription.text.contains("позвонить"));

    let persisted_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM integrity_events WHERE segment_id = $1 AND stage = 'persisted'")
            .bind(segment_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(persisted_count, 1);
}

#[tokio::test]
async fn music_is_rejected_before_asr_runs() {
    let app = TestApp::spawn().await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::tone_wav(5000.0, 3.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    let terminal = messages.last().expect("at least one message");
    assert_eq!(terminal["type"], "filtered");
    assert_eq!(terminal["reason"], "music");

    let transcription_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transcriptions WHERE segment_id = $1")
            .bind(segment_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(transcription_count, 0);

    let pre_asr_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM integrity_events WHERE segment_id = $1 AND stage = 'filter_pre_asr'",
    )
    .bind(segment_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(pre_asr_count, 1);
}

#[tokio::test]
async fn stop_phrase_is_rejected_after_asr() {
    let app = TestApp::spawn().await;
    app.asr_backend.push_result(meaningful_result("Угу.")).await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(1.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    let terminal = messages.last().expect("at least one message");
    assert_eq!(terminal["type"], "filtered");
    assert_eq!(terminal["reason"], "noise_phrase");

    let post_asr_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM integrity_events WHERE segment_id = $1 AND stage = 'filter_post_asr'",
    )
    .bind(segment_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(post_asr_count, 1);
}

#[tokio::test]
async fn retried_segment_id_does_not_duplicate_the_transcription() {
    let app = TestApp::spawn().await;
    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);

    app.asr_backend
        .push_result(meaningful_result("Купить хлеба и молока по дороге домой."))
        .await;
    let first = app.send_ingest(Some(segment_id), payload.clone()).await;
    assert_eq!(first.last().unwrap()["type"], "transcription");

    // The client never saw the ack (simulated network drop) and retries
    // the same segment_id. The backend still has a canned result queued
    // from a previous push if the retry reaches ASR — but persistence's
    // idempotent insert means it shouldn't even need a fresh one for the
    // row count to stay at one.
    app.asr_backend
        .push_result(meaningful_result("Купить хлеба и молока по дороге домой."))
        .await;
    let second = app.send_ingest(Some(segment_id), payload).await;
    assert_eq!(second.last().unwrap()["type"], "transcription");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transcriptions WHERE segment_id = $1")
        .bind(segment_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "a retried segment_id must not create a second row");
}

#[tokio::test]
async fn strict_privacy_mode_blocks_pii_before_persistence() {
    let app = TestApp::spawn_with(|s| {
        s.privacy_mode = memoire_config::PrivacyMode::Strict;
    })
    .await;
    app.asr_backend
        .push_result(meaningful_result("Мой email ivan@example.com"))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    let terminal = messages.last().expect("at least one message");
    assert_eq!(terminal["type"], "filtered");
    assert_eq!(terminal["reason"], "pii_blocked");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transcriptions WHERE segment_id = $1")
        .bind(segment_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
