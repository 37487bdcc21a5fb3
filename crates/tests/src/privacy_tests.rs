//! `PrivacyTransform` mode wiring through the real `/ingest` pipeline
//! (spec.md §4.6). Unit coverage of the detection/masking regexes lives
//! in `memoire_services::privacy`'s own `#[cfg(test)]` module; these
//! exercise mode selection end-to-end.

use uuid::Uuid;

use crate::fixtures::stub_asr::meaningful_result;
use crate::fixtures::test_app::TestApp;
use crate::fixtures::wav_gen;

#[tokio::test]
async fn mask_mode_persists_placeholders_not_pii() {
    let app = TestApp::spawn_with(|s| {
        s.privacy_mode = memoire_config::PrivacyMode::Mask;
    })
    .await;
    app.asr_backend
        .push_result(meaningful_result("Мой email ivan@example.com для связи"))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    let terminal = messages.last().unwrap();
    assert_eq!(terminal["type"], "transcription");
    assert!(terminal["text"].as_str().unwrap().contains("[EMAIL]"));
    assert!(!terminal["text"].as_str().unwrap().contains("ivan@example.com"));

    let stored: String = sqlx::query_scalar("SELECT text FROM transcriptions WHERE segment_id = $1")
        .bind(segment_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(stored.contains("[EMAIL]"));
    assert!(!stored.contains("ivan@example.com"));
}

#[tokio::test]
async fn audit_mode_persists_original_text_and_still_completes() {
    let app = TestApp::spawn_with(|s| {
        s.privacy_mode = memoire_config::PrivacyMode::Audit;
    })
    .await;
    app.asr_backend
        .push_result(meaningful_result("Мой email ivan@example.com для связи"))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    let terminal = messages.last().unwrap();
    assert_eq!(terminal["type"], "transcription");
    assert!(terminal["text"].as_str().unwrap().contains("ivan@example.com"));

    let stored: String = sqlx::query_scalar("SELECT text FROM transcriptions WHERE segment_id = $1")
        .bind(segment_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(stored.contains("ivan@example.com"), "audit mode keeps the original text");
}

#[tokio::test]
async fn mask_mode_with_no_pii_passes_text_through_unchanged() {
    let app = TestApp::spawn_with(|s| {
        s.privacy_mode = memoire_config::PrivacyMode::Mask;
    })
    .await;
    app.asr_backend
        .push_result(meaningful_result("Нужно купить молока по дороге домой."))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;

    let terminal = messages.last().unwrap();
    assert_eq!(terminal["type"], "transcription");
    assert_eq!(terminal["text"], "Нужно купить молока по дороге домой.");
}
