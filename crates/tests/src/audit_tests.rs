//! `GET /audit/trail/{segment_id}` scenarios (spec.md §4.8, §8 property 2,
//! §8 S5).

use uuid::Uuid;

use crate::fixtures::stub_asr::meaningful_result;
use crate::fixtures::test_app::TestApp;
use crate::fixtures::wav_gen;

#[tokio::test]
async fn trail_is_consistent_after_a_clean_happy_path() {
    let app = TestApp::spawn().await;
    app.asr_backend
        .push_result(meaningful_result("Нужно купить молока и хлеба вечером."))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;
    assert_eq!(messages.last().unwrap()["type"], "transcription");

    let (status, body) = app.get_json(&format!("/audit/trail/{segment_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["consistent"], true);
    assert!(body["first_divergent_event_id"].is_null());

    let events = body["events"].as_array().expect("events array");
    assert!(events.len() >= 2, "expect at least ingest_received + persisted");
    assert_eq!(events[0]["prev_hash"], serde_json::Value::Null);
    assert_eq!(events.last().unwrap()["stage"], "persisted");
}

#[tokio::test]
async fn unknown_segment_returns_404() {
    let app = TestApp::spawn().await;
    let (status, _body) = app.get_json(&format!("/audit/trail/{}", Uuid::new_v4())).await;
    assert_eq!(status, 404);
}

/// Spec.md S5: manually mutating a recorded event's payload must flip
/// the trail's verification flag and name the first divergent event,
/// without the chain auto-repairing itself (spec.md §4.8: "never
/// auto-repaired").
#[tokio::test]
async fn tampering_with_an_event_payload_is_detected() {
    let app = TestApp::spawn().await;
    app.asr_backend
        .push_result(meaningful_result("Нужно позвонить Ивану завтра в три."))
        .await;

    let segment_id = Uuid::new_v4();
    let payload = wav_gen::speech_like_wav(2.0);
    let messages = app.send_ingest(Some(segment_id), payload).await;
    assert_eq!(messages.last().unwrap()["type"], "transcription");

    let (_, clean_trail) = app
        .get_json(&format!("/audit/trail/{segment_id}"))
        .await;
    assert_eq!(clean_trail["consistent"], true);

    let tampered_event_id: uuid::Uuid = sqlx::query_scalar(
        "SELECT id FROM integrity_events WHERE segment_id = $1 AND stage = 'transcription_complete'",
    )
    .bind(segment_id)
    .fetch_one(&app.pool)
    .await
    .expect("transcription_complete event exists");

    sqlx::query("UPDATE integrity_events SET metadata = $1 WHERE id = $2")
        .bind(serde_json::json!({ "text": "tampered text", "language": "ru" }))
        .bind(tampered_event_id)
        .execute(&app.pool)
        .await
        .expect("mutate stored metadata");

    let (status, body) = app.get_json(&format!("/audit/trail/{segment_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["consistent"], false);
    assert_eq!(
        body["first_divergent_event_id"].as_str().unwrap(),
        tampered_event_id.to_string()
    );
}
