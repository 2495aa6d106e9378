use sea_orm::Database;

use engine::{
    CustomPhrase, DeliveryStatus, Engine, EngineError, Language, NlpUpdate, SessionStatus,
    SettingsUpdate, UserRole,
};
use migration::MigratorTrait;
use uuid::Uuid;

const HANDLE: &str = "6281234567890";
const OTHER_HANDLE: &str = "6289876543210";

async fn engine_with_user(max_handles: i32) -> (Engine, Uuid) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::new(db);
    let user = engine
        .create_user("alice", "password", UserRole::User, max_handles)
        .await
        .unwrap();
    (engine, user.id)
}

#[tokio::test]
async fn initialize_creates_inactive_session_with_defaults() {
    let (engine, user_id) = engine_with_user(2).await;

    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();
    assert_eq!(session.status, SessionStatus::Inactive);
    assert_eq!(session.handle, HANDLE);
    assert_eq!(session.settings.language, Language::Id);
    assert!((session.nlp.confidence - 0.7).abs() < f64::EPSILON);

    let handles = engine.user_handles(user_id).await.unwrap();
    assert_eq!(handles.len(), 1);
    assert!(!handles[0].is_active);
}

#[tokio::test]
async fn initialize_rejects_malformed_handle() {
    let (engine, user_id) = engine_with_user(2).await;
    let err = engine.initialize_session(user_id, "abc").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn initialize_is_idempotent_for_existing_session() {
    let (engine, user_id) = engine_with_user(2).await;

    let first = engine.initialize_session(user_id, HANDLE).await.unwrap();
    engine.mark_session_ready(first.id).await.unwrap();

    let again = engine.initialize_session(user_id, HANDLE).await.unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.status, SessionStatus::Active);
}

#[tokio::test]
async fn quota_blocks_second_handle_and_creates_nothing() {
    let (engine, user_id) = engine_with_user(1).await;

    engine.initialize_session(user_id, HANDLE).await.unwrap();
    let err = engine
        .initialize_session(user_id, OTHER_HANDLE)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded(_)));

    assert_eq!(engine.user_handles(user_id).await.unwrap().len(), 1);
    assert_eq!(engine.sessions_for_user(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn handle_owned_by_another_user_is_rejected() {
    let (engine, alice) = engine_with_user(2).await;
    let bob = engine
        .create_user("bob", "password", UserRole::User, 2)
        .await
        .unwrap();

    engine.initialize_session(alice, HANDLE).await.unwrap();
    let err = engine.initialize_session(bob.id, HANDLE).await.unwrap_err();
    assert_eq!(err, EngineError::DuplicateHandle(HANDLE.to_string()));
}

#[tokio::test]
async fn lifecycle_pending_ready_lost() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    let session = engine.mark_session_pending(session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Pending);

    engine
        .set_pairing_code(session.id, "qr-payload-1")
        .await
        .unwrap();
    engine
        .set_pairing_code(session.id, "qr-payload-2")
        .await
        .unwrap();
    let stored = engine.session(user_id, session.id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::Pending);
    assert_eq!(stored.pairing_code.as_deref(), Some("qr-payload-2"));

    let session = engine.mark_session_ready(session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    let handles = engine.user_handles(user_id).await.unwrap();
    assert!(handles[0].is_active);

    let session = engine.mark_session_lost(session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Inactive);
}

#[tokio::test]
async fn disconnect_is_noop_when_already_inactive() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    let before = engine.session(user_id, session.id).await.unwrap();
    let after = engine
        .disconnect_session(user_id, session.id)
        .await
        .unwrap();
    assert_eq!(after.status, SessionStatus::Inactive);
    assert_eq!(after.last_active, before.last_active);
}

#[tokio::test]
async fn disconnect_marks_pending_queue_failed() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();
    engine.mark_session_ready(session.id).await.unwrap();

    engine
        .enqueue_message(session.id, "hello", "reply", 1, None)
        .await
        .unwrap();
    let sent = engine
        .enqueue_message(session.id, "world", "reply", 1, None)
        .await
        .unwrap();
    engine
        .mark_message(sent.id, DeliveryStatus::Sent)
        .await
        .unwrap();

    engine
        .disconnect_session(user_id, session.id)
        .await
        .unwrap();

    // Nothing pending survives a disconnect; delivered history stays sent.
    assert!(engine.pending_messages(session.id).await.unwrap().is_empty());
    let handles = engine.user_handles(user_id).await.unwrap();
    assert!(!handles[0].is_active);
}

#[tokio::test]
async fn delete_returns_last_state_and_removes_session() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();
    engine.mark_session_ready(session.id).await.unwrap();

    let removed = engine.delete_session(user_id, session.id).await.unwrap();
    assert_eq!(removed.status, SessionStatus::Active);

    let err = engine.session(user_id, session.id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("session".to_string()));
}

#[tokio::test]
async fn expire_is_an_explicit_transition() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    let session = engine.expire_session(user_id, session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Expired);
}

#[tokio::test]
async fn settings_and_nlp_updates_are_partial() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    let session = engine
        .update_session_settings(
            user_id,
            session.id,
            SettingsUpdate {
                language: Some(Language::En),
                auto_reply_enabled: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(session.settings.language, Language::En);
    assert!(session.settings.auto_reply_enabled);
    assert_eq!(session.settings.timezone, "Asia/Jakarta");

    let session = engine
        .update_nlp_settings(
            user_id,
            session.id,
            NlpUpdate {
                confidence: Some(0.9),
                enabled: None,
            },
        )
        .await
        .unwrap();
    assert!((session.nlp.confidence - 0.9).abs() < f64::EPSILON);
    assert!(session.nlp.enabled);

    let err = engine
        .update_nlp_settings(
            user_id,
            session.id,
            NlpUpdate {
                confidence: Some(1.5),
                enabled: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn invalid_timezone_is_rejected() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    let err = engine
        .update_session_settings(
            user_id,
            session.id,
            SettingsUpdate {
                timezone: Some("Mars/Olympus".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn custom_phrases_accumulate() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    engine
        .add_custom_phrases(
            user_id,
            session.id,
            vec![CustomPhrase {
                phrase: "jajan".to_string(),
                intent: "transaction.expense".to_string(),
                examples: vec!["jajan 5000".to_string()],
            }],
        )
        .await
        .unwrap();
    let phrases = engine
        .add_custom_phrases(
            user_id,
            session.id,
            vec![CustomPhrase {
                phrase: "bonus".to_string(),
                intent: "transaction.income".to_string(),
                examples: Vec::new(),
            }],
        )
        .await
        .unwrap();

    assert_eq!(phrases.len(), 2);
    assert_eq!(phrases[0].phrase, "jajan");
    assert_eq!(phrases[1].intent, "transaction.income");
}

#[tokio::test]
async fn error_log_pages_newest_first() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    for i in 0..3 {
        engine
            .log_session_error(
                session.id,
                &format!("boom {i}"),
                serde_json::json!({ "seq": i }),
            )
            .await
            .unwrap();
    }

    let page = engine
        .session_errors(user_id, session.id, 0, 2)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].error, "boom 2");
    assert_eq!(page[1].error, "boom 1");
    assert_eq!(page[0].context["seq"], 2);
}

#[tokio::test]
async fn queue_orders_by_priority_then_fifo() {
    let (engine, user_id) = engine_with_user(2).await;
    let session = engine.initialize_session(user_id, HANDLE).await.unwrap();

    engine
        .enqueue_message(session.id, "low", "reply", 1, None)
        .await
        .unwrap();
    engine
        .enqueue_message(session.id, "high", "alert", 5, None)
        .await
        .unwrap();
    engine
        .enqueue_message(session.id, "low-2", "reply", 1, None)
        .await
        .unwrap();

    let pending = engine.pending_messages(session.id).await.unwrap();
    let contents: Vec<&str> = pending.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["high", "low", "low-2"]);
}
