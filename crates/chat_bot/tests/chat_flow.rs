use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::Database;
use uuid::Uuid;

use chat_bot::testing::{MockTransport, StaticClassifier};
use chat_bot::{
    Classification, Intent, PatternClassifier, SessionSupervisor, TransportEvent,
};
use engine::{
    BudgetPeriod, Engine, Money, NewBudget, NewBudgetCategory, SessionStatus, TransactionKind,
    TransactionSource, UserRole,
};
use migration::MigratorTrait;

const HANDLE: &str = "6281234567890";

// Session workers hit the database concurrently with the test body, so the
// state has to live in a file: a pooled :memory: connection would hand each
// checkout its own empty database.
async fn engine_with_user() -> (Engine, Uuid) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("chat_{}.db", Uuid::new_v4()));

    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::new(db);
    let user = engine
        .create_user("alice", "password", UserRole::User, 2)
        .await
        .unwrap();
    (engine, user.id)
}

async fn supervisor_with(
    engine: &Engine,
    transport: Arc<MockTransport>,
) -> Arc<SessionSupervisor> {
    let supervisor = Arc::new(SessionSupervisor::new(
        engine.clone(),
        transport,
        Arc::new(PatternClassifier::new()),
    ));
    let pump = supervisor.clone();
    tokio::spawn(async move { pump.run().await });
    supervisor
}

async fn paired_session(
    engine: &Engine,
    supervisor: &SessionSupervisor,
    transport: &MockTransport,
    user_id: Uuid,
) -> Uuid {
    let session = supervisor.initialize(user_id, HANDLE).await.unwrap();
    assert_eq!(session.status, SessionStatus::Pending);

    let channel = MockTransport::channel_for(HANDLE);
    transport
        .emit(TransportEvent::PairingCode {
            channel: channel.clone(),
            code: "qr-payload".to_string(),
        })
        .await;
    transport
        .emit(TransportEvent::Ready { channel })
        .await;

    wait_for(|| async {
        let stored = engine.session(user_id, session.id).await.unwrap();
        (stored.status == SessionStatus::Active).then_some(())
    })
    .await;
    session.id
}

async fn inbound(transport: &MockTransport, text: &str) {
    transport
        .emit(TransportEvent::Message {
            channel: MockTransport::channel_for(HANDLE),
            text: text.to_string(),
            sender: HANDLE.to_string(),
        })
        .await;
}

/// Polls until `f` produces a value; panics after ~2 seconds.
async fn wait_for<T, F, Fut>(f: F) -> T
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    for _ in 0..100 {
        if let Some(value) = f().await {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn pairing_flow_reaches_active() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;

    let session_id = paired_session(&engine, &supervisor, &transport, user_id).await;

    let session = engine.session(user_id, session_id).await.unwrap();
    assert_eq!(session.pairing_code.as_deref(), Some("qr-payload"));
    assert_eq!(transport.opened().await, vec![HANDLE.to_string()]);
}

#[tokio::test]
async fn expense_message_creates_transaction_and_updates_budget() {
    let (engine, user_id) = engine_with_user().await;
    let now = Utc::now();
    let budget = engine
        .create_budget(
            NewBudget::new(
                user_id,
                "Bulanan",
                BudgetPeriod::Monthly,
                now - chrono::Duration::days(1),
                now + chrono::Duration::days(29),
            )
            .category(NewBudgetCategory::new("makan", Money::new(2_000_000))),
        )
        .await
        .unwrap();

    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    paired_session(&engine, &supervisor, &transport, user_id).await;

    inbound(&transport, "beli makan 50000").await;

    let reply = wait_for(|| async {
        transport
            .sent()
            .await
            .into_iter()
            .map(|(_, text)| text)
            .find(|text| text.contains("dicatat"))
    })
    .await;
    assert!(reply.contains("-Rp50.000"), "{reply}");
    assert!(reply.contains("makan"), "{reply}");

    let (txs, total) = engine
        .list_transactions(user_id, &engine::TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(txs[0].kind, TransactionKind::Expense);
    assert_eq!(txs[0].amount.minor(), 50_000);
    assert_eq!(txs[0].source, TransactionSource::Chat);
    assert_eq!(txs[0].chat_handle.as_deref(), Some(HANDLE));

    let budget = engine.budget(user_id, budget.id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 50_000);
    assert_eq!(budget.categories[0].spent.minor(), 50_000);
}

#[tokio::test]
async fn command_prefix_is_a_silent_noop() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    paired_session(&engine, &supervisor, &transport, user_id).await;

    inbound(&transport, "!ping").await;
    inbound(&transport, "lihat budget").await;

    // The later message gets a reply; the command produced none before it.
    let sent = wait_for(|| async {
        let sent = transport.sent().await;
        (!sent.is_empty()).then_some(sent)
    })
    .await;
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].1.contains("ping"));
}

#[tokio::test]
async fn gibberish_gets_fallback_reply() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    paired_session(&engine, &supervisor, &transport, user_id).await;

    inbound(&transport, "halo apa kabar").await;

    let reply = wait_for(|| async {
        transport.sent().await.into_iter().map(|(_, t)| t).next()
    })
    .await;
    assert!(reply.contains("tidak mengerti"), "{reply}");
}

#[tokio::test]
async fn low_confidence_classification_falls_back() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();

    let mut entities = HashMap::new();
    entities.insert("amount".to_string(), "50000".to_string());
    let classifier = StaticClassifier::new(Classification {
        intent: Some(Intent::TransactionExpense),
        confidence: 0.4,
        entities,
    });
    let supervisor = Arc::new(SessionSupervisor::new(
        engine.clone(),
        transport.clone(),
        Arc::new(classifier),
    ));
    let pump = supervisor.clone();
    tokio::spawn(async move { pump.run().await });

    paired_session(&engine, &supervisor, &transport, user_id).await;
    inbound(&transport, "beli makan 50000").await;

    let reply = wait_for(|| async {
        transport.sent().await.into_iter().map(|(_, t)| t).next()
    })
    .await;
    assert!(reply.contains("tidak mengerti"), "{reply}");

    let (_, total) = engine
        .list_transactions(user_id, &engine::TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn unparseable_amount_fails_closed() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();

    let mut entities = HashMap::new();
    entities.insert("amount".to_string(), "banyak".to_string());
    let classifier = StaticClassifier::new(Classification {
        intent: Some(Intent::TransactionExpense),
        confidence: 0.95,
        entities,
    });
    let supervisor = Arc::new(SessionSupervisor::new(
        engine.clone(),
        transport.clone(),
        Arc::new(classifier),
    ));
    let pump = supervisor.clone();
    tokio::spawn(async move { pump.run().await });

    paired_session(&engine, &supervisor, &transport, user_id).await;
    inbound(&transport, "beli makan banyak").await;

    let reply = wait_for(|| async {
        transport.sent().await.into_iter().map(|(_, t)| t).next()
    })
    .await;
    assert!(reply.contains("jumlah"), "{reply}");

    let (_, total) = engine
        .list_transactions(user_id, &engine::TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn threshold_crossing_delivers_alert_through_queue() {
    let (engine, user_id) = engine_with_user().await;
    let now = Utc::now();
    engine
        .create_budget(
            NewBudget::new(
                user_id,
                "Bulanan",
                BudgetPeriod::Monthly,
                now - chrono::Duration::days(1),
                now + chrono::Duration::days(29),
            )
            .category(NewBudgetCategory::new("makan", Money::new(2_000_000))),
        )
        .await
        .unwrap();

    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    let session_id = paired_session(&engine, &supervisor, &transport, user_id).await;

    inbound(&transport, "beli makan 1600000").await;

    wait_for(|| async {
        transport
            .sent()
            .await
            .into_iter()
            .map(|(_, t)| t)
            .find(|t| t.contains("⚠️"))
    })
    .await;

    // The alert went through the queue and is accounted as sent.
    assert!(engine.pending_messages(session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn budget_set_and_view_round_trip() {
    let (engine, user_id) = engine_with_user().await;
    let now = Utc::now();
    engine
        .create_budget(
            NewBudget::new(
                user_id,
                "Bulanan",
                BudgetPeriod::Monthly,
                now - chrono::Duration::days(1),
                now + chrono::Duration::days(29),
            )
            .category(NewBudgetCategory::new("makan", Money::new(1_000_000))),
        )
        .await
        .unwrap();

    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    paired_session(&engine, &supervisor, &transport, user_id).await;

    inbound(&transport, "atur budget transport 500000").await;
    wait_for(|| async {
        transport
            .sent()
            .await
            .into_iter()
            .map(|(_, t)| t)
            .find(|t| t.contains("diatur"))
    })
    .await;

    inbound(&transport, "lihat budget").await;
    let overview = wait_for(|| async {
        transport
            .sent()
            .await
            .into_iter()
            .map(|(_, t)| t)
            .find(|t| t.contains("Budget aktif"))
    })
    .await;
    assert!(overview.contains("transport"), "{overview}");
    assert!(overview.contains("Rp500.000"), "{overview}");
}

#[tokio::test]
async fn failed_reply_is_recorded_in_error_log() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    let session_id = paired_session(&engine, &supervisor, &transport, user_id).await;

    transport.fail_sends(true);
    inbound(&transport, "halo apa kabar").await;

    let errors = wait_for(|| async {
        let errors = engine
            .session_errors(user_id, session_id, 0, 10)
            .await
            .unwrap();
        (!errors.is_empty()).then_some(errors)
    })
    .await;
    assert!(errors[0].error.contains("mock send failure"));
}

#[tokio::test]
async fn lost_channel_marks_session_inactive() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    let session_id = paired_session(&engine, &supervisor, &transport, user_id).await;

    transport
        .emit(TransportEvent::Lost {
            channel: MockTransport::channel_for(HANDLE),
        })
        .await;

    wait_for(|| async {
        let session = engine.session(user_id, session_id).await.unwrap();
        (session.status == SessionStatus::Inactive).then_some(())
    })
    .await;
}

#[tokio::test]
async fn disconnect_then_delete_removes_session() {
    let (engine, user_id) = engine_with_user().await;
    let transport = MockTransport::new();
    let supervisor = supervisor_with(&engine, transport.clone()).await;
    let session_id = paired_session(&engine, &supervisor, &transport, user_id).await;

    engine
        .enqueue_message(session_id, "later", "reply", 1, None)
        .await
        .unwrap();

    let session = supervisor.disconnect(user_id, session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Inactive);
    assert!(engine.pending_messages(session_id).await.unwrap().is_empty());

    supervisor.delete(user_id, session_id).await.unwrap();
    assert!(engine.session(user_id, session_id).await.is_err());
}
