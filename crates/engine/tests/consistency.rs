use chrono::{Duration, Utc};
use sea_orm::Database;

use engine::{
    AlertSeverity, BudgetPeriod, Engine, EngineError, Money, NewBudget, NewBudgetCategory,
    NewTransaction, TransactionKind, TransactionSource, TransactionUpdate, UserRole,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_user() -> (Engine, Uuid) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::new(db);
    let user = engine
        .create_user("alice", "password", UserRole::User, 2)
        .await
        .unwrap();
    (engine, user.id)
}

// Concurrent writers each check a connection out of the pool, so the shared
// state has to live in a file rather than a per-connection :memory: database.
async fn engine_with_file_user() -> (Engine, Uuid) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::new(db);
    let user = engine
        .create_user("alice", "password", UserRole::User, 2)
        .await
        .unwrap();
    (engine, user.id)
}

async fn monthly_budget(engine: &Engine, user_id: Uuid, food_limit: i64) -> Uuid {
    let now = Utc::now();
    let budget = engine
        .create_budget(
            NewBudget::new(
                user_id,
                "Bulanan",
                BudgetPeriod::Monthly,
                now - Duration::days(5),
                now + Duration::days(25),
            )
            .category(NewBudgetCategory::new("food", Money::new(food_limit)))
            .category(NewBudgetCategory::new("transport", Money::new(500_000))),
        )
        .await
        .unwrap();
    budget.id
}

fn expense(user_id: Uuid, amount: i64, category: &str) -> NewTransaction {
    NewTransaction::new(user_id, TransactionKind::Expense, Money::new(amount))
        .category(category)
        .source(TransactionSource::Chat)
}

#[tokio::test]
async fn budget_creation_rejects_mismatched_total() {
    let (engine, user_id) = engine_with_user().await;
    let now = Utc::now();

    let err = engine
        .create_budget(
            NewBudget::new(user_id, "Bulanan", BudgetPeriod::Monthly, now, now)
                .category(NewBudgetCategory::new("food", Money::new(1_000)))
                .total_budget(Money::new(5_000)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn expense_updates_matching_category_and_total() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    let (_, alerts) = engine
        .create_transaction(expense(user_id, 50_000, "food"))
        .await
        .unwrap();
    assert!(alerts.is_empty());

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 50_000);
    assert_eq!(budget.categories[0].spent.minor(), 50_000);
    assert_eq!(budget.categories[1].spent.minor(), 0);
}

#[tokio::test]
async fn income_never_touches_budgets() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    engine
        .create_transaction(
            NewTransaction::new(user_id, TransactionKind::Income, Money::new(1_000_000))
                .category("food"),
        )
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 0);
}

#[tokio::test]
async fn category_match_is_case_insensitive() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    engine
        .create_transaction(expense(user_id, 10_000, "  FOOD "))
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.categories[0].spent.minor(), 10_000);
}

#[tokio::test]
async fn unmatched_category_skips_budget() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    engine
        .create_transaction(expense(user_id, 10_000, "hiburan"))
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 0);
}

#[tokio::test]
async fn elapsed_window_budget_is_not_updated() {
    let (engine, user_id) = engine_with_user().await;
    let now = Utc::now();
    let stale = engine
        .create_budget(
            NewBudget::new(
                user_id,
                "Lama",
                BudgetPeriod::Monthly,
                now - Duration::days(60),
                now - Duration::days(30),
            )
            .category(NewBudgetCategory::new("food", Money::new(1_000_000))),
        )
        .await
        .unwrap();

    // Backdated into the stale window, but entered now: the wall-clock
    // active filter excludes the budget.
    engine
        .create_transaction(
            expense(user_id, 10_000, "food").occurred_at(now - Duration::days(45)),
        )
        .await
        .unwrap();

    let budget = engine.budget(user_id, stale.id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 0);
}

#[tokio::test]
async fn alerts_fire_at_eighty_and_hundred_percent() {
    let (engine, user_id) = engine_with_user().await;
    let now = Utc::now();
    engine
        .create_budget(
            NewBudget::new(
                user_id,
                "Bulanan",
                BudgetPeriod::Monthly,
                now - Duration::days(5),
                now + Duration::days(25),
            )
            .category(NewBudgetCategory::new("food", Money::new(2_000_000))),
        )
        .await
        .unwrap();

    let (_, alerts) = engine
        .create_transaction(expense(user_id, 50_000, "food"))
        .await
        .unwrap();
    assert!(alerts.is_empty());

    // 1,600,000 of 2,000,000 is exactly 80.0%.
    let (_, alerts) = engine
        .create_transaction(expense(user_id, 1_550_000, "food"))
        .await
        .unwrap();
    assert!(!alerts.is_empty());
    assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Medium));

    // 2,100,000 of 2,000,000 is 105%.
    let (_, alerts) = engine
        .create_transaction(expense(user_id, 500_000, "food"))
        .await
        .unwrap();
    assert!(!alerts.is_empty());
    assert!(alerts.iter().all(|a| a.severity == AlertSeverity::High));
}

#[tokio::test]
async fn edit_moves_full_amount_between_categories() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    let (tx, _) = engine
        .create_transaction(expense(user_id, 75_000, "food"))
        .await
        .unwrap();

    engine
        .update_transaction(
            user_id,
            tx.id,
            TransactionUpdate::new().category("transport"),
        )
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.categories[0].spent.minor(), 0);
    assert_eq!(budget.categories[1].spent.minor(), 75_000);
    assert_eq!(budget.total_spent.minor(), 75_000);
}

#[tokio::test]
async fn edit_changing_amount_and_category_leaves_no_residue() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    let (tx, _) = engine
        .create_transaction(expense(user_id, 75_000, "food"))
        .await
        .unwrap();
    engine
        .update_transaction(
            user_id,
            tx.id,
            TransactionUpdate::new()
                .amount(Money::new(120_000))
                .category("transport"),
        )
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.categories[0].spent.minor(), 0);
    assert_eq!(budget.categories[1].spent.minor(), 120_000);
    assert_eq!(budget.total_spent.minor(), 120_000);
}

#[tokio::test]
async fn cancelling_an_expense_reverses_its_contribution() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    let (tx, _) = engine
        .create_transaction(expense(user_id, 75_000, "food"))
        .await
        .unwrap();
    engine
        .update_transaction(
            user_id,
            tx.id,
            TransactionUpdate::new().status(engine::TransactionStatus::Cancelled),
        )
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 0);
    assert_eq!(budget.categories[0].spent.minor(), 0);
}

#[tokio::test]
async fn delete_then_recreate_round_trips() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    let (tx, _) = engine
        .create_transaction(expense(user_id, 50_000, "food"))
        .await
        .unwrap();
    let before = engine.budget(user_id, budget_id).await.unwrap();

    engine.delete_transaction(user_id, tx.id).await.unwrap();
    let reversed = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(reversed.total_spent.minor(), 0);
    assert_eq!(reversed.categories[0].spent.minor(), 0);

    engine
        .create_transaction(expense(user_id, 50_000, "food"))
        .await
        .unwrap();
    let after = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(after.total_spent, before.total_spent);
    assert_eq!(after.categories[0].spent, before.categories[0].spent);
}

#[tokio::test]
async fn totals_stay_consistent_across_mixed_sequence() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 5_000_000).await;

    let (a, _) = engine
        .create_transaction(expense(user_id, 100_000, "food"))
        .await
        .unwrap();
    let (b, _) = engine
        .create_transaction(expense(user_id, 200_000, "transport"))
        .await
        .unwrap();
    engine
        .update_transaction(user_id, a.id, TransactionUpdate::new().amount(Money::new(150_000)))
        .await
        .unwrap();
    engine.delete_transaction(user_id, b.id).await.unwrap();
    engine
        .create_transaction(expense(user_id, 30_000, "transport"))
        .await
        .unwrap();

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    let sum: i64 = budget.categories.iter().map(|c| c.spent.minor()).sum();
    assert_eq!(budget.total_spent.minor(), sum);
    assert_eq!(budget.categories[0].spent.minor(), 150_000);
    assert_eq!(budget.categories[1].spent.minor(), 30_000);
}

#[tokio::test]
async fn concurrent_deltas_converge() {
    let (engine, user_id) = engine_with_file_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    engine
        .create_transaction(expense(user_id, 500_000, "food"))
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine_inc = engine.clone();
        tasks.spawn(async move {
            engine_inc
                .apply_delta(user_id, "food", Money::new(10_000))
                .await
                .unwrap();
        });
        let engine_dec = engine.clone();
        tasks.spawn(async move {
            engine_dec
                .apply_delta(user_id, "food", Money::new(-10_000))
                .await
                .unwrap();
        });
    }
    while tasks.join_next().await.is_some() {}

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 500_000);
    assert_eq!(budget.categories[0].spent.minor(), 500_000);
}

#[tokio::test]
async fn upsert_category_limit_keeps_total_in_sync() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    let budget = engine
        .upsert_category_limit(user_id, "food", Money::new(3_000_000))
        .await
        .unwrap();
    assert_eq!(budget.id, budget_id);
    assert_eq!(budget.categories[0].limit.minor(), 3_000_000);
    assert_eq!(budget.total_budget.minor(), 3_500_000);

    let budget = engine
        .upsert_category_limit(user_id, "hiburan", Money::new(200_000))
        .await
        .unwrap();
    assert_eq!(budget.categories.len(), 3);
    assert_eq!(budget.total_budget.minor(), 3_700_000);

    let sum: i64 = budget.categories.iter().map(|c| c.limit.minor()).sum();
    assert_eq!(budget.total_budget.minor(), sum);
}

#[tokio::test]
async fn upsert_without_active_budget_reports_not_found() {
    let (engine, user_id) = engine_with_user().await;
    let err = engine
        .upsert_category_limit(user_id, "food", Money::new(1_000))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("active budget".to_string()));
}

#[tokio::test]
async fn reconcile_detects_and_repairs_drift() {
    let (engine, user_id) = engine_with_user().await;
    let budget_id = monthly_budget(&engine, user_id, 2_000_000).await;

    engine
        .create_transaction(expense(user_id, 50_000, "food"))
        .await
        .unwrap();

    // Inject drift through the raw delta path, as a crashed writer would.
    engine
        .apply_delta(user_id, "food", Money::new(25_000))
        .await
        .unwrap();

    let report = engine.reconcile_budget(user_id, budget_id).await.unwrap();
    assert!(report.repaired);
    assert_eq!(report.drifts.len(), 1);
    assert_eq!(report.drifts[0].stored.minor(), 75_000);
    assert_eq!(report.drifts[0].computed.minor(), 50_000);

    let budget = engine.budget(user_id, budget_id).await.unwrap();
    assert_eq!(budget.total_spent.minor(), 50_000);
    assert_eq!(budget.categories[0].spent.minor(), 50_000);

    let clean = engine.reconcile_budget(user_id, budget_id).await.unwrap();
    assert!(!clean.repaired);
    assert!(clean.drifts.is_empty());
}

#[tokio::test]
async fn summary_breaks_expenses_down_by_category() {
    let (engine, user_id) = engine_with_user().await;
    monthly_budget(&engine, user_id, 2_000_000).await;

    engine
        .create_transaction(
            NewTransaction::new(user_id, TransactionKind::Income, Money::new(4_000_000))
                .category("gaji"),
        )
        .await
        .unwrap();
    engine
        .create_transaction(expense(user_id, 50_000, "food"))
        .await
        .unwrap();
    engine
        .create_transaction(expense(user_id, 80_000, "transport"))
        .await
        .unwrap();

    let now = Utc::now();
    let summary = engine
        .transaction_summary(user_id, now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(summary.total_income.minor(), 4_000_000);
    assert_eq!(summary.total_expense.minor(), 130_000);
    assert_eq!(summary.net.minor(), 3_870_000);
    assert_eq!(summary.categories[0].category, "transport");
}
