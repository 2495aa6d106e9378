//! Budgets API endpoints.

use api_types::budget::{
    AlertView, BudgetDetailResponse, BudgetListQuery, BudgetNewRequest, BudgetSummaryView,
    BudgetUpdateRequest, BudgetView, CategoryNew, CategorySummaryView, CategoryView, DriftView,
    ReconcileResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    Budget, BudgetPeriod, BudgetStatus, BudgetSummary, BudgetUpdate, CategoryNotifications,
    Money, NewBudget, NewBudgetCategory, User,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions};

fn view(budget: &Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        name: budget.name.clone(),
        period: budget.period.as_str().to_string(),
        start_date: budget.start_date,
        end_date: budget.end_date,
        status: budget.status.as_str().to_string(),
        total_budget_minor: budget.total_budget.minor(),
        total_spent_minor: budget.total_spent.minor(),
        categories: budget
            .categories
            .iter()
            .map(|category| CategoryView {
                name: category.name.clone(),
                limit_minor: category.limit.minor(),
                spent_minor: category.spent.minor(),
                color: category.color.clone(),
                notify_enabled: category.notifications.enabled,
                notify_threshold: category.notifications.threshold,
            })
            .collect(),
        notes: budget.notes.clone(),
    }
}

fn summary_view(summary: &BudgetSummary) -> BudgetSummaryView {
    BudgetSummaryView {
        budget_id: summary.budget_id,
        name: summary.name.clone(),
        period: summary.period.as_str().to_string(),
        start_date: summary.start_date,
        end_date: summary.end_date,
        total_budget_minor: summary.total_budget.minor(),
        total_spent_minor: summary.total_spent.minor(),
        remaining_minor: summary.remaining.minor(),
        percent_used: summary.percent_used,
        categories: summary
            .categories
            .iter()
            .map(|category| CategorySummaryView {
                name: category.name.clone(),
                limit_minor: category.limit.minor(),
                spent_minor: category.spent.minor(),
                remaining_minor: category.remaining.minor(),
                percent_used: category.percent_used,
            })
            .collect(),
    }
}

fn categories_from(requested: Vec<CategoryNew>) -> Vec<NewBudgetCategory> {
    requested
        .into_iter()
        .map(|category| {
            let mut notifications = CategoryNotifications::default();
            if let Some(enabled) = category.notify_enabled {
                notifications.enabled = enabled;
            }
            if let Some(threshold) = category.notify_threshold {
                notifications.threshold = threshold;
            }
            let mut new = NewBudgetCategory::new(category.name, Money::new(category.limit_minor))
                .notifications(notifications);
            if let Some(color) = category.color {
                new = new.color(color);
            }
            new
        })
        .collect()
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNewRequest>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let mut cmd = NewBudget::new(
        user.id,
        payload.name,
        BudgetPeriod::try_from(payload.period.as_str())?,
        payload.start_date,
        payload.end_date,
    );
    cmd.categories = categories_from(payload.categories);
    cmd.total_budget = Money::new(payload.total_budget_minor);
    cmd.notes = payload.notes;

    let budget = state.engine.create_budget(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(&budget))))
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<BudgetListQuery>,
) -> Result<Json<Vec<BudgetView>>, ServerError> {
    let status = query
        .status
        .as_deref()
        .map(BudgetStatus::try_from)
        .transpose()?;
    let budgets = state.engine.budgets(user.id, status).await?;
    Ok(Json(budgets.iter().map(view).collect()))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetDetailResponse>, ServerError> {
    let (budget, txs) = state.engine.budget_with_transactions(user.id, id).await?;
    Ok(Json(BudgetDetailResponse {
        budget: view(&budget),
        transactions: txs.iter().map(transactions::view).collect(),
    }))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetUpdateRequest>,
) -> Result<Json<BudgetView>, ServerError> {
    let update = BudgetUpdate {
        name: payload.name,
        period: payload
            .period
            .as_deref()
            .map(BudgetPeriod::try_from)
            .transpose()?,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: payload
            .status
            .as_deref()
            .map(BudgetStatus::try_from)
            .transpose()?,
        categories: payload.categories.map(categories_from),
        total_budget: payload.total_budget_minor.map(Money::new),
        notifications: None,
        notes: payload.notes,
    };

    let budget = state.engine.update_budget(user.id, id, update).await?;
    Ok(Json(view(&budget)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetSummaryView>>, ServerError> {
    let summaries = state.engine.budget_summaries(user.id).await?;
    Ok(Json(summaries.iter().map(summary_view).collect()))
}

pub async fn alerts(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<AlertView>>, ServerError> {
    let alerts = state.engine.budget_alerts(user.id).await?;
    Ok(Json(alerts.iter().map(transactions::alert_view).collect()))
}

pub async fn reconcile(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    let report = state.engine.reconcile_budget(user.id, id).await?;
    Ok(Json(ReconcileResponse {
        budget_id: report.budget_id,
        drifts: report
            .drifts
            .iter()
            .map(|drift| DriftView {
                category: drift.category.clone(),
                stored_minor: drift.stored.minor(),
                computed_minor: drift.computed.minor(),
            })
            .collect(),
        total_stored_minor: report.total_stored.minor(),
        total_computed_minor: report.total_computed.minor(),
        repaired: report.repaired,
    }))
}
