//! Transactions API endpoints.

use api_types::budget::AlertView;
use api_types::transaction::{
    CategoryTotalView, LocationView, SummaryQuery, SummaryView, TransactionListQuery,
    TransactionListResponse, TransactionNew, TransactionUpdateRequest, TransactionView,
    TransactionWriteResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, TimeZone, Utc};
use engine::{
    BudgetAlert, Money, NewTransaction, Transaction, TransactionFilter, TransactionKind,
    TransactionSource, TransactionStatus, TransactionUpdate, User,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn view(tx: &Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: tx.kind.as_str().to_string(),
        amount_minor: tx.amount.minor(),
        category: tx.category.clone(),
        description: tx.description.clone(),
        occurred_at: tx.occurred_at,
        source: tx.source.as_str().to_string(),
        chat_handle: tx.chat_handle.clone(),
        status: tx.status.as_str().to_string(),
        tags: tx.tags.clone(),
        location: tx.location.as_ref().map(|location| LocationView {
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
        }),
    }
}

pub(crate) fn alert_view(alert: &BudgetAlert) -> AlertView {
    AlertView {
        budget_id: alert.budget_id,
        budget_name: alert.budget_name.clone(),
        scope: match alert.scope {
            engine::AlertScope::Overall => "overall".to_string(),
            engine::AlertScope::Category => "category".to_string(),
        },
        category: alert.category.clone(),
        percent_used: alert.percent_used.is_finite().then_some(alert.percent_used),
        severity: match alert.severity {
            engine::AlertSeverity::Medium => "medium".to_string(),
            engine::AlertSeverity::High => "high".to_string(),
        },
        message: alert.message.clone(),
    }
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionWriteResponse>), ServerError> {
    let kind = TransactionKind::try_from(payload.kind.as_str())?;
    let mut cmd = NewTransaction::new(user.id, kind, Money::new(payload.amount_minor))
        .source(TransactionSource::Web)
        .tags(payload.tags);
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(occurred_at) = payload.occurred_at {
        cmd = cmd.occurred_at(occurred_at);
    }
    if let Some(status) = payload.status.as_deref() {
        cmd = cmd.status(TransactionStatus::try_from(status)?);
    }
    if let Some(location) = payload.location {
        cmd = cmd.location(engine::Location {
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
        });
    }

    let (tx, alerts) = state.engine.create_transaction(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionWriteResponse {
            transaction: Some(view(&tx)),
            alerts: alerts.iter().map(alert_view).collect(),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = TransactionFilter {
        from: query.from,
        to: query.to,
        kind: query
            .kind
            .as_deref()
            .map(TransactionKind::try_from)
            .transpose()?,
        category: query.category,
        source: query
            .source
            .as_deref()
            .map(TransactionSource::try_from)
            .transpose()?,
        offset: query.offset.unwrap_or(0),
        limit: query.limit.unwrap_or(TransactionFilter::DEFAULT_LIMIT),
    };

    let (transactions, total) = state.engine.list_transactions(user.id, &filter).await?;
    Ok(Json(TransactionListResponse {
        transactions: transactions.iter().map(view).collect(),
        total,
    }))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(user.id, id).await?;
    Ok(Json(view(&tx)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdateRequest>,
) -> Result<Json<TransactionWriteResponse>, ServerError> {
    let update = TransactionUpdate {
        kind: payload
            .kind
            .as_deref()
            .map(TransactionKind::try_from)
            .transpose()?,
        amount: payload.amount_minor.map(Money::new),
        category: payload.category,
        description: payload.description,
        occurred_at: payload.occurred_at,
        status: payload
            .status
            .as_deref()
            .map(TransactionStatus::try_from)
            .transpose()?,
        tags: payload.tags,
    };

    let (tx, alerts) = state.engine.update_transaction(user.id, id, update).await?;
    Ok(Json(TransactionWriteResponse {
        transaction: Some(view(&tx)),
        alerts: alerts.iter().map(alert_view).collect(),
    }))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionWriteResponse>, ServerError> {
    let alerts = state.engine.delete_transaction(user.id, id).await?;
    Ok(Json(TransactionWriteResponse {
        transaction: None,
        alerts: alerts.iter().map(alert_view).collect(),
    }))
}

pub(crate) fn summary_view(summary: &engine::TransactionSummary) -> SummaryView {
    SummaryView {
        from: summary.from,
        to: summary.to,
        total_income_minor: summary.total_income.minor(),
        total_expense_minor: summary.total_expense.minor(),
        net_minor: summary.net.minor(),
        categories: summary
            .categories
            .iter()
            .map(|c| CategoryTotalView {
                category: c.category.clone(),
                total_minor: c.total.minor(),
                count: c.count,
            })
            .collect(),
    }
}

pub async fn summary(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryView>, ServerError> {
    let now = Utc::now();
    // Defaults mirror the web dashboard: current month to date.
    let from = query.from.unwrap_or_else(|| {
        Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now)
    });
    let to = query.to.unwrap_or(now);

    let summary = state.engine.transaction_summary(user.id, from, to).await?;
    Ok(Json(summary_view(&summary)))
}
