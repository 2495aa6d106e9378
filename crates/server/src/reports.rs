//! Period report endpoint.

use api_types::report::{ReportQuery, ReportView};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use engine::{ReportPeriod, User};

use crate::{ServerError, server::ServerState, transactions};

const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(period): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportView>, ServerError> {
    let period = ReportPeriod::try_from(period.as_str())?;
    let timezone = query
        .timezone
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

    let report = state
        .engine
        .report(user.id, period, &timezone, Utc::now())
        .await?;
    Ok(Json(ReportView {
        period: report.period.as_str().to_string(),
        summary: transactions::summary_view(&report.summary),
    }))
}
