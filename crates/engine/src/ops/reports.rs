//! Period reports over the transaction ledger.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, Transaction, TransactionKind};

use super::Engine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl TryFrom<&str> for ReportPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::Validation(format!(
                "invalid report period: {other}"
            ))),
        }
    }
}

/// Per-category expense total inside a report or summary window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
    pub count: u64,
}

/// Income/expense totals over an arbitrary window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_income: Money,
    pub total_expense: Money,
    pub net: Money,
    pub categories: Vec<CategoryTotal>,
}

/// A rendered period report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub period: ReportPeriod,
    pub summary: TransactionSummary,
}

fn summarize(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    transactions: &[Transaction],
) -> TransactionSummary {
    let mut total_income = Money::ZERO;
    let mut total_expense = Money::ZERO;
    let mut by_category: std::collections::HashMap<String, (Money, u64)> = Default::default();

    for tx in transactions {
        match tx.kind {
            TransactionKind::Income => total_income += tx.amount,
            TransactionKind::Expense => {
                total_expense += tx.amount;
                let entry = by_category
                    .entry(tx.category.clone())
                    .or_insert((Money::ZERO, 0));
                entry.0 += tx.amount;
                entry.1 += 1;
            }
        }
    }

    let mut categories: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();
    categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));

    TransactionSummary {
        from,
        to,
        total_income,
        total_expense,
        net: total_income - total_expense,
        categories,
    }
}

/// Report window start, computed in the user's timezone:
/// daily = local midnight, weekly = local midnight six days back,
/// monthly = first of the local month.
fn window_start(period: ReportPeriod, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&tz);
    let midnight = tz
        .with_ymd_and_hms(local.year(), local.month(), local.day(), 0, 0, 0)
        .single()
        .unwrap_or_else(|| tz.from_utc_datetime(&now.naive_utc()));
    let start = match period {
        ReportPeriod::Daily => midnight,
        ReportPeriod::Weekly => midnight - Duration::days(6),
        ReportPeriod::Monthly => tz
            .with_ymd_and_hms(local.year(), local.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(midnight),
    };
    start.with_timezone(&Utc)
}

impl Engine {
    /// Income/expense totals with a per-category expense breakdown over an
    /// explicit window.
    pub async fn transaction_summary(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<TransactionSummary> {
        let transactions = self.completed_in_window(user_id, None, from, to).await?;
        Ok(summarize(from, to, &transactions))
    }

    /// Period report whose window is anchored to the session timezone.
    pub async fn report(
        &self,
        user_id: Uuid,
        period: ReportPeriod,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Report> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| EngineError::Validation(format!("invalid timezone: {timezone}")))?;
        let from = window_start(period, tz, now);
        let summary = self.transaction_summary(user_id, from, now).await?;
        Ok(Report { period, summary })
    }
}
