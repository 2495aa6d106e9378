//! Wire types shared by the HTTP server and its clients.
//!
//! Enumerated fields travel as the engine's snake_case labels
//! (`"expense"`, `"active"`, `"weekly"`, ...); the server validates them on
//! the way in. Monetary values are integer minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod session {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionInit {
        pub handle: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionView {
        pub id: Uuid,
        pub handle: String,
        pub status: String,
        pub last_active: DateTime<Utc>,
        pub language: String,
        pub timezone: String,
        pub auto_reply_enabled: bool,
        pub nlp_enabled: bool,
        pub nlp_confidence: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SessionStatusView {
        pub status: String,
        pub last_active: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PairingView {
        pub pairing_code: String,
    }

    /// Partial settings update; absent fields stay unchanged.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SettingsUpdateRequest {
        pub auto_reply_enabled: Option<bool>,
        pub auto_reply_text: Option<String>,
        pub notify_budget_alerts: Option<bool>,
        pub notify_daily_summary: Option<bool>,
        pub notify_weekly_report: Option<bool>,
        pub language: Option<String>,
        pub timezone: Option<String>,
        pub nlp_enabled: Option<bool>,
        pub nlp_confidence: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PhraseView {
        pub phrase: String,
        pub intent: String,
        #[serde(default)]
        pub examples: Vec<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PhrasesRequest {
        pub phrases: Vec<PhraseView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorLogView {
        pub at: DateTime<Utc>,
        pub error: String,
        pub context: serde_json::Value,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LogQuery {
        pub offset: Option<u64>,
        pub limit: Option<u64>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LocationView {
        pub name: String,
        pub latitude: Option<f64>,
        pub longitude: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: String,
        pub amount_minor: i64,
        pub category: Option<String>,
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<Utc>>,
        pub status: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
        pub location: Option<LocationView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdateRequest {
        pub kind: Option<String>,
        pub amount_minor: Option<i64>,
        pub category: Option<String>,
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<Utc>>,
        pub status: Option<String>,
        pub tags: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: String,
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub source: String,
        pub chat_handle: Option<String>,
        pub status: String,
        pub tags: Vec<String>,
        pub location: Option<LocationView>,
    }

    /// Create/update/delete responses carry the budget alerts the write
    /// triggered so clients can surface them immediately.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionWriteResponse {
        pub transaction: Option<TransactionView>,
        pub alerts: Vec<super::budget::AlertView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub kind: Option<String>,
        pub category: Option<String>,
        pub source: Option<String>,
        pub offset: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub total: u64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryTotalView {
        pub category: String,
        pub total_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryView {
        pub from: DateTime<Utc>,
        pub to: DateTime<Utc>,
        pub total_income_minor: i64,
        pub total_expense_minor: i64,
        pub net_minor: i64,
        pub categories: Vec<CategoryTotalView>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub limit_minor: i64,
        pub color: Option<String>,
        pub notify_enabled: Option<bool>,
        pub notify_threshold: Option<u8>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNewRequest {
        pub name: String,
        pub period: String,
        pub start_date: DateTime<Utc>,
        pub end_date: DateTime<Utc>,
        pub categories: Vec<CategoryNew>,
        pub total_budget_minor: i64,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdateRequest {
        pub name: Option<String>,
        pub period: Option<String>,
        pub start_date: Option<DateTime<Utc>>,
        pub end_date: Option<DateTime<Utc>>,
        pub status: Option<String>,
        pub categories: Option<Vec<CategoryNew>>,
        pub total_budget_minor: Option<i64>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub name: String,
        pub limit_minor: i64,
        pub spent_minor: i64,
        pub color: String,
        pub notify_enabled: bool,
        pub notify_threshold: u8,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub name: String,
        pub period: String,
        pub start_date: DateTime<Utc>,
        pub end_date: DateTime<Utc>,
        pub status: String,
        pub total_budget_minor: i64,
        pub total_spent_minor: i64,
        pub categories: Vec<CategoryView>,
        pub notes: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetListQuery {
        pub status: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetDetailResponse {
        pub budget: BudgetView,
        pub transactions: Vec<super::transaction::TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategorySummaryView {
        pub name: String,
        pub limit_minor: i64,
        pub spent_minor: i64,
        pub remaining_minor: i64,
        pub percent_used: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSummaryView {
        pub budget_id: Uuid,
        pub name: String,
        pub period: String,
        pub start_date: DateTime<Utc>,
        pub end_date: DateTime<Utc>,
        pub total_budget_minor: i64,
        pub total_spent_minor: i64,
        pub remaining_minor: i64,
        pub percent_used: f64,
        pub categories: Vec<CategorySummaryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AlertView {
        pub budget_id: Uuid,
        pub budget_name: String,
        pub scope: String,
        pub category: Option<String>,
        pub percent_used: Option<f64>,
        pub severity: String,
        pub message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DriftView {
        pub category: String,
        pub stored_minor: i64,
        pub computed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileResponse {
        pub budget_id: Uuid,
        pub drifts: Vec<DriftView>,
        pub total_stored_minor: i64,
        pub total_computed_minor: i64,
        pub repaired: bool,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportQuery {
        /// IANA timezone name; defaults to the server's report default.
        pub timezone: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportView {
        pub period: String,
        pub summary: super::transaction::SummaryView,
    }
}
