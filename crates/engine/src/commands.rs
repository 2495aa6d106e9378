//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Attachment, BudgetNotifications, BudgetPeriod, BudgetStatus, CategoryNotifications, Language,
    Location, Money, Recurrence, TransactionKind, TransactionSource, TransactionStatus,
};

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub source: TransactionSource,
    pub chat_handle: Option<String>,
    pub status: TransactionStatus,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub location: Option<Location>,
}

impl NewTransaction {
    #[must_use]
    pub fn new(user_id: Uuid, kind: TransactionKind, amount: Money) -> Self {
        Self {
            user_id,
            kind,
            amount,
            category: None,
            description: None,
            occurred_at: None,
            source: TransactionSource::Web,
            chat_handle: None,
            status: TransactionStatus::Completed,
            tags: Vec::new(),
            attachments: Vec::new(),
            location: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn source(mut self, source: TransactionSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn chat_handle(mut self, handle: impl Into<String>) -> Self {
        self.chat_handle = Some(handle.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Update an existing transaction. Unset fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub status: Option<TransactionStatus>,
    pub tags: Option<Vec<String>>,
}

impl TransactionUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

/// Transaction list filter; all fields optional.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub source: Option<TransactionSource>,
    pub offset: u64,
    pub limit: u64,
}

impl TransactionFilter {
    pub const DEFAULT_LIMIT: u64 = 10;
}

/// One category row of a budget create/update command.
#[derive(Clone, Debug)]
pub struct NewBudgetCategory {
    pub name: String,
    pub limit: Money,
    pub color: Option<String>,
    pub notifications: CategoryNotifications,
}

impl NewBudgetCategory {
    #[must_use]
    pub fn new(name: impl Into<String>, limit: Money) -> Self {
        Self {
            name: name.into(),
            limit,
            color: None,
            notifications: CategoryNotifications::default(),
        }
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn notifications(mut self, notifications: CategoryNotifications) -> Self {
        self.notifications = notifications;
        self
    }
}

/// Create a budget.
#[derive(Clone, Debug)]
pub struct NewBudget {
    pub user_id: Uuid,
    pub name: String,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub categories: Vec<NewBudgetCategory>,
    pub total_budget: Money,
    pub notifications: BudgetNotifications,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

impl NewBudget {
    #[must_use]
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        period: BudgetPeriod,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            period,
            start_date,
            end_date,
            categories: Vec::new(),
            total_budget: Money::ZERO,
            notifications: BudgetNotifications::default(),
            recurrence: None,
            notes: None,
        }
    }

    /// Adds a category and keeps `total_budget` in sync with the sum of
    /// limits.
    #[must_use]
    pub fn category(mut self, category: NewBudgetCategory) -> Self {
        self.total_budget += category.limit;
        self.categories.push(category);
        self
    }

    #[must_use]
    pub fn total_budget(mut self, total: Money) -> Self {
        self.total_budget = total;
        self
    }

    #[must_use]
    pub fn notifications(mut self, notifications: BudgetNotifications) -> Self {
        self.notifications = notifications;
        self
    }

    #[must_use]
    pub fn recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Update an existing budget. Unset fields are left unchanged; when
/// `categories` is set, `total_budget` must match the new sum of limits.
#[derive(Clone, Debug, Default)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<BudgetStatus>,
    pub categories: Option<Vec<NewBudgetCategory>>,
    pub total_budget: Option<Money>,
    pub notifications: Option<BudgetNotifications>,
    pub notes: Option<String>,
}

impl BudgetUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn period(mut self, period: BudgetPeriod) -> Self {
        self.period = Some(period);
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn status(mut self, status: BudgetStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn categories(mut self, categories: Vec<NewBudgetCategory>) -> Self {
        self.categories = Some(categories);
        self
    }

    #[must_use]
    pub fn total_budget(mut self, total: Money) -> Self {
        self.total_budget = Some(total);
        self
    }

    #[must_use]
    pub fn notifications(mut self, notifications: BudgetNotifications) -> Self {
        self.notifications = Some(notifications);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Update session behavior settings. Unset fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct SettingsUpdate {
    pub auto_reply_enabled: Option<bool>,
    pub auto_reply_text: Option<String>,
    pub notify_budget_alerts: Option<bool>,
    pub notify_daily_summary: Option<bool>,
    pub notify_weekly_report: Option<bool>,
    pub language: Option<Language>,
    pub timezone: Option<String>,
}

/// Update session classifier settings. Unset fields are left unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NlpUpdate {
    pub enabled: Option<bool>,
    pub confidence: Option<f64>,
}
