//! Budget primitives.
//!
//! A `Budget` covers a date window and carries an ordered list of category
//! rows, each with its own limit and running spent total. The running totals
//! are maintained incrementally by the consistency engine; see
//! `ops::budgets` for the write paths and `ops::reconcile` for the
//! out-of-band repair routine.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Custom => "custom",
        }
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::Validation(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl BudgetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for BudgetStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid budget status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Never,
}

impl NotifyFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Never => "never",
        }
    }
}

impl TryFrom<&str> for NotifyFrequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "never" => Ok(Self::Never),
            other => Err(EngineError::Validation(format!(
                "invalid notification frequency: {other}"
            ))),
        }
    }
}

/// Auto-renewal configuration for recurring budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: BudgetPeriod,
    pub auto_renew: bool,
}

/// Per-category alert configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNotifications {
    pub enabled: bool,
    /// Percent of the limit at which the category alert fires, 0-100.
    pub threshold: u8,
}

impl Default for CategoryNotifications {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 80,
        }
    }
}

/// One category row of a budget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub name: String,
    pub limit: Money,
    pub spent: Money,
    pub color: String,
    pub notifications: CategoryNotifications,
}

/// Budget-level notification configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetNotifications {
    pub enabled: bool,
    pub frequency: NotifyFrequency,
    pub chat: bool,
    pub email: bool,
}

impl Default for BudgetNotifications {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: NotifyFrequency::Weekly,
            chat: true,
            email: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub categories: Vec<BudgetCategory>,
    pub total_budget: Money,
    pub total_spent: Money,
    pub status: BudgetStatus,
    pub notifications: BudgetNotifications,
    pub recurrence: Option<Recurrence>,
    pub notes: Option<String>,
}

impl Budget {
    /// A budget is active for consistency purposes iff its status is
    /// `active` and its window contains `now` (wall clock, not the
    /// transaction date).
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BudgetStatus::Active && self.start_date <= now && now <= self.end_date
    }

    #[must_use]
    pub fn remaining(&self) -> Money {
        self.total_budget - self.total_spent
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub period: String,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    pub total_budget_minor: i64,
    pub total_spent_minor: i64,
    pub status: String,
    pub notify_enabled: bool,
    pub notify_frequency: String,
    pub notify_chat: bool,
    pub notify_email: bool,
    pub recurring_frequency: Option<String>,
    pub auto_renew: Option<bool>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "categories::Entity")]
    Categories,
}

impl Related<categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Budget {
    /// Rebuild the domain view from a budget row and its ordered category
    /// rows.
    pub fn from_rows(model: Model, rows: Vec<categories::Model>) -> Result<Self, EngineError> {
        let categories = rows
            .into_iter()
            .map(|row| BudgetCategory {
                name: row.name,
                limit: Money::new(row.limit_minor),
                spent: Money::new(row.spent_minor),
                color: row.color,
                notifications: CategoryNotifications {
                    enabled: row.notify_enabled,
                    threshold: row.notify_threshold.clamp(0, 100) as u8,
                },
            })
            .collect();

        let recurrence = match (model.recurring_frequency.as_deref(), model.auto_renew) {
            (Some(freq), auto_renew) => Some(Recurrence {
                frequency: BudgetPeriod::try_from(freq)?,
                auto_renew: auto_renew.unwrap_or(true),
            }),
            (None, _) => None,
        };

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            period: BudgetPeriod::try_from(model.period.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            categories,
            total_budget: Money::new(model.total_budget_minor),
            total_spent: Money::new(model.total_spent_minor),
            status: BudgetStatus::try_from(model.status.as_str())?,
            notifications: BudgetNotifications {
                enabled: model.notify_enabled,
                frequency: NotifyFrequency::try_from(model.notify_frequency.as_str())?,
                chat: model.notify_chat,
                email: model.notify_email,
            },
            recurrence,
            notes: model.notes,
        })
    }
}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id),
            user_id: ActiveValue::Set(budget.user_id),
            name: ActiveValue::Set(budget.name.clone()),
            period: ActiveValue::Set(budget.period.as_str().to_string()),
            start_date: ActiveValue::Set(budget.start_date),
            end_date: ActiveValue::Set(budget.end_date),
            total_budget_minor: ActiveValue::Set(budget.total_budget.minor()),
            total_spent_minor: ActiveValue::Set(budget.total_spent.minor()),
            status: ActiveValue::Set(budget.status.as_str().to_string()),
            notify_enabled: ActiveValue::Set(budget.notifications.enabled),
            notify_frequency: ActiveValue::Set(budget.notifications.frequency.as_str().to_string()),
            notify_chat: ActiveValue::Set(budget.notifications.chat),
            notify_email: ActiveValue::Set(budget.notifications.email),
            recurring_frequency: ActiveValue::Set(
                budget
                    .recurrence
                    .map(|r| r.frequency.as_str().to_string()),
            ),
            auto_renew: ActiveValue::Set(budget.recurrence.map(|r| r.auto_renew)),
            notes: ActiveValue::Set(budget.notes.clone()),
            created_at: ActiveValue::Set(Utc::now()),
        }
    }
}

pub mod categories {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "budget_categories")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub budget_id: Uuid,
        pub name: String,
        pub name_norm: String,
        pub limit_minor: i64,
        pub spent_minor: i64,
        pub color: String,
        pub notify_enabled: bool,
        pub notify_threshold: i32,
        pub position: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::BudgetId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "Cascade"
        )]
        Budget,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Budget.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
