//! Budget operations and the spent-total consistency engine.
//!
//! `apply_delta` is the single write path for spent totals: transaction
//! create/update/delete all funnel through it. Increments happen as
//! single-statement column updates so concurrent writers (chat workers, the
//! HTTP API) can never lose each other's deltas to a read-modify-write race.

use chrono::Utc;
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Budget, BudgetAlert, BudgetStatus, BudgetUpdate, EngineError, Money, NewBudget,
    NewBudgetCategory, ResultEngine, budgets, evaluate_budget, usage_percent,
    util::{normalize_category_key, normalize_required_name},
};

use super::{Engine, with_tx};

const DEFAULT_CATEGORY_COLOR: &str = "#000000";

/// Read-model row for the budget overview surfaces (chat replies, API).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget_id: Uuid,
    pub name: String,
    pub period: crate::BudgetPeriod,
    pub start_date: chrono::DateTime<Utc>,
    pub end_date: chrono::DateTime<Utc>,
    pub total_budget: Money,
    pub total_spent: Money,
    pub remaining: Money,
    pub percent_used: f64,
    pub categories: Vec<CategorySummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub limit: Money,
    pub spent: Money,
    pub remaining: Money,
    pub percent_used: f64,
}

impl From<&Budget> for BudgetSummary {
    fn from(budget: &Budget) -> Self {
        Self {
            budget_id: budget.id,
            name: budget.name.clone(),
            period: budget.period,
            start_date: budget.start_date,
            end_date: budget.end_date,
            total_budget: budget.total_budget,
            total_spent: budget.total_spent,
            remaining: budget.remaining(),
            percent_used: usage_percent(budget.total_spent, budget.total_budget),
            categories: budget
                .categories
                .iter()
                .map(|category| CategorySummary {
                    name: category.name.clone(),
                    limit: category.limit,
                    spent: category.spent,
                    remaining: category.limit - category.spent,
                    percent_used: usage_percent(category.spent, category.limit),
                })
                .collect(),
        }
    }
}

fn validate_categories(
    categories: &[NewBudgetCategory],
    total_budget: Money,
) -> ResultEngine<()> {
    let mut seen = std::collections::HashSet::new();
    let mut sum = Money::ZERO;
    for category in categories {
        let name = normalize_required_name(&category.name, "category")?;
        if category.limit.is_negative() {
            return Err(EngineError::Validation(format!(
                "category '{name}' limit must be >= 0"
            )));
        }
        if category.notifications.threshold > 100 {
            return Err(EngineError::Validation(format!(
                "category '{name}' threshold must be 0-100"
            )));
        }
        if !seen.insert(normalize_category_key(&name)) {
            return Err(EngineError::ExistingKey(name));
        }
        sum = sum
            .checked_add(category.limit)
            .ok_or_else(|| EngineError::Validation("category limits overflow".to_string()))?;
    }
    if sum != total_budget {
        return Err(EngineError::Validation(
            "total budget must match sum of category limits".to_string(),
        ));
    }
    Ok(())
}

fn category_rows(
    budget_id: Uuid,
    categories: &[NewBudgetCategory],
    spent_by_key: &std::collections::HashMap<String, i64>,
) -> Vec<budgets::categories::ActiveModel> {
    categories
        .iter()
        .enumerate()
        .map(|(position, category)| {
            let name = crate::normalize_category_display(&category.name);
            let name_norm = normalize_category_key(&name);
            let spent = spent_by_key.get(&name_norm).copied().unwrap_or(0);
            budgets::categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                budget_id: ActiveValue::Set(budget_id),
                name: ActiveValue::Set(name),
                name_norm: ActiveValue::Set(name_norm),
                limit_minor: ActiveValue::Set(category.limit.minor()),
                spent_minor: ActiveValue::Set(spent),
                color: ActiveValue::Set(
                    category
                        .color
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
                ),
                notify_enabled: ActiveValue::Set(category.notifications.enabled),
                notify_threshold: ActiveValue::Set(i32::from(category.notifications.threshold)),
                position: ActiveValue::Set(position as i32),
            }
        })
        .collect()
}

impl Engine {
    /// Creates a budget after checking the total-vs-category-limits
    /// invariant. Spent totals always start at zero.
    pub async fn create_budget(&self, cmd: NewBudget) -> ResultEngine<Budget> {
        let name = normalize_required_name(&cmd.name, "budget")?;
        if cmd.end_date < cmd.start_date {
            return Err(EngineError::Validation(
                "budget end date before start date".to_string(),
            ));
        }
        validate_categories(&cmd.categories, cmd.total_budget)?;

        let budget = Budget {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name,
            period: cmd.period,
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            categories: Vec::new(),
            total_budget: cmd.total_budget,
            total_spent: Money::ZERO,
            status: BudgetStatus::Active,
            notifications: cmd.notifications.clone(),
            recurrence: cmd.recurrence,
            notes: cmd.notes.clone(),
        };

        let rows = category_rows(budget.id, &cmd.categories, &Default::default());
        with_tx!(self, |db_tx| async {
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            for row in rows {
                row.insert(&db_tx).await?;
            }
            Ok::<_, EngineError>(())
        }
        .await)?;

        self.budget(cmd.user_id, budget.id).await
    }

    /// Updates a budget. When the category list changes, spent totals carry
    /// over by (normalized) category name; removed categories drop their
    /// contribution from `total_spent`.
    pub async fn update_budget(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        update: BudgetUpdate,
    ) -> ResultEngine<Budget> {
        let current = self.budget(user_id, budget_id).await?;

        if let Some(categories) = &update.categories {
            let total = update.total_budget.unwrap_or(current.total_budget);
            validate_categories(categories, total)?;
        } else if let Some(total) = update.total_budget {
            let sum = current
                .categories
                .iter()
                .fold(Money::ZERO, |acc, c| acc + c.limit);
            if total != sum {
                return Err(EngineError::Validation(
                    "total budget must match sum of category limits".to_string(),
                ));
            }
        }

        let start_date = update.start_date.unwrap_or(current.start_date);
        let end_date = update.end_date.unwrap_or(current.end_date);
        if end_date < start_date {
            return Err(EngineError::Validation(
                "budget end date before start date".to_string(),
            ));
        }

        with_tx!(self, |db_tx| async {
            let mut active: budgets::ActiveModel = budgets::Entity::find_by_id(budget_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("budget".to_string()))?
                .into();

            if let Some(name) = &update.name {
                active.name = ActiveValue::Set(normalize_required_name(name, "budget")?);
            }
            if let Some(period) = update.period {
                active.period = ActiveValue::Set(period.as_str().to_string());
            }
            active.start_date = ActiveValue::Set(start_date);
            active.end_date = ActiveValue::Set(end_date);
            if let Some(status) = update.status {
                active.status = ActiveValue::Set(status.as_str().to_string());
            }
            if let Some(notifications) = &update.notifications {
                active.notify_enabled = ActiveValue::Set(notifications.enabled);
                active.notify_frequency =
                    ActiveValue::Set(notifications.frequency.as_str().to_string());
                active.notify_chat = ActiveValue::Set(notifications.chat);
                active.notify_email = ActiveValue::Set(notifications.email);
            }
            if let Some(notes) = &update.notes {
                active.notes = ActiveValue::Set(Some(notes.clone()));
            }

            if let Some(categories) = &update.categories {
                let spent_by_key: std::collections::HashMap<String, i64> = current
                    .categories
                    .iter()
                    .map(|c| (normalize_category_key(&c.name), c.spent.minor()))
                    .collect();
                let rows = category_rows(budget_id, categories, &spent_by_key);
                let total_spent: i64 = rows
                    .iter()
                    .map(|row| match &row.spent_minor {
                        ActiveValue::Set(v) => *v,
                        _ => 0,
                    })
                    .sum();

                budgets::categories::Entity::delete_many()
                    .filter(budgets::categories::Column::BudgetId.eq(budget_id))
                    .exec(&db_tx)
                    .await?;
                for row in rows {
                    row.insert(&db_tx).await?;
                }

                active.total_spent_minor = ActiveValue::Set(total_spent);
                active.total_budget_minor = ActiveValue::Set(
                    update
                        .total_budget
                        .unwrap_or(current.total_budget)
                        .minor(),
                );
            }

            active.update(&db_tx).await?;
            Ok::<_, EngineError>(())
        }
        .await)?;

        self.budget(user_id, budget_id).await
    }

    pub async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<()> {
        // Ownership check before the cascade delete.
        self.budget(user_id, budget_id).await?;
        budgets::Entity::delete_by_id(budget_id)
            .exec(&self.database)
            .await?;
        Ok(())
    }

    pub async fn budget(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id)
            .one(&self.database)
            .await?
            .filter(|model| model.user_id == user_id)
            .ok_or_else(|| EngineError::KeyNotFound("budget".to_string()))?;
        let rows = budgets::categories::Entity::find()
            .filter(budgets::categories::Column::BudgetId.eq(budget_id))
            .order_by_asc(budgets::categories::Column::Position)
            .all(&self.database)
            .await?;
        Budget::from_rows(model, rows)
    }

    /// A budget together with the completed expense transactions dated
    /// inside its window (any category, matching the web detail view).
    pub async fn budget_with_transactions(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
    ) -> ResultEngine<(Budget, Vec<crate::Transaction>)> {
        let budget = self.budget(user_id, budget_id).await?;
        let transactions = self
            .completed_in_window(
                user_id,
                Some(crate::TransactionKind::Expense),
                budget.start_date,
                budget.end_date,
            )
            .await?;
        Ok((budget, transactions))
    }

    /// Lists a user's budgets, newest window first, optionally filtered by
    /// status.
    pub async fn budgets(
        &self,
        user_id: Uuid,
        status: Option<BudgetStatus>,
    ) -> ResultEngine<Vec<Budget>> {
        let mut query = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_desc(budgets::Column::StartDate);
        if let Some(status) = status {
            query = query.filter(budgets::Column::Status.eq(status.as_str()));
        }
        let models = query.all(&self.database).await?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            let rows = budgets::categories::Entity::find()
                .filter(budgets::categories::Column::BudgetId.eq(model.id))
                .order_by_asc(budgets::categories::Column::Position)
                .all(&self.database)
                .await?;
            result.push(Budget::from_rows(model, rows)?);
        }
        Ok(result)
    }

    /// Budgets that count for consistency right now: `active` status and a
    /// window containing the wall clock. A budget whose window has elapsed
    /// is excluded even for transactions dated inside it.
    pub async fn active_budgets(&self, user_id: Uuid) -> ResultEngine<Vec<Budget>> {
        let now = Utc::now();
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::Status.eq(BudgetStatus::Active.as_str()))
            .filter(budgets::Column::StartDate.lte(now))
            .filter(budgets::Column::EndDate.gte(now))
            .order_by_desc(budgets::Column::StartDate)
            .all(&self.database)
            .await?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            let rows = budgets::categories::Entity::find()
                .filter(budgets::categories::Column::BudgetId.eq(model.id))
                .order_by_asc(budgets::categories::Column::Position)
                .all(&self.database)
                .await?;
            result.push(Budget::from_rows(model, rows)?);
        }
        Ok(result)
    }

    /// Overview of the user's currently active budgets, built from the
    /// incrementally maintained totals.
    pub async fn budget_summaries(&self, user_id: Uuid) -> ResultEngine<Vec<BudgetSummary>> {
        let budgets = self.active_budgets(user_id).await?;
        Ok(budgets.iter().map(BudgetSummary::from).collect())
    }

    /// On-demand alert evaluation over the active budgets.
    pub async fn budget_alerts(&self, user_id: Uuid) -> ResultEngine<Vec<BudgetAlert>> {
        let budgets = self.active_budgets(user_id).await?;
        Ok(budgets.iter().flat_map(evaluate_budget).collect())
    }

    /// Sets or adds one category limit on the most recently started active
    /// budget, keeping `total_budget` equal to the sum of limits.
    pub async fn upsert_category_limit(
        &self,
        user_id: Uuid,
        category: &str,
        limit: Money,
    ) -> ResultEngine<Budget> {
        let name = normalize_required_name(category, "category")?;
        if limit.is_negative() {
            return Err(EngineError::Validation(format!(
                "category '{name}' limit must be >= 0"
            )));
        }

        let budget = self
            .active_budgets(user_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::KeyNotFound("active budget".to_string()))?;

        let name_norm = normalize_category_key(&name);
        let existing = budget
            .categories
            .iter()
            .find(|c| normalize_category_key(&c.name) == name_norm)
            .cloned();
        let total_delta = match &existing {
            Some(current) => limit - current.limit,
            None => limit,
        };

        with_tx!(self, |db_tx| async {
            match existing {
                Some(_) => {
                    budgets::categories::Entity::update_many()
                        .col_expr(budgets::categories::Column::LimitMinor, Expr::value(limit.minor()))
                        .filter(budgets::categories::Column::BudgetId.eq(budget.id))
                        .filter(budgets::categories::Column::NameNorm.eq(name_norm.clone()))
                        .exec(&db_tx)
                        .await?;
                }
                None => {
                    let row = budgets::categories::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        budget_id: ActiveValue::Set(budget.id),
                        name: ActiveValue::Set(name.clone()),
                        name_norm: ActiveValue::Set(name_norm.clone()),
                        limit_minor: ActiveValue::Set(limit.minor()),
                        spent_minor: ActiveValue::Set(0),
                        color: ActiveValue::Set(DEFAULT_CATEGORY_COLOR.to_string()),
                        notify_enabled: ActiveValue::Set(true),
                        notify_threshold: ActiveValue::Set(80),
                        position: ActiveValue::Set(budget.categories.len() as i32),
                    };
                    row.insert(&db_tx).await?;
                }
            }

            budgets::Entity::update_many()
                .col_expr(
                    budgets::Column::TotalBudgetMinor,
                    Expr::col(budgets::Column::TotalBudgetMinor).add(total_delta.minor()),
                )
                .filter(budgets::Column::Id.eq(budget.id))
                .exec(&db_tx)
                .await?;
            Ok::<_, EngineError>(())
        }
        .await)?;

        self.budget(user_id, budget.id).await
    }

    /// Adjusts the spent totals of every active budget carrying `category`.
    ///
    /// `delta` is signed: positive adds to spend, negative reverses it. Each
    /// budget's pair of increments runs in its own storage transaction as
    /// single-statement column updates, so concurrent deltas interleave
    /// without losing updates. Returns the alerts firing on the budgets that
    /// were touched.
    pub async fn apply_delta(
        &self,
        user_id: Uuid,
        category: &str,
        delta: Money,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        if delta.is_zero() {
            return Ok(Vec::new());
        }

        let name_norm = normalize_category_key(category);
        let budgets_now = self.active_budgets(user_id).await?;

        let mut alerts = Vec::new();
        for budget in budgets_now {
            let matches = budget
                .categories
                .iter()
                .any(|c| normalize_category_key(&c.name) == name_norm);
            if !matches {
                continue;
            }

            self.apply_delta_to_budget(budget.id, &name_norm, delta)
                .await?;

            let updated = self.budget(user_id, budget.id).await?;
            alerts.extend(evaluate_budget(&updated));
        }

        Ok(alerts)
    }

    async fn apply_delta_to_budget(
        &self,
        budget_id: Uuid,
        name_norm: &str,
        delta: Money,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| async {
            let updated = budgets::categories::Entity::update_many()
                .col_expr(
                    budgets::categories::Column::SpentMinor,
                    Expr::col(budgets::categories::Column::SpentMinor).add(delta.minor()),
                )
                .filter(budgets::categories::Column::BudgetId.eq(budget_id))
                .filter(budgets::categories::Column::NameNorm.eq(name_norm))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::ConsistencyConflict(format!(
                    "category '{name_norm}' vanished during update"
                )));
            }

            let updated = budgets::Entity::update_many()
                .col_expr(
                    budgets::Column::TotalSpentMinor,
                    Expr::col(budgets::Column::TotalSpentMinor).add(delta.minor()),
                )
                .filter(budgets::Column::Id.eq(budget_id))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::ConsistencyConflict(format!(
                    "budget {budget_id} vanished during update"
                )));
            }
            Ok::<_, EngineError>(())
        }
        .await)
    }
}
