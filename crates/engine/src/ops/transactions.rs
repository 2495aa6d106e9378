//! Transaction write paths and their budget reconciliation hooks.
//!
//! Every mutation of a completed expense funnels a signed delta through
//! `apply_delta` (see `ops::budgets`): `+amount` on create, a full reversal
//! followed by a full reapplication on edit, `-amount` on delete. Applying
//! only the difference between old and new amounts would be wrong whenever
//! the category changes too, since the two values may target different
//! budgets.

use chrono::Utc;
use sea_orm::{ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    BudgetAlert, EngineError, Money, NewTransaction, ResultEngine, Transaction, TransactionFilter,
    TransactionKind, TransactionStatus, TransactionUpdate, transactions,
    util::normalize_category_key,
};

use super::Engine;

pub(crate) const UNCATEGORIZED: &str = "uncategorized";

fn is_completed_expense(kind: TransactionKind, status: TransactionStatus) -> bool {
    kind == TransactionKind::Expense && status == TransactionStatus::Completed
}

impl Engine {
    /// Creates a transaction; a completed expense immediately feeds the
    /// budgets carrying its category.
    pub async fn create_transaction(
        &self,
        cmd: NewTransaction,
    ) -> ResultEngine<(Transaction, Vec<BudgetAlert>)> {
        if cmd.amount.is_negative() {
            return Err(EngineError::Validation(
                "amount must be >= 0".to_string(),
            ));
        }

        let category = cmd
            .category
            .as_deref()
            .map(crate::normalize_category_display)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            kind: cmd.kind,
            amount: cmd.amount,
            category,
            description: cmd.description,
            occurred_at: cmd.occurred_at.unwrap_or_else(Utc::now),
            source: cmd.source,
            chat_handle: cmd.chat_handle,
            status: cmd.status,
            tags: cmd.tags,
            attachments: cmd.attachments,
            location: cmd.location,
        };

        transactions::ActiveModel::from(&tx)
            .insert(&self.database)
            .await?;

        let alerts = if is_completed_expense(tx.kind, tx.status) {
            self.apply_delta_with_retry(tx.user_id, &tx.category, tx.amount)
                .await?
        } else {
            Vec::new()
        };

        Ok((tx, alerts))
    }

    /// Edits a transaction. The previous completed-expense contribution is
    /// fully reversed before the edit is persisted; the new state is applied
    /// afterwards.
    pub async fn update_transaction(
        &self,
        user_id: Uuid,
        tx_id: Uuid,
        update: TransactionUpdate,
    ) -> ResultEngine<(Transaction, Vec<BudgetAlert>)> {
        let old = self.transaction(user_id, tx_id).await?;

        if let Some(amount) = update.amount
            && amount.is_negative()
        {
            return Err(EngineError::Validation(
                "amount must be >= 0".to_string(),
            ));
        }

        let mut alerts = Vec::new();
        if is_completed_expense(old.kind, old.status) {
            alerts.extend(
                self.apply_delta_with_retry(user_id, &old.category, -old.amount)
                    .await?,
            );
        }

        let mut active: transactions::ActiveModel = transactions::Entity::find_by_id(tx_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction".to_string()))?
            .into();

        if let Some(kind) = update.kind {
            active.kind = ActiveValue::Set(kind.as_str().to_string());
        }
        if let Some(amount) = update.amount {
            active.amount_minor = ActiveValue::Set(amount.minor());
        }
        if let Some(category) = &update.category {
            let display = crate::normalize_category_display(category);
            let display = if display.is_empty() {
                UNCATEGORIZED.to_string()
            } else {
                display
            };
            active.category_norm = ActiveValue::Set(normalize_category_key(&display));
            active.category = ActiveValue::Set(display);
        }
        if let Some(description) = &update.description {
            active.description = ActiveValue::Set(Some(description.clone()));
        }
        if let Some(occurred_at) = update.occurred_at {
            active.occurred_at = ActiveValue::Set(occurred_at);
        }
        if let Some(status) = update.status {
            active.status = ActiveValue::Set(status.as_str().to_string());
        }
        if let Some(tags) = &update.tags {
            let encoded = (!tags.is_empty())
                .then(|| serde_json::to_string(tags).ok())
                .flatten();
            active.tags = ActiveValue::Set(encoded);
        }

        let new: Transaction = active.update(&self.database).await?.try_into()?;

        if is_completed_expense(new.kind, new.status) {
            alerts.extend(
                self.apply_delta_with_retry(user_id, &new.category, new.amount)
                    .await?,
            );
        }

        Ok((new, alerts))
    }

    /// Deletes a transaction, reversing its budget contribution first.
    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        tx_id: Uuid,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        let tx = self.transaction(user_id, tx_id).await?;

        let alerts = if is_completed_expense(tx.kind, tx.status) {
            self.apply_delta_with_retry(user_id, &tx.category, -tx.amount)
                .await?
        } else {
            Vec::new()
        };

        transactions::Entity::delete_by_id(tx_id)
            .exec(&self.database)
            .await?;

        Ok(alerts)
    }

    pub async fn transaction(&self, user_id: Uuid, tx_id: Uuid) -> ResultEngine<Transaction> {
        transactions::Entity::find_by_id(tx_id)
            .one(&self.database)
            .await?
            .filter(|model| model.user_id == user_id)
            .ok_or_else(|| EngineError::KeyNotFound("transaction".to_string()))?
            .try_into()
    }

    /// Lists transactions newest first; returns the page and the total
    /// matching count.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionFilter,
    ) -> ResultEngine<(Vec<Transaction>, u64)> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id));

        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lte(to));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = &filter.category {
            query = query
                .filter(transactions::Column::CategoryNorm.eq(normalize_category_key(category)));
        }
        if let Some(source) = filter.source {
            query = query.filter(transactions::Column::Source.eq(source.as_str()));
        }

        let total = query.clone().count(&self.database).await?;

        let limit = if filter.limit == 0 {
            TransactionFilter::DEFAULT_LIMIT
        } else {
            filter.limit
        };
        let models = query
            .order_by_desc(transactions::Column::OccurredAt)
            .offset(filter.offset)
            .limit(limit)
            .all(&self.database)
            .await?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            result.push(Transaction::try_from(model)?);
        }
        Ok((result, total))
    }

    pub(crate) async fn completed_in_window(
        &self,
        user_id: Uuid,
        kind: Option<TransactionKind>,
        from: chrono::DateTime<Utc>,
        to: chrono::DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Completed.as_str()))
            .filter(transactions::Column::OccurredAt.gte(from))
            .filter(transactions::Column::OccurredAt.lte(to));
        if let Some(kind) = kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        let models = query
            .order_by_desc(transactions::Column::OccurredAt)
            .all(&self.database)
            .await?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            result.push(Transaction::try_from(model)?);
        }
        Ok(result)
    }

    async fn apply_delta_with_retry(
        &self,
        user_id: Uuid,
        category: &str,
        delta: Money,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        match self.apply_delta(user_id, category, delta).await {
            Ok(alerts) => Ok(alerts),
            Err(err @ (EngineError::Database(_) | EngineError::ConsistencyConflict(_))) => {
                tracing::warn!("budget delta failed, retrying once: {err}");
                self.apply_delta(user_id, category, delta).await
            }
            Err(err) => Err(err),
        }
    }
}
