//! Out-of-band budget aggregate reconciliation.
//!
//! The write path maintains spent totals incrementally and never recomputes
//! them. This routine is the drift detector/repair tool: it sums completed
//! expense transactions inside the budget window per category and rewrites
//! any stored total that disagrees. Run it explicitly (admin surface,
//! scheduled job), never inline with writes.

use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, TransactionKind, budgets, util::normalize_category_key,
};

use super::{Engine, with_tx};

/// Stored-vs-computed disagreement for a single category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDrift {
    pub category: String,
    pub stored: Money,
    pub computed: Money,
}

/// Outcome of one reconciliation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub budget_id: Uuid,
    pub drifts: Vec<CategoryDrift>,
    pub total_stored: Money,
    pub total_computed: Money,
    pub repaired: bool,
}

impl Engine {
    /// Recomputes one budget's spent totals from the ledger and repairs the
    /// stored aggregates when they drifted.
    pub async fn reconcile_budget(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
    ) -> ResultEngine<ReconcileReport> {
        let budget = self.budget(user_id, budget_id).await?;

        let expenses = self
            .completed_in_window(
                user_id,
                Some(TransactionKind::Expense),
                budget.start_date,
                budget.end_date,
            )
            .await?;

        let mut computed_by_key: std::collections::HashMap<String, i64> = budget
            .categories
            .iter()
            .map(|c| (normalize_category_key(&c.name), 0))
            .collect();
        for tx in &expenses {
            let key = normalize_category_key(&tx.category);
            if let Some(total) = computed_by_key.get_mut(&key) {
                *total += tx.amount.minor();
            }
        }

        let mut drifts = Vec::new();
        let mut total_computed = Money::ZERO;
        for category in &budget.categories {
            let key = normalize_category_key(&category.name);
            let computed = Money::new(computed_by_key.get(&key).copied().unwrap_or(0));
            total_computed += computed;
            if computed != category.spent {
                drifts.push(CategoryDrift {
                    category: category.name.clone(),
                    stored: category.spent,
                    computed,
                });
            }
        }

        let repaired = !drifts.is_empty() || total_computed != budget.total_spent;
        if repaired {
            tracing::warn!(
                budget = %budget.id,
                drifts = drifts.len(),
                "budget aggregates drifted from ledger, repairing"
            );
            with_tx!(self, |db_tx| async {
                for drift in &drifts {
                    budgets::categories::Entity::update_many()
                        .col_expr(
                            budgets::categories::Column::SpentMinor,
                            Expr::value(drift.computed.minor()),
                        )
                        .filter(budgets::categories::Column::BudgetId.eq(budget.id))
                        .filter(
                            budgets::categories::Column::NameNorm
                                .eq(normalize_category_key(&drift.category)),
                        )
                        .exec(&db_tx)
                        .await?;
                }
                budgets::Entity::update_many()
                    .col_expr(
                        budgets::Column::TotalSpentMinor,
                        Expr::value(total_computed.minor()),
                    )
                    .filter(budgets::Column::Id.eq(budget.id))
                    .exec(&db_tx)
                    .await?;
                Ok::<_, EngineError>(())
            }
            .await)?;
        }

        Ok(ReconcileReport {
            budget_id: budget.id,
            drifts,
            total_stored: budget.total_spent,
            total_computed,
            repaired,
        })
    }
}
