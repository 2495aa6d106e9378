//! Budget alert threshold evaluation.
//!
//! Pure functions over an already-loaded [`Budget`]; the write paths call
//! [`evaluate_budget`] right after every spent-total change so alerts can be
//! delivered in real time, and the read paths call it on demand.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Budget, BudgetCategory, Money};

/// Overall usage percentage at which a budget-wide alert fires.
pub const OVERALL_THRESHOLD_PERCENT: f64 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertScope {
    Overall,
    Category,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Medium,
    High,
}

/// A triggered budget threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub budget_id: Uuid,
    pub budget_name: String,
    pub scope: AlertScope,
    pub category: Option<String>,
    pub percent_used: f64,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Usage percentage with the zero-limit convention: a zero limit reads as 0%
/// while nothing is spent and as infinitely exceeded as soon as anything is.
#[must_use]
pub fn usage_percent(spent: Money, limit: Money) -> f64 {
    if limit.minor() > 0 {
        spent.minor() as f64 / limit.minor() as f64 * 100.0
    } else if spent.minor() > 0 {
        f64::INFINITY
    } else {
        0.0
    }
}

fn percent_label(percent: f64) -> String {
    if percent.is_finite() {
        format!("{percent:.1}%")
    } else {
        "over an empty limit".to_string()
    }
}

/// Evaluate every threshold of one budget and return the alerts that fire.
#[must_use]
pub fn evaluate_budget(budget: &Budget) -> Vec<BudgetAlert> {
    let mut alerts = Vec::new();

    let overall = usage_percent(budget.total_spent, budget.total_budget);
    if overall >= OVERALL_THRESHOLD_PERCENT {
        let severity = if overall >= 100.0 {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        alerts.push(BudgetAlert {
            budget_id: budget.id,
            budget_name: budget.name.clone(),
            scope: AlertScope::Overall,
            category: None,
            percent_used: overall,
            severity,
            message: format!(
                "Overall budget '{}' is at {}",
                budget.name,
                percent_label(overall)
            ),
        });
    }

    for category in &budget.categories {
        if let Some(alert) = evaluate_category(budget, category) {
            alerts.push(alert);
        }
    }

    alerts
}

fn evaluate_category(budget: &Budget, category: &BudgetCategory) -> Option<BudgetAlert> {
    if !category.notifications.enabled {
        return None;
    }

    let percent = usage_percent(category.spent, category.limit);
    if percent < f64::from(category.notifications.threshold) {
        return None;
    }

    let severity = if category.spent > category.limit {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };

    Some(BudgetAlert {
        budget_id: budget.id,
        budget_name: budget.name.clone(),
        scope: AlertScope::Category,
        category: Some(category.name.clone()),
        percent_used: percent,
        severity,
        message: format!(
            "Category '{}' of budget '{}' is at {}",
            category.name,
            budget.name,
            percent_label(percent)
        ),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::{
        BudgetNotifications, BudgetPeriod, BudgetStatus, CategoryNotifications, Money,
    };

    fn budget_with(categories: Vec<BudgetCategory>, total_budget: i64, total_spent: i64) -> Budget {
        let now = Utc::now();
        Budget {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Bulanan".to_string(),
            period: BudgetPeriod::Monthly,
            start_date: now - Duration::days(5),
            end_date: now + Duration::days(25),
            categories,
            total_budget: Money::new(total_budget),
            total_spent: Money::new(total_spent),
            status: BudgetStatus::Active,
            notifications: BudgetNotifications::default(),
            recurrence: None,
            notes: None,
        }
    }

    fn food(limit: i64, spent: i64) -> BudgetCategory {
        BudgetCategory {
            name: "food".to_string(),
            limit: Money::new(limit),
            spent: Money::new(spent),
            color: "#000000".to_string(),
            notifications: CategoryNotifications::default(),
        }
    }

    #[test]
    fn below_threshold_is_silent() {
        let budget = budget_with(vec![food(2_000_000, 50_000)], 2_000_000, 50_000);
        assert!(evaluate_budget(&budget).is_empty());
    }

    #[test]
    fn eighty_percent_fires_medium() {
        let budget = budget_with(vec![food(2_000_000, 1_600_000)], 2_000_000, 1_600_000);
        let alerts = evaluate_budget(&budget);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Medium));
        assert_eq!(alerts[0].scope, AlertScope::Overall);
        assert_eq!(alerts[1].category.as_deref(), Some("food"));
    }

    #[test]
    fn over_limit_fires_high() {
        let budget = budget_with(vec![food(2_000_000, 2_100_000)], 2_000_000, 2_100_000);
        let alerts = evaluate_budget(&budget);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::High));
        assert!((alerts[0].percent_used - 105.0).abs() < 1e-9);
    }

    #[test]
    fn disabled_category_notifications_stay_silent() {
        let mut category = food(1_000, 5_000);
        category.notifications.enabled = false;
        let budget = budget_with(vec![category], 2_000_000, 5_000);
        assert!(evaluate_budget(&budget).is_empty());
    }

    #[test]
    fn zero_limit_counts_as_zero_until_spent() {
        let idle = budget_with(vec![food(0, 0)], 0, 0);
        assert!(evaluate_budget(&idle).is_empty());

        let spent = budget_with(vec![food(0, 1)], 0, 1);
        let alerts = evaluate_budget(&spent);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::High));
    }
}
