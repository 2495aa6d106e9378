//! Core ledger engine.
//!
//! The engine owns the data model and every database write path: users and
//! their registered chat handles, chat sessions, transactions, budgets, the
//! budget consistency logic (`apply_delta` and the transaction lifecycle
//! hooks), alert evaluation, and period reports.
//!
//! The engine is stateless: it holds only a database connection, so any
//! number of instances can run against the same store. Cross-writer safety
//! for budget totals relies on single-statement atomic increments at the
//! storage layer, never on in-process locks.

pub use alerts::{
    AlertScope, AlertSeverity, BudgetAlert, OVERALL_THRESHOLD_PERCENT, evaluate_budget,
    usage_percent,
};
pub use budgets::{
    Budget, BudgetCategory, BudgetNotifications, BudgetPeriod, BudgetStatus,
    CategoryNotifications, NotifyFrequency, Recurrence,
};
pub use commands::{
    BudgetUpdate, NewBudget, NewBudgetCategory, NewTransaction, NlpUpdate, SettingsUpdate,
    TransactionFilter, TransactionUpdate,
};
pub use error::EngineError;
pub use money::Money;
pub use ops::budgets::{BudgetSummary, CategorySummary};
pub use ops::reconcile::{CategoryDrift, ReconcileReport};
pub use ops::reports::{CategoryTotal, Report, ReportPeriod, TransactionSummary};
pub use sessions::{
    CustomPhrase, DEFAULT_CONFIDENCE_THRESHOLD, DeliveryStatus, ErrorLogEntry, Language,
    NlpSettings, QueuedMessage, Session, SessionSettings, SessionStatus,
};
pub use transactions::{
    Attachment, Location, Transaction, TransactionKind, TransactionSource, TransactionStatus,
};
pub use users::{ChatHandle, User, UserRole};
pub use util::{normalize_category_display, normalize_category_key};

mod alerts;
mod budgets;
mod commands;
mod error;
mod money;
mod ops;
mod sessions;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;

pub use ops::Engine;
