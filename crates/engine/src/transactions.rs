//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense event. Completed expenses
//! are the only records that feed budget reconciliation.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::normalize_category_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

/// Where a transaction was entered from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    #[default]
    Web,
    Chat,
}

impl TransactionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Chat => "chat",
        }
    }
}

impl TryFrom<&str> for TransactionSource {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "web" => Ok(Self::Web),
            "chat" => Ok(Self::Chat),
            other => Err(EngineError::Validation(format!(
                "invalid transaction source: {other}"
            ))),
        }
    }
}

/// File reference attached to a transaction (receipt photo, document).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: String,
    pub url: String,
    pub name: Option<String>,
}

/// Where a purchase happened, as far as the client reported it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub source: TransactionSource,
    pub chat_handle: Option<String>,
    pub status: TransactionStatus,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub location: Option<Location>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub amount_minor: i64,
    pub category: String,
    pub category_norm: String,
    pub description: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub source: String,
    pub chat_handle: Option<String>,
    pub status: String,
    pub tags: Option<String>,
    pub attachments: Option<String>,
    pub location: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let tags = (!tx.tags.is_empty())
            .then(|| serde_json::to_string(&tx.tags).ok())
            .flatten();
        let attachments = (!tx.attachments.is_empty())
            .then(|| serde_json::to_string(&tx.attachments).ok())
            .flatten();
        let location = tx
            .location
            .as_ref()
            .and_then(|location| serde_json::to_string(location).ok());
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            category: ActiveValue::Set(tx.category.clone()),
            category_norm: ActiveValue::Set(normalize_category_key(&tx.category)),
            description: ActiveValue::Set(tx.description.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            source: ActiveValue::Set(tx.source.as_str().to_string()),
            chat_handle: ActiveValue::Set(tx.chat_handle.clone()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            tags: ActiveValue::Set(tags),
            attachments: ActiveValue::Set(attachments),
            location: ActiveValue::Set(location),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let tags = model
            .tags
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        let attachments = model
            .attachments
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();
        let location = model
            .location
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            category: model.category,
            description: model.description,
            occurred_at: model.occurred_at,
            source: TransactionSource::try_from(model.source.as_str())?,
            chat_handle: model.chat_handle,
            status: TransactionStatus::try_from(model.status.as_str())?,
            tags,
            attachments,
            location,
        })
    }
}
