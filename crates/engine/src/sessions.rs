//! Chat session state.
//!
//! A session is the persistent authenticated channel state for one
//! (user, chat handle) pair. Lifecycle transitions live in `ops::sessions`;
//! this module only defines the shapes stored in the database.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_AUTO_REPLY: &str =
    "Terima kasih atas pesannya. Saya akan memproses transaksi keuangan Anda segera.";
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Inactive,
    Pending,
    Active,
    Expired,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

impl TryFrom<&str> for SessionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "inactive" => Ok(Self::Inactive),
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            other => Err(EngineError::Validation(format!(
                "invalid session status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Id,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::En => "en",
        }
    }
}

impl TryFrom<&str> for Language {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "id" => Ok(Self::Id),
            "en" => Ok(Self::En),
            other => Err(EngineError::Validation(format!(
                "invalid language: {other}"
            ))),
        }
    }
}

/// Delivery state of a queued outbound message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for DeliveryStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::Validation(format!(
                "invalid delivery status: {other}"
            ))),
        }
    }
}

/// User-tunable session behavior.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub auto_reply_enabled: bool,
    pub auto_reply_text: String,
    pub notify_budget_alerts: bool,
    pub notify_daily_summary: bool,
    pub notify_weekly_report: bool,
    pub language: Language,
    pub timezone: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_reply_enabled: false,
            auto_reply_text: DEFAULT_AUTO_REPLY.to_string(),
            notify_budget_alerts: true,
            notify_daily_summary: false,
            notify_weekly_report: true,
            language: Language::Id,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Classifier configuration carried by the session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NlpSettings {
    pub enabled: bool,
    /// Intents below this confidence fall back to the "not understood"
    /// reply, 0.0-1.0.
    pub confidence: f64,
}

impl Default for NlpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// A user-supplied phrase→intent mapping consumed by the classifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPhrase {
    pub phrase: String,
    pub intent: String,
    pub examples: Vec<String>,
}

/// An outbound message waiting for delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: i64,
    pub content: String,
    pub kind: String,
    pub priority: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
}

/// One entry of the append-only session error log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub at: DateTime<Utc>,
    pub error: String,
    pub context: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub handle: String,
    pub status: SessionStatus,
    pub last_active: DateTime<Utc>,
    pub pairing_code: Option<String>,
    pub settings: SessionSettings,
    pub nlp: NlpSettings,
}

impl Session {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub handle: String,
    pub status: String,
    pub last_active: DateTimeUtc,
    pub pairing_code: Option<String>,
    pub auto_reply_enabled: bool,
    pub auto_reply_text: String,
    pub notify_budget_alerts: bool,
    pub notify_daily_summary: bool,
    pub notify_weekly_report: bool,
    pub language: String,
    pub timezone: String,
    pub nlp_enabled: bool,
    pub nlp_confidence: f64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "queue::Entity")]
    Queue,
    #[sea_orm(has_many = "log::Entity")]
    Log,
    #[sea_orm(has_many = "phrases::Entity")]
    Phrases,
}

impl Related<queue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Queue.def()
    }
}

impl Related<log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Log.def()
    }
}

impl Related<phrases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Phrases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Session {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            handle: model.handle,
            status: SessionStatus::try_from(model.status.as_str())?,
            last_active: model.last_active,
            pairing_code: model.pairing_code,
            settings: SessionSettings {
                auto_reply_enabled: model.auto_reply_enabled,
                auto_reply_text: model.auto_reply_text,
                notify_budget_alerts: model.notify_budget_alerts,
                notify_daily_summary: model.notify_daily_summary,
                notify_weekly_report: model.notify_weekly_report,
                language: Language::try_from(model.language.as_str())?,
                timezone: model.timezone,
            },
            nlp: NlpSettings {
                enabled: model.nlp_enabled,
                confidence: model.nlp_confidence,
            },
        })
    }
}

pub mod queue {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    use crate::EngineError;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "session_messages")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub session_id: Uuid,
        pub content: String,
        pub kind: String,
        pub priority: i32,
        pub scheduled_for: Option<DateTimeUtc>,
        pub status: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::SessionId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "Cascade"
        )]
        Session,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Session.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl TryFrom<Model> for super::QueuedMessage {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: model.id,
                content: model.content,
                kind: model.kind,
                priority: model.priority,
                scheduled_for: model.scheduled_for,
                status: super::DeliveryStatus::try_from(model.status.as_str())?,
            })
        }
    }
}

pub mod log {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "session_errors")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub session_id: Uuid,
        pub at: DateTimeUtc,
        pub error: String,
        pub context: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::SessionId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "Cascade"
        )]
        Session,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Session.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for super::ErrorLogEntry {
        fn from(model: Model) -> Self {
            let context = model
                .context
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or(serde_json::Value::Null);
            Self {
                at: model.at,
                error: model.error,
                context,
            }
        }
    }
}

pub mod phrases {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "session_phrases")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub session_id: Uuid,
        pub phrase: String,
        pub intent: String,
        pub examples: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::Entity",
            from = "Column::SessionId",
            to = "super::Column::Id",
            on_update = "NoAction",
            on_delete = "Cascade"
        )]
        Session,
    }

    impl Related<super::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Session.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for super::CustomPhrase {
        fn from(model: Model) -> Self {
            let examples = model
                .examples
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default();
            Self {
                phrase: model.phrase,
                intent: model.intent,
                examples,
            }
        }
    }
}
