//! Session persistence and lifecycle transitions.
//!
//! One session exists per (user, chat handle) pair; the pair is unique both
//! by pre-insert lookup (friendly error) and by a unique index (concurrent
//! backstop). The in-process worker side lives in the `chat_bot` crate; the
//! engine only owns the durable state.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    CustomPhrase, DeliveryStatus, EngineError, ErrorLogEntry, NlpUpdate, QueuedMessage,
    ResultEngine, Session, SessionSettings, SessionStatus, SettingsUpdate, User, UserRole,
    sessions, users,
    util::validate_handle,
};

use super::Engine;

impl Engine {
    /// Creates a user account. Usernames are unique.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
        max_handles: i32,
    ) -> ResultEngine<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(EngineError::Validation(
                "username and password must not be empty".to_string(),
            ));
        }
        if max_handles < 1 {
            return Err(EngineError::Validation(
                "max_handles must be >= 1".to_string(),
            ));
        }

        let existing = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(username.to_string()));
        }

        let model = users::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(password.to_string()),
            role: ActiveValue::Set(role.as_str().to_string()),
            max_handles: ActiveValue::Set(max_handles),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;

        User::try_from(&model)
    }

    /// Resolves a username/password pair to the account, for the API auth
    /// layer.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> ResultEngine<User> {
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::Password.eq(password))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))?;
        User::try_from(&model)
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))?;
        User::try_from(&model)
    }

    pub async fn user_handles(&self, user_id: Uuid) -> ResultEngine<Vec<crate::ChatHandle>> {
        let rows = users::handles::Entity::find()
            .filter(users::handles::Column::UserId.eq(user_id))
            .order_by_desc(users::handles::Column::LastActive)
            .all(&self.database)
            .await?;
        Ok(rows.iter().map(crate::ChatHandle::from).collect())
    }

    /// Creates (or returns) the session for (user, handle).
    ///
    /// Re-initializing an existing session is a no-op that returns it as-is;
    /// the caller decides whether a channel needs reopening based on its
    /// status. A handle owned by another user fails with `DuplicateHandle`;
    /// a new handle beyond the user's quota fails with `QuotaExceeded` and
    /// registers nothing.
    pub async fn initialize_session(&self, user_id: Uuid, handle: &str) -> ResultEngine<Session> {
        let handle = validate_handle(handle)?;

        if let Some(model) = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::Handle.eq(handle))
            .one(&self.database)
            .await?
        {
            return Session::try_from(model);
        }

        let foreign = users::handles::Entity::find()
            .filter(users::handles::Column::Handle.eq(handle))
            .filter(users::handles::Column::UserId.ne(user_id))
            .one(&self.database)
            .await?;
        if foreign.is_some() {
            return Err(EngineError::DuplicateHandle(handle.to_string()));
        }

        let user = self.user(user_id).await?;
        let registered = users::handles::Entity::find()
            .filter(users::handles::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;
        let already_registered = registered.iter().any(|row| row.handle == handle);
        if !already_registered && registered.len() as i32 >= user.max_handles {
            return Err(EngineError::QuotaExceeded(format!(
                "user has {} of {} handles",
                registered.len(),
                user.max_handles
            )));
        }

        let now = Utc::now();
        if !already_registered {
            users::handles::ActiveModel {
                user_id: ActiveValue::Set(user_id),
                handle: ActiveValue::Set(handle.to_string()),
                is_active: ActiveValue::Set(false),
                last_active: ActiveValue::Set(now),
                ..Default::default()
            }
            .insert(&self.database)
            .await?;
        }

        let settings = SessionSettings::default();
        let model = sessions::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id),
            handle: ActiveValue::Set(handle.to_string()),
            status: ActiveValue::Set(SessionStatus::Inactive.as_str().to_string()),
            last_active: ActiveValue::Set(now),
            pairing_code: ActiveValue::Set(None),
            auto_reply_enabled: ActiveValue::Set(settings.auto_reply_enabled),
            auto_reply_text: ActiveValue::Set(settings.auto_reply_text.clone()),
            notify_budget_alerts: ActiveValue::Set(settings.notify_budget_alerts),
            notify_daily_summary: ActiveValue::Set(settings.notify_daily_summary),
            notify_weekly_report: ActiveValue::Set(settings.notify_weekly_report),
            language: ActiveValue::Set(settings.language.as_str().to_string()),
            timezone: ActiveValue::Set(settings.timezone.clone()),
            nlp_enabled: ActiveValue::Set(true),
            nlp_confidence: ActiveValue::Set(crate::DEFAULT_CONFIDENCE_THRESHOLD),
            created_at: ActiveValue::Set(now),
        }
        .insert(&self.database)
        .await?;

        Session::try_from(model)
    }

    async fn set_status(&self, session_id: Uuid, status: SessionStatus) -> ResultEngine<Session> {
        let mut active: sessions::ActiveModel = self.session_model(session_id).await?.into();
        active.status = ActiveValue::Set(status.as_str().to_string());
        active.last_active = ActiveValue::Set(Utc::now());
        Session::try_from(active.update(&self.database).await?)
    }

    /// Channel open was requested; pairing is in progress.
    pub async fn mark_session_pending(&self, session_id: Uuid) -> ResultEngine<Session> {
        self.set_status(session_id, SessionStatus::Pending).await
    }

    /// Stores the latest pairing artifact, overwriting any prior one.
    pub async fn set_pairing_code(&self, session_id: Uuid, code: &str) -> ResultEngine<()> {
        let mut active: sessions::ActiveModel = self.session_model(session_id).await?.into();
        active.pairing_code = ActiveValue::Set(Some(code.to_string()));
        active.update(&self.database).await?;
        Ok(())
    }

    /// The transport reported the channel ready.
    pub async fn mark_session_ready(&self, session_id: Uuid) -> ResultEngine<Session> {
        let session = self.set_status(session_id, SessionStatus::Active).await?;
        users::handles::Entity::update_many()
            .col_expr(
                users::handles::Column::IsActive,
                sea_orm::sea_query::Expr::value(true),
            )
            .col_expr(
                users::handles::Column::LastActive,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(users::handles::Column::UserId.eq(session.user_id))
            .filter(users::handles::Column::Handle.eq(session.handle.clone()))
            .exec(&self.database)
            .await?;
        Ok(session)
    }

    /// The transport lost the channel.
    pub async fn mark_session_lost(&self, session_id: Uuid) -> ResultEngine<Session> {
        self.set_status(session_id, SessionStatus::Inactive).await
    }

    pub async fn touch_session(&self, session_id: Uuid) -> ResultEngine<()> {
        let mut active: sessions::ActiveModel = self.session_model(session_id).await?.into();
        active.last_active = ActiveValue::Set(Utc::now());
        active.update(&self.database).await?;
        Ok(())
    }

    /// Explicit disconnect: the session goes inactive and queued-but-
    /// undelivered messages are marked failed rather than silently dropped.
    pub async fn disconnect_session(&self, user_id: Uuid, session_id: Uuid) -> ResultEngine<Session> {
        let session = self.session(user_id, session_id).await?;
        if session.status == SessionStatus::Inactive {
            return Ok(session);
        }
        self.fail_pending_messages(session_id).await?;
        users::handles::Entity::update_many()
            .col_expr(
                users::handles::Column::IsActive,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(users::handles::Column::UserId.eq(user_id))
            .filter(users::handles::Column::Handle.eq(session.handle.clone()))
            .exec(&self.database)
            .await?;
        self.set_status(session_id, SessionStatus::Inactive).await
    }

    /// Removes a session and its queue/log/phrases. Returns the state the
    /// session had just before removal so the caller can tear the channel
    /// down first when it was still active.
    pub async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> ResultEngine<Session> {
        let session = self.session(user_id, session_id).await?;
        self.fail_pending_messages(session_id).await?;
        sessions::Entity::delete_by_id(session_id)
            .exec(&self.database)
            .await?;
        Ok(session)
    }

    /// Administrative expiry; no timeout ever derives this.
    pub async fn expire_session(&self, user_id: Uuid, session_id: Uuid) -> ResultEngine<Session> {
        self.session(user_id, session_id).await?;
        self.set_status(session_id, SessionStatus::Expired).await
    }

    pub async fn session(&self, user_id: Uuid, session_id: Uuid) -> ResultEngine<Session> {
        let model = self.session_model(session_id).await?;
        if model.user_id != user_id {
            return Err(EngineError::KeyNotFound("session".to_string()));
        }
        Session::try_from(model)
    }

    pub async fn session_by_handle(&self, user_id: Uuid, handle: &str) -> ResultEngine<Session> {
        let model = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::Handle.eq(handle))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("session".to_string()))?;
        Session::try_from(model)
    }

    pub async fn sessions_for_user(&self, user_id: Uuid) -> ResultEngine<Vec<Session>> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .order_by_desc(sessions::Column::LastActive)
            .all(&self.database)
            .await?;
        models.into_iter().map(Session::try_from).collect()
    }

    pub async fn update_session_settings(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        update: SettingsUpdate,
    ) -> ResultEngine<Session> {
        self.session(user_id, session_id).await?;
        let mut active: sessions::ActiveModel = self.session_model(session_id).await?.into();

        if let Some(enabled) = update.auto_reply_enabled {
            active.auto_reply_enabled = ActiveValue::Set(enabled);
        }
        if let Some(text) = update.auto_reply_text {
            active.auto_reply_text = ActiveValue::Set(text);
        }
        if let Some(value) = update.notify_budget_alerts {
            active.notify_budget_alerts = ActiveValue::Set(value);
        }
        if let Some(value) = update.notify_daily_summary {
            active.notify_daily_summary = ActiveValue::Set(value);
        }
        if let Some(value) = update.notify_weekly_report {
            active.notify_weekly_report = ActiveValue::Set(value);
        }
        if let Some(language) = update.language {
            active.language = ActiveValue::Set(language.as_str().to_string());
        }
        if let Some(timezone) = update.timezone {
            timezone
                .parse::<chrono_tz::Tz>()
                .map_err(|_| EngineError::Validation(format!("invalid timezone: {timezone}")))?;
            active.timezone = ActiveValue::Set(timezone);
        }

        Session::try_from(active.update(&self.database).await?)
    }

    pub async fn update_nlp_settings(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        update: NlpUpdate,
    ) -> ResultEngine<Session> {
        self.session(user_id, session_id).await?;
        if let Some(confidence) = update.confidence
            && !(0.0..=1.0).contains(&confidence)
        {
            return Err(EngineError::Validation(
                "confidence must be within 0.0-1.0".to_string(),
            ));
        }

        let mut active: sessions::ActiveModel = self.session_model(session_id).await?.into();
        if let Some(enabled) = update.enabled {
            active.nlp_enabled = ActiveValue::Set(enabled);
        }
        if let Some(confidence) = update.confidence {
            active.nlp_confidence = ActiveValue::Set(confidence);
        }
        Session::try_from(active.update(&self.database).await?)
    }

    /// Appends custom phrase→intent mappings for the classifier.
    pub async fn add_custom_phrases(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        phrases: Vec<CustomPhrase>,
    ) -> ResultEngine<Vec<CustomPhrase>> {
        self.session(user_id, session_id).await?;
        for phrase in &phrases {
            if phrase.phrase.trim().is_empty() || phrase.intent.trim().is_empty() {
                return Err(EngineError::Validation(
                    "custom phrase and intent must not be empty".to_string(),
                ));
            }
            let examples = (!phrase.examples.is_empty())
                .then(|| serde_json::to_string(&phrase.examples).ok())
                .flatten();
            sessions::phrases::ActiveModel {
                session_id: ActiveValue::Set(session_id),
                phrase: ActiveValue::Set(phrase.phrase.clone()),
                intent: ActiveValue::Set(phrase.intent.clone()),
                examples: ActiveValue::Set(examples),
                ..Default::default()
            }
            .insert(&self.database)
            .await?;
        }
        self.custom_phrases(session_id).await
    }

    pub async fn custom_phrases(&self, session_id: Uuid) -> ResultEngine<Vec<CustomPhrase>> {
        let rows = sessions::phrases::Entity::find()
            .filter(sessions::phrases::Column::SessionId.eq(session_id))
            .order_by_asc(sessions::phrases::Column::Id)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(CustomPhrase::from).collect())
    }

    /// Appends to the session's append-only error log. Never fails the
    /// caller's path beyond a database error.
    pub async fn log_session_error(
        &self,
        session_id: Uuid,
        error: &str,
        context: serde_json::Value,
    ) -> ResultEngine<()> {
        let context = (!context.is_null())
            .then(|| serde_json::to_string(&context).ok())
            .flatten();
        sessions::log::ActiveModel {
            session_id: ActiveValue::Set(session_id),
            at: ActiveValue::Set(Utc::now()),
            error: ActiveValue::Set(error.to_string()),
            context: ActiveValue::Set(context),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;
        Ok(())
    }

    /// Newest-first page of the error log.
    pub async fn session_errors(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> ResultEngine<Vec<ErrorLogEntry>> {
        self.session(user_id, session_id).await?;
        let rows = sessions::log::Entity::find()
            .filter(sessions::log::Column::SessionId.eq(session_id))
            .order_by_desc(sessions::log::Column::At)
            .order_by_desc(sessions::log::Column::Id)
            .offset(offset)
            .limit(if limit == 0 { 50 } else { limit })
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(ErrorLogEntry::from).collect())
    }

    /// Queues an outbound message for delivery.
    pub async fn enqueue_message(
        &self,
        session_id: Uuid,
        content: &str,
        kind: &str,
        priority: i32,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> ResultEngine<QueuedMessage> {
        self.session_model(session_id).await?;
        let model = sessions::queue::ActiveModel {
            session_id: ActiveValue::Set(session_id),
            content: ActiveValue::Set(content.to_string()),
            kind: ActiveValue::Set(kind.to_string()),
            priority: ActiveValue::Set(priority),
            scheduled_for: ActiveValue::Set(scheduled_for),
            status: ActiveValue::Set(DeliveryStatus::Pending.as_str().to_string()),
            created_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;
        QueuedMessage::try_from(model)
    }

    /// Due pending messages, highest priority first, FIFO within a priority.
    pub async fn pending_messages(&self, session_id: Uuid) -> ResultEngine<Vec<QueuedMessage>> {
        let now = Utc::now();
        let rows = sessions::queue::Entity::find()
            .filter(sessions::queue::Column::SessionId.eq(session_id))
            .filter(sessions::queue::Column::Status.eq(DeliveryStatus::Pending.as_str()))
            .filter(
                sessions::queue::Column::ScheduledFor
                    .is_null()
                    .or(sessions::queue::Column::ScheduledFor.lte(now)),
            )
            .order_by_desc(sessions::queue::Column::Priority)
            .order_by_asc(sessions::queue::Column::Id)
            .all(&self.database)
            .await?;
        rows.into_iter().map(QueuedMessage::try_from).collect()
    }

    pub async fn mark_message(&self, message_id: i64, status: DeliveryStatus) -> ResultEngine<()> {
        let updated = sessions::queue::Entity::update_many()
            .col_expr(
                sessions::queue::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .filter(sessions::queue::Column::Id.eq(message_id))
            .exec(&self.database)
            .await?;
        if updated.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("queued message".to_string()));
        }
        Ok(())
    }

    async fn fail_pending_messages(&self, session_id: Uuid) -> ResultEngine<()> {
        sessions::queue::Entity::update_many()
            .col_expr(
                sessions::queue::Column::Status,
                sea_orm::sea_query::Expr::value(DeliveryStatus::Failed.as_str()),
            )
            .filter(sessions::queue::Column::SessionId.eq(session_id))
            .filter(sessions::queue::Column::Status.eq(DeliveryStatus::Pending.as_str()))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    async fn session_model(&self, session_id: Uuid) -> ResultEngine<sessions::Model> {
        sessions::Entity::find_by_id(session_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("session".to_string()))
    }
}
