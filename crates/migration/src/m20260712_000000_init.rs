//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Celengan:
//!
//! - `users`: accounts and their handle quota
//! - `chat_handles`: chat handles registered per user
//! - `sessions`: one chat session per (user, handle)
//! - `session_phrases`: custom phrase→intent mappings for the classifier
//! - `session_messages`: outbound message queue per session
//! - `session_errors`: append-only error log per session
//! - `transactions`: income/expense records
//! - `budgets`: budget windows with aggregate totals
//! - `budget_categories`: per-category limits and running spent totals

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Password,
    Role,
    MaxHandles,
    CreatedAt,
}

#[derive(Iden)]
enum ChatHandles {
    Table,
    Id,
    UserId,
    Handle,
    IsActive,
    LastActive,
}

#[derive(Iden)]
enum Sessions {
    Table,
    Id,
    UserId,
    Handle,
    Status,
    LastActive,
    PairingCode,
    AutoReplyEnabled,
    AutoReplyText,
    NotifyBudgetAlerts,
    NotifyDailySummary,
    NotifyWeeklyReport,
    Language,
    Timezone,
    NlpEnabled,
    NlpConfidence,
    CreatedAt,
}

#[derive(Iden)]
enum SessionPhrases {
    Table,
    Id,
    SessionId,
    Phrase,
    Intent,
    Examples,
}

#[derive(Iden)]
enum SessionMessages {
    Table,
    Id,
    SessionId,
    Content,
    Kind,
    Priority,
    ScheduledFor,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum SessionErrors {
    Table,
    Id,
    SessionId,
    At,
    Error,
    Context,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    Kind,
    AmountMinor,
    Category,
    CategoryNorm,
    Description,
    OccurredAt,
    Source,
    ChatHandle,
    Status,
    Tags,
    Attachments,
    Location,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    Name,
    Period,
    StartDate,
    EndDate,
    TotalBudgetMinor,
    TotalSpentMinor,
    Status,
    NotifyEnabled,
    NotifyFrequency,
    NotifyChat,
    NotifyEmail,
    RecurringFrequency,
    AutoRenew,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum BudgetCategories {
    Table,
    Id,
    BudgetId,
    Name,
    NameNorm,
    LimitMinor,
    SpentMinor,
    Color,
    NotifyEnabled,
    NotifyThreshold,
    Position,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("user"),
                    )
                    .col(
                        ColumnDef::new(Users::MaxHandles)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-username-unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Chat handles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ChatHandles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatHandles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatHandles::UserId).uuid().not_null())
                    .col(ColumnDef::new(ChatHandles::Handle).string().not_null())
                    .col(ColumnDef::new(ChatHandles::IsActive).boolean().not_null())
                    .col(
                        ColumnDef::new(ChatHandles::LastActive)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-chat_handles-user_id")
                            .from(ChatHandles::Table, ChatHandles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-chat_handles-user_id-handle-unique")
                    .table(ChatHandles::Table)
                    .col(ChatHandles::UserId)
                    .col(ChatHandles::Handle)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Sessions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Sessions::Handle).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::Status)
                            .string()
                            .not_null()
                            .default("inactive"),
                    )
                    .col(ColumnDef::new(Sessions::LastActive).timestamp().not_null())
                    .col(ColumnDef::new(Sessions::PairingCode).string())
                    .col(
                        ColumnDef::new(Sessions::AutoReplyEnabled)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sessions::AutoReplyText).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::NotifyBudgetAlerts)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::NotifyDailySummary)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::NotifyWeeklyReport)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sessions::Language)
                            .string()
                            .not_null()
                            .default("id"),
                    )
                    .col(
                        ColumnDef::new(Sessions::Timezone)
                            .string()
                            .not_null()
                            .default("Asia/Jakarta"),
                    )
                    .col(ColumnDef::new(Sessions::NlpEnabled).boolean().not_null())
                    .col(ColumnDef::new(Sessions::NlpConfidence).double().not_null())
                    .col(ColumnDef::new(Sessions::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sessions-user_id")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sessions-user_id-handle-unique")
                    .table(Sessions::Table)
                    .col(Sessions::UserId)
                    .col(Sessions::Handle)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sessions-status-last_active")
                    .table(Sessions::Table)
                    .col(Sessions::Status)
                    .col(Sessions::LastActive)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Session phrases / queue / error log
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SessionPhrases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionPhrases::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionPhrases::SessionId).uuid().not_null())
                    .col(ColumnDef::new(SessionPhrases::Phrase).string().not_null())
                    .col(ColumnDef::new(SessionPhrases::Intent).string().not_null())
                    .col(ColumnDef::new(SessionPhrases::Examples).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-session_phrases-session_id")
                            .from(SessionPhrases::Table, SessionPhrases::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SessionMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionMessages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionMessages::SessionId).uuid().not_null())
                    .col(ColumnDef::new(SessionMessages::Content).string().not_null())
                    .col(ColumnDef::new(SessionMessages::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SessionMessages::Priority)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(SessionMessages::ScheduledFor).timestamp())
                    .col(
                        ColumnDef::new(SessionMessages::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SessionMessages::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-session_messages-session_id")
                            .from(SessionMessages::Table, SessionMessages::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-session_messages-session_id-status")
                    .table(SessionMessages::Table)
                    .col(SessionMessages::SessionId)
                    .col(SessionMessages::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SessionErrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionErrors::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionErrors::SessionId).uuid().not_null())
                    .col(ColumnDef::new(SessionErrors::At).timestamp().not_null())
                    .col(ColumnDef::new(SessionErrors::Error).string().not_null())
                    .col(ColumnDef::new(SessionErrors::Context).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-session_errors-session_id")
                            .from(SessionErrors::Table, SessionErrors::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-session_errors-session_id-at")
                    .table(SessionErrors::Table)
                    .col(SessionErrors::SessionId)
                    .col(SessionErrors::At)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Category).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::CategoryNorm)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Source).string().not_null())
                    .col(ColumnDef::new(Transactions::ChatHandle).string())
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .default("completed"),
                    )
                    .col(ColumnDef::new(Transactions::Tags).string())
                    .col(ColumnDef::new(Transactions::Attachments).string())
                    .col(ColumnDef::new(Transactions::Location).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-category_norm")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CategoryNorm)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-kind")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::Kind)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Budgets::Name).string().not_null())
                    .col(ColumnDef::new(Budgets::Period).string().not_null())
                    .col(ColumnDef::new(Budgets::StartDate).timestamp().not_null())
                    .col(ColumnDef::new(Budgets::EndDate).timestamp().not_null())
                    .col(
                        ColumnDef::new(Budgets::TotalBudgetMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Budgets::TotalSpentMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Budgets::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Budgets::NotifyEnabled).boolean().not_null())
                    .col(
                        ColumnDef::new(Budgets::NotifyFrequency)
                            .string()
                            .not_null()
                            .default("weekly"),
                    )
                    .col(ColumnDef::new(Budgets::NotifyChat).boolean().not_null())
                    .col(ColumnDef::new(Budgets::NotifyEmail).boolean().not_null())
                    .col(ColumnDef::new(Budgets::RecurringFrequency).string())
                    .col(ColumnDef::new(Budgets::AutoRenew).boolean())
                    .col(ColumnDef::new(Budgets::Notes).string())
                    .col(ColumnDef::new(Budgets::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-user_id")
                            .from(Budgets::Table, Budgets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user_id-status")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user_id-start_date")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::StartDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Budget categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetCategories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetCategories::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(BudgetCategories::Name).string().not_null())
                    .col(
                        ColumnDef::new(BudgetCategories::NameNorm)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::LimitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::SpentMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::Color)
                            .string()
                            .not_null()
                            .default("#000000"),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::NotifyEnabled)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::NotifyThreshold)
                            .integer()
                            .not_null()
                            .default(80),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::Position)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_categories-budget_id")
                            .from(BudgetCategories::Table, BudgetCategories::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_categories-budget_id-name_norm-unique")
                    .table(BudgetCategories::Table)
                    .col(BudgetCategories::BudgetId)
                    .col(BudgetCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(BudgetCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionErrors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SessionPhrases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatHandles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
