//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Report::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Report::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Report::Description).text().not_null())
                    .col(ColumnDef::new(Report::Category).string_len(128).not_null())
                    .col(ColumnDef::new(Report::Address).string_len(512).not_null())
                    .col(ColumnDef::new(Report::Latitude).double().not_null())
                    .col(ColumnDef::new(Report::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(Report::BeforePhotos)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Report::BeforeVideo).string_len(1024))
                    .col(ColumnDef::new(Report::AfterPhotos).json_binary())
                    .col(ColumnDef::new(Report::AfterVideo).string_len(1024))
                    .col(ColumnDef::new(Report::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::UserName).string_len(128).not_null())
                    .col(ColumnDef::new(Report::Status).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Report::IsDraft)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Report::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Report::AssignedTo).string_len(32))
                    .col(ColumnDef::new(Report::AssignedToName).string_len(128))
                    .col(ColumnDef::new(Report::Priority).string_len(16))
                    .col(ColumnDef::new(Report::Deadline).timestamp_with_time_zone())
                    .col(ColumnDef::new(Report::DispatcherNotes).text())
                    .col(ColumnDef::new(Report::AssignedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Report::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Report::ResolutionNotes).text())
                    .col(ColumnDef::new(Report::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Report::QaFeedback).text())
                    .col(ColumnDef::new(Report::ReopenReason).text())
                    .col(ColumnDef::new(Report::VerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Report::ReopenedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Report::DuplicateCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Report::IsDuplicateOf).string_len(32))
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Report::UpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Report::SubmittedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_citizen")
                            .from(Report::Table, Report::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_engineer")
                            .from(Report::Table, Report::AssignedTo)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: status queues (dispatcher/engineer/QA listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status")
                    .table(Report::Table)
                    .col(Report::Status)
                    .to_owned(),
            )
            .await?;

        // Index: is_duplicate_of (duplicate-merge propagation lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_is_duplicate_of")
                    .table(Report::Table)
                    .col(Report::IsDuplicateOf)
                    .to_owned(),
            )
            .await?;

        // Index: user_id (citizen's own reports)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_user_id")
                    .table(Report::Table)
                    .col(Report::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: assigned_to (engineer work queue)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_assigned_to")
                    .table(Report::Table)
                    .col(Report::AssignedTo)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    Title,
    Description,
    Category,
    Address,
    Latitude,
    Longitude,
    BeforePhotos,
    BeforeVideo,
    AfterPhotos,
    AfterVideo,
    UserId,
    UserName,
    Status,
    IsDraft,
    IsDeleted,
    AssignedTo,
    AssignedToName,
    Priority,
    Deadline,
    DispatcherNotes,
    AssignedAt,
    StartedAt,
    ResolutionNotes,
    ResolvedAt,
    QaFeedback,
    ReopenReason,
    VerifiedAt,
    ReopenedAt,
    DuplicateCount,
    IsDuplicateOf,
    CreatedAt,
    UpdatedAt,
    SubmittedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
