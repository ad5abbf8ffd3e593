//! Create push settings and push message tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PushSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PushSettings::UserId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PushSettings::Settings).integer().not_null())
                    .col(
                        ColumnDef::new(PushSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PushMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PushMessage::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PushMessage::UserId).integer().not_null())
                    .col(ColumnDef::new(PushMessage::PostId).integer().not_null())
                    .col(ColumnDef::new(PushMessage::CommentId).integer().not_null())
                    .col(ColumnDef::new(PushMessage::Title).string_len(256).not_null())
                    .col(ColumnDef::new(PushMessage::Message).text().not_null())
                    .col(ColumnDef::new(PushMessage::Kind).integer().not_null())
                    .col(
                        ColumnDef::new(PushMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, comment_id) - one message per recipient per comment
        manager
            .create_index(
                Index::create()
                    .name("idx_push_message_user_comment")
                    .table(PushMessage::Table)
                    .col(PushMessage::UserId)
                    .col(PushMessage::CommentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PushMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PushSettings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PushSettings {
    Table,
    UserId,
    Settings,
    UpdatedAt,
}

#[derive(Iden)]
enum PushMessage {
    Table,
    Id,
    UserId,
    PostId,
    CommentId,
    Title,
    Message,
    Kind,
    CreatedAt,
}
