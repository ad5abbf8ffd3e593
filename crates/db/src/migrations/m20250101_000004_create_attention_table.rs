//! Create attention table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attention::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attention::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attention::UserId).integer().not_null())
                    .col(ColumnDef::new(Attention::PostId).integer().not_null())
                    .col(
                        ColumnDef::new(Attention::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attention_post")
                            .from(Attention::Table, Attention::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, post_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_attention_user_post")
                    .table(Attention::Table)
                    .col(Attention::UserId)
                    .col(Attention::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: post_id (followers of a post)
        manager
            .create_index(
                Index::create()
                    .name("idx_attention_post_id")
                    .table(Attention::Table)
                    .col(Attention::PostId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attention::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Attention {
    Table,
    Id,
    UserId,
    PostId,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
