//! Create post commenter table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostCommenter::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostCommenter::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostCommenter::PostId).integer().not_null())
                    .col(ColumnDef::new(PostCommenter::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(PostCommenter::CommenterName)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PostCommenter::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_commenter_post")
                            .from(PostCommenter::Table, PostCommenter::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (post_id, user_id) - one name per user per post
        manager
            .create_index(
                Index::create()
                    .name("idx_post_commenter_post_user")
                    .table(PostCommenter::Table)
                    .col(PostCommenter::PostId)
                    .col(PostCommenter::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostCommenter::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PostCommenter {
    Table,
    Id,
    PostId,
    UserId,
    CommenterName,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
