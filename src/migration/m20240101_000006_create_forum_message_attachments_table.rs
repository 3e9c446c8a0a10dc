use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ForumMessageAttachments {
    Table,
    Id,
    ForumMessageId,
    FileName,
    FilePath,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ForumMessages {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumMessageAttachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ForumMessageAttachments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ForumMessageAttachments::ForumMessageId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumMessageAttachments::FileName)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumMessageAttachments::FilePath)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumMessageAttachments::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_message_attachments_forum_message_id")
                            .from(
                                ForumMessageAttachments::Table,
                                ForumMessageAttachments::ForumMessageId,
                            )
                            .to(ForumMessages::Table, ForumMessages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_message_attachments_forum_message_id")
                    .table(ForumMessageAttachments::Table)
                    .col(ForumMessageAttachments::ForumMessageId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ForumMessageAttachments::Table)
                    .to_owned(),
            )
            .await
    }
}
