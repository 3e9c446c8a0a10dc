use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ForumMessages {
    Table,
    Id,
    ForumTopicId,
    CreatorId,
    Text,
    CreatedAt,
    ModifiedAt,
}

#[derive(DeriveIden)]
enum ForumTopics {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ForumMessages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ForumMessages::ForumTopicId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ForumMessages::CreatorId).uuid().not_null())
                    .col(ColumnDef::new(ForumMessages::Text).text().not_null())
                    .col(
                        ColumnDef::new(ForumMessages::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ForumMessages::ModifiedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_messages_forum_topic_id")
                            .from(ForumMessages::Table, ForumMessages::ForumTopicId)
                            .to(ForumTopics::Table, ForumTopics::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_messages_creator_id")
                            .from(ForumMessages::Table, ForumMessages::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_messages_forum_topic_id")
                    .table(ForumMessages::Table)
                    .col(ForumMessages::ForumTopicId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumMessages::Table).to_owned())
            .await
    }
}
