use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ForumTopics {
    Table,
    Id,
    ForumId,
    CreatorId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Forums {
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
                    .table(ForumTopics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ForumTopics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ForumTopics::ForumId).uuid().not_null())
                    .col(ColumnDef::new(ForumTopics::CreatorId).uuid().not_null())
                    .col(ColumnDef::new(ForumTopics::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(ForumTopics::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_topics_forum_id")
                            .from(ForumTopics::Table, ForumTopics::ForumId)
                            .to(Forums::Table, Forums::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_topics_creator_id")
                            .from(ForumTopics::Table, ForumTopics::CreatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_topics_forum_id")
                    .table(ForumTopics::Table)
                    .col(ForumTopics::ForumId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_topics_creator_id")
                    .table(ForumTopics::Table)
                    .col(ForumTopics::CreatorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumTopics::Table).to_owned())
            .await
    }
}
