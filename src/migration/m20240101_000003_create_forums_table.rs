use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Forums {
    Table,
    Id,
    ForumCategoryId,
    Name,
    Description,
}

#[derive(DeriveIden)]
enum ForumCategories {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Forums::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Forums::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Forums::ForumCategoryId).uuid().not_null())
                    .col(ColumnDef::new(Forums::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Forums::Description).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forums_forum_category_id")
                            .from(Forums::Table, Forums::ForumCategoryId)
                            .to(ForumCategories::Table, ForumCategories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forums_forum_category_id")
                    .table(Forums::Table)
                    .col(Forums::ForumCategoryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Forums::Table).to_owned())
            .await
    }
}
