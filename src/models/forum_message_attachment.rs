use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "forum_message_attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub forum_message_id: Uuid,
    /// Display name supplied with the upload.
    pub file_name: String,
    /// Public path, e.g. `/attachments/<hex>.png`.
    pub file_path: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::forum_message::Entity",
        from = "Column::ForumMessageId",
        to = "super::forum_message::Column::Id",
        on_delete = "Cascade"
    )]
    ForumMessage,
}

impl Related<super::forum_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ForumMessage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
