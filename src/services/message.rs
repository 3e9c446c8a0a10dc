use crate::{
    error::{AppError, AppResult},
    models::{
        forum_message, ForumMessage, ForumMessageAttachmentModel, ForumMessageModel, User,
        UserModel,
    },
    services::attachment::{find_in_scope, AttachmentScope},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

pub struct MessageService {
    db: DatabaseConnection,
}

impl MessageService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        topic_id: Option<Uuid>,
    ) -> AppResult<Vec<(ForumMessageModel, Option<UserModel>)>> {
        let mut query = ForumMessage::find();
        if let Some(topic_id) = topic_id {
            query = query.filter(forum_message::Column::ForumTopicId.eq(topic_id));
        }
        let messages = query
            .order_by_asc(forum_message::Column::CreatedAt)
            .find_also_related(User)
            .all(&self.db)
            .await?;
        Ok(messages)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ForumMessageModel> {
        ForumMessage::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_with_creator(
        &self,
        id: Uuid,
    ) -> AppResult<(ForumMessageModel, Option<UserModel>)> {
        ForumMessage::find_by_id(id)
            .find_also_related(User)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(
        &self,
        topic_id: Uuid,
        creator_id: Uuid,
        text: &str,
    ) -> AppResult<ForumMessageModel> {
        let now = chrono::Utc::now().naive_utc();
        let new_message = forum_message::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            forum_topic_id: sea_orm::ActiveValue::Set(topic_id),
            creator_id: sea_orm::ActiveValue::Set(creator_id),
            text: sea_orm::ActiveValue::Set(text.to_string()),
            created_at: sea_orm::ActiveValue::Set(now),
            modified_at: sea_orm::ActiveValue::Set(now),
        };
        let message = new_message.insert(&self.db).await?;
        tracing::info!(message_id = %message.id, topic_id = %topic_id, "Posted message");
        Ok(message)
    }

    pub async fn update_text(
        &self,
        message: ForumMessageModel,
        text: &str,
    ) -> AppResult<ForumMessageModel> {
        let mut active: forum_message::ActiveModel = message.into();
        active.text = sea_orm::ActiveValue::Set(text.to_string());
        active.modified_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    /// Returns the attachment rows removed by the cascade.
    pub async fn delete(
        &self,
        message: &ForumMessageModel,
    ) -> AppResult<Vec<ForumMessageAttachmentModel>> {
        let attachments = find_in_scope(&self.db, AttachmentScope::Message(message.id)).await?;
        let result = ForumMessage::delete_by_id(message.id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        tracing::info!(message_id = %message.id, attachments = attachments.len(), "Deleted message");
        Ok(attachments)
    }
}
