use crate::{
    error::{AppError, AppResult},
    models::{
        forum_message, forum_message_attachment, forum_topic, user, Forum, ForumMessage,
        ForumMessageAttachment, ForumMessageAttachmentModel, ForumMessageModel, ForumModel,
        ForumTopic, ForumTopicModel, User, UserModel,
    },
    services::attachment::{find_in_scope, AttachmentScope},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::HashMap;
use uuid::Uuid;

/// A message as it appears inside a topic thread.
#[derive(Debug, Clone)]
pub struct ThreadMessage {
    pub message: ForumMessageModel,
    pub creator: Option<UserModel>,
    pub attachments: Vec<ForumMessageAttachmentModel>,
}

#[derive(Debug, Clone)]
pub struct TopicThread {
    pub topic: ForumTopicModel,
    pub forum: ForumModel,
    pub creator: Option<UserModel>,
    pub messages: Vec<ThreadMessage>,
}

pub struct TopicService {
    db: DatabaseConnection,
}

impl TopicService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        forum_id: Option<Uuid>,
    ) -> AppResult<Vec<(ForumTopicModel, Option<UserModel>)>> {
        let mut query = ForumTopic::find();
        if let Some(forum_id) = forum_id {
            query = query.filter(forum_topic::Column::ForumId.eq(forum_id));
        }
        let topics = query
            .order_by_desc(forum_topic::Column::CreatedAt)
            .find_also_related(User)
            .all(&self.db)
            .await?;
        Ok(topics)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ForumTopicModel> {
        ForumTopic::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// The topic with its messages in posting order, each with its creator
    /// and attachments.
    pub async fn thread(&self, id: Uuid) -> AppResult<TopicThread> {
        let (topic, forum) = match ForumTopic::find_by_id(id)
            .find_also_related(Forum)
            .one(&self.db)
            .await?
        {
            Some((topic, Some(forum))) => (topic, forum),
            _ => return Err(AppError::NotFound),
        };

        let messages = ForumMessage::find()
            .filter(forum_message::Column::ForumTopicId.eq(topic.id))
            .order_by_asc(forum_message::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let message_ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let mut attachments: HashMap<Uuid, Vec<ForumMessageAttachmentModel>> = HashMap::new();
        if !message_ids.is_empty() {
            let rows = ForumMessageAttachment::find()
                .filter(forum_message_attachment::Column::ForumMessageId.is_in(message_ids))
                .order_by_asc(forum_message_attachment::Column::CreatedAt)
                .all(&self.db)
                .await?;
            for attachment in rows {
                attachments
                    .entry(attachment.forum_message_id)
                    .or_default()
                    .push(attachment);
            }
        }

        let mut user_ids: Vec<Uuid> = messages.iter().map(|m| m.creator_id).collect();
        user_ids.push(topic.creator_id);
        user_ids.sort();
        user_ids.dedup();
        let mut users: HashMap<Uuid, UserModel> = User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let messages = messages
            .into_iter()
            .map(|message| ThreadMessage {
                creator: users.get(&message.creator_id).cloned(),
                attachments: attachments.remove(&message.id).unwrap_or_default(),
                message,
            })
            .collect();

        Ok(TopicThread {
            creator: users.remove(&topic.creator_id),
            topic,
            forum,
            messages,
        })
    }

    pub async fn create(
        &self,
        forum_id: Uuid,
        creator_id: Uuid,
        name: &str,
    ) -> AppResult<ForumTopicModel> {
        let new_topic = forum_topic::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            forum_id: sea_orm::ActiveValue::Set(forum_id),
            creator_id: sea_orm::ActiveValue::Set(creator_id),
            name: sea_orm::ActiveValue::Set(name.to_string()),
            created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
        };
        let topic = new_topic.insert(&self.db).await?;
        tracing::info!(topic_id = %topic.id, forum_id = %forum_id, "Created topic");
        Ok(topic)
    }

    pub async fn rename(&self, topic: ForumTopicModel, name: &str) -> AppResult<ForumTopicModel> {
        let mut active: forum_topic::ActiveModel = topic.into();
        active.name = sea_orm::ActiveValue::Set(name.to_string());
        Ok(active.update(&self.db).await?)
    }

    /// Returns the attachment rows removed by the cascade.
    pub async fn delete(
        &self,
        topic: &ForumTopicModel,
    ) -> AppResult<Vec<ForumMessageAttachmentModel>> {
        let attachments = find_in_scope(&self.db, AttachmentScope::Topic(topic.id)).await?;
        let result = ForumTopic::delete_by_id(topic.id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        tracing::info!(topic_id = %topic.id, attachments = attachments.len(), "Deleted topic");
        Ok(attachments)
    }
}
