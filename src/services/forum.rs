use crate::{
    error::{AppError, AppResult},
    models::{
        forum, forum_message, forum_topic, Forum, ForumCategory, ForumCategoryModel,
        ForumMessage, ForumMessageAttachmentModel, ForumModel, ForumTopic, ForumTopicModel, User,
        UserModel,
    },
    services::attachment::{find_in_scope, AttachmentScope},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::HashMap;
use uuid::Uuid;

/// A topic row in the forum detail view.
#[derive(Debug, Clone)]
pub struct TopicSummary {
    pub topic: ForumTopicModel,
    pub creator: Option<UserModel>,
    pub message_count: u64,
}

#[derive(Debug, Clone)]
pub struct ForumDetail {
    pub forum: ForumModel,
    pub category: ForumCategoryModel,
    pub topics: Vec<TopicSummary>,
}

pub struct ForumService {
    db: DatabaseConnection,
}

impl ForumService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        category_id: Option<Uuid>,
    ) -> AppResult<Vec<(ForumModel, Option<ForumCategoryModel>)>> {
        let mut query = Forum::find();
        if let Some(category_id) = category_id {
            query = query.filter(forum::Column::ForumCategoryId.eq(category_id));
        }
        let forums = query
            .order_by_asc(forum::Column::Name)
            .find_also_related(ForumCategory)
            .all(&self.db)
            .await?;
        Ok(forums)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ForumModel> {
        Forum::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// The forum with its category and topics, newest topic first.
    pub async fn detail(&self, id: Uuid) -> AppResult<ForumDetail> {
        let (forum, category) = match Forum::find_by_id(id)
            .find_also_related(ForumCategory)
            .one(&self.db)
            .await?
        {
            Some((forum, Some(category))) => (forum, category),
            _ => return Err(AppError::NotFound),
        };

        let topics = ForumTopic::find()
            .filter(forum_topic::Column::ForumId.eq(forum.id))
            .order_by_desc(forum_topic::Column::CreatedAt)
            .find_also_related(User)
            .all(&self.db)
            .await?;

        let topic_ids: Vec<Uuid> = topics.iter().map(|(t, _)| t.id).collect();
        let message_counts = message_counts(&self.db, topic_ids).await?;

        let topics = topics
            .into_iter()
            .map(|(topic, creator)| TopicSummary {
                message_count: message_counts.get(&topic.id).copied().unwrap_or(0),
                topic,
                creator,
            })
            .collect();

        Ok(ForumDetail {
            forum,
            category,
            topics,
        })
    }

    pub async fn create(
        &self,
        category_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<ForumModel> {
        let new_forum = forum::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            forum_category_id: sea_orm::ActiveValue::Set(category_id),
            name: sea_orm::ActiveValue::Set(name.to_string()),
            description: sea_orm::ActiveValue::Set(description.map(str::to_string)),
        };
        let forum = new_forum.insert(&self.db).await?;
        tracing::info!(forum_id = %forum.id, category_id = %category_id, "Created forum {}", forum.name);
        Ok(forum)
    }

    /// Rename, re-describe or move the forum to another category.
    pub async fn update(
        &self,
        id: Uuid,
        category_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<ForumModel> {
        let existing = self.get_by_id(id).await?;
        let mut active: forum::ActiveModel = existing.into();
        active.forum_category_id = sea_orm::ActiveValue::Set(category_id);
        active.name = sea_orm::ActiveValue::Set(name.to_string());
        active.description = sea_orm::ActiveValue::Set(description.map(str::to_string));
        Ok(active.update(&self.db).await?)
    }

    /// Returns the attachment rows removed by the cascade.
    pub async fn delete(&self, id: Uuid) -> AppResult<Vec<ForumMessageAttachmentModel>> {
        self.get_by_id(id).await?;
        let attachments = find_in_scope(&self.db, AttachmentScope::Forum(id)).await?;
        Forum::delete_by_id(id).exec(&self.db).await?;
        tracing::info!(forum_id = %id, attachments = attachments.len(), "Deleted forum");
        Ok(attachments)
    }
}

async fn message_counts(
    db: &DatabaseConnection,
    topic_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, u64>> {
    if topic_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<Uuid> = ForumMessage::find()
        .select_only()
        .column(forum_message::Column::ForumTopicId)
        .filter(forum_message::Column::ForumTopicId.is_in(topic_ids))
        .into_tuple()
        .all(db)
        .await?;

    let mut counts = HashMap::new();
    for topic_id in rows {
        *counts.entry(topic_id).or_insert(0) += 1;
    }
    Ok(counts)
}
