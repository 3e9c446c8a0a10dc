use crate::{
    error::{AppError, AppResult},
    models::{
        forum, forum_category, forum_topic, Forum, ForumCategory, ForumCategoryModel,
        ForumMessageAttachmentModel, ForumModel, ForumTopic,
    },
    services::attachment::{find_in_scope, AttachmentScope},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::HashMap;
use uuid::Uuid;

/// A forum as listed on the board index.
#[derive(Debug, Clone)]
pub struct ForumSummary {
    pub forum: ForumModel,
    pub topic_count: u64,
}

/// A category with its forums, as shown on the board index.
#[derive(Debug, Clone)]
pub struct CategoryOverview {
    pub category: ForumCategoryModel,
    pub forums: Vec<ForumSummary>,
}

pub struct CategoryService {
    db: DatabaseConnection,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All categories by name, each with its forums and their topic counts.
    pub async fn list_overview(&self) -> AppResult<Vec<CategoryOverview>> {
        let categories = ForumCategory::find()
            .order_by_asc(forum_category::Column::Name)
            .all(&self.db)
            .await?;
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        let forums = Forum::find()
            .filter(forum::Column::ForumCategoryId.is_in(category_ids))
            .order_by_asc(forum::Column::Name)
            .all(&self.db)
            .await?;

        let forum_ids: Vec<Uuid> = forums.iter().map(|f| f.id).collect();
        let topic_counts = topic_counts(&self.db, forum_ids).await?;

        let mut by_category: HashMap<Uuid, Vec<ForumSummary>> = HashMap::new();
        for forum in forums {
            let topic_count = topic_counts.get(&forum.id).copied().unwrap_or(0);
            by_category
                .entry(forum.forum_category_id)
                .or_default()
                .push(ForumSummary { forum, topic_count });
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryOverview {
                forums: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }

    pub async fn list(&self) -> AppResult<Vec<ForumCategoryModel>> {
        Ok(ForumCategory::find()
            .order_by_asc(forum_category::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ForumCategoryModel>> {
        Ok(ForumCategory::find_by_id(id).one(&self.db).await?)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ForumCategoryModel> {
        self.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn create(&self, name: &str) -> AppResult<ForumCategoryModel> {
        let new_category = forum_category::ActiveModel {
            id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
            name: sea_orm::ActiveValue::Set(name.to_string()),
        };
        let category = new_category.insert(&self.db).await?;
        tracing::info!(category_id = %category.id, "Created category {}", category.name);
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, name: &str) -> AppResult<ForumCategoryModel> {
        let existing = self.get_by_id(id).await?;
        let mut active: forum_category::ActiveModel = existing.into();
        active.name = sea_orm::ActiveValue::Set(name.to_string());
        Ok(active.update(&self.db).await?)
    }

    /// Delete the category and everything below it.
    ///
    /// Returns the attachment rows removed by the cascade so their files can
    /// be cleaned up.
    pub async fn delete(&self, id: Uuid) -> AppResult<Vec<ForumMessageAttachmentModel>> {
        self.get_by_id(id).await?;
        let attachments = find_in_scope(&self.db, AttachmentScope::Category(id)).await?;
        ForumCategory::delete_by_id(id).exec(&self.db).await?;
        tracing::info!(category_id = %id, attachments = attachments.len(), "Deleted category");
        Ok(attachments)
    }
}

/// Number of topics per forum, for the given forums.
async fn topic_counts(
    db: &DatabaseConnection,
    forum_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, u64>> {
    if forum_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<Uuid> = ForumTopic::find()
        .select_only()
        .column(forum_topic::Column::ForumId)
        .filter(forum_topic::Column::ForumId.is_in(forum_ids))
        .into_tuple()
        .all(db)
        .await?;

    let mut counts = HashMap::new();
    for forum_id in rows {
        *counts.entry(forum_id).or_insert(0) += 1;
    }
    Ok(counts)
}
