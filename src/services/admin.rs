use crate::{
    error::{AppError, AppResult},
    models::{forum_topic, user, ForumMessageAttachmentModel, ForumTopic, Role, User, UserModel},
    services::attachment::{find_in_scope, AttachmentScope},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr,
};
use uuid::Uuid;

pub struct AdminService {
    db: DatabaseConnection,
}

impl AdminService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_users(&self, page: u64, per_page: u64) -> AppResult<(Vec<UserModel>, u64)> {
        let paginator = User::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    pub async fn update_user_role(&self, user_id: Uuid, role: &str) -> AppResult<UserModel> {
        let role = Role::parse(role).ok_or_else(|| {
            let valid = Role::ALL.map(|r| r.as_str()).join(", ");
            AppError::Validation(format!("Invalid role. Must be one of: {}", valid))
        })?;

        let existing = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: user::ActiveModel = existing.into();
        active.role = sea_orm::ActiveValue::Set(role.as_str().to_string());
        active.updated_at = sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc());
        let updated = active.update(&self.db).await?;
        tracing::info!(user_id = %updated.id, "Role changed to {}", updated.role);
        Ok(updated)
    }

    /// Remove an account together with its messages.
    ///
    /// Accounts that still own topics are refused; the topics would otherwise
    /// lose their creator. Returns the attachment rows removed with the
    /// messages.
    pub async fn delete_user(&self, user_id: Uuid) -> AppResult<Vec<ForumMessageAttachmentModel>> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let owned_topics = ForumTopic::find()
            .filter(forum_topic::Column::CreatorId.eq(user_id))
            .count(&self.db)
            .await?;
        if owned_topics > 0 {
            return Err(owned_topics_conflict(owned_topics));
        }

        let attachments = find_in_scope(&self.db, AttachmentScope::Creator(user_id)).await?;
        match User::delete_by_id(user_id).exec(&self.db).await {
            Ok(_) => {
                tracing::info!(user_id = %user_id, "Deleted user");
                Ok(attachments)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => {
                Err(owned_topics_conflict(1))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn owned_topics_conflict(count: u64) -> AppError {
    AppError::Conflict(format!(
        "User still owns {} topic(s); delete them first",
        count
    ))
}
