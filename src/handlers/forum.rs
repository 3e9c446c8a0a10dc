use crate::config::storage::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{
    categories_url, category::CategoryResponse, required_parent, see_other, CreatorResponse,
};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{ForumCategoryModel, ForumModel};
use crate::response::{add_field_error, validate_form, ApiResponse, FormView};
use crate::services::{
    attachment::AttachmentService,
    category::CategoryService,
    forum::{ForumDetail, ForumService, TopicSummary},
    permissions::UserPermissions,
};
use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Response},
    Extension, Form,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ForumListQuery {
    /// Only forums of this category
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CreateForumQuery {
    /// Category the new forum belongs to
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ForumForm {
    /// Forum name (1-200 characters)
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Name is required and must be at most 200 characters"))]
    pub name: String,
    /// Optional description; blank means none
    #[serde(default)]
    pub description: String,
}

/// Edit form; the category may be changed to move the forum.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ForumEditForm {
    #[serde(default)]
    pub forum_category_id: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Name is required and must be at most 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ForumForm {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

impl ForumEditForm {
    fn trimmed(self) -> Self {
        Self {
            forum_category_id: self.forum_category_id.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

impl From<&ForumModel> for ForumEditForm {
    fn from(forum: &ForumModel) -> Self {
        Self {
            forum_category_id: forum.forum_category_id.to_string(),
            name: forum.name.clone(),
            description: forum.description.clone().unwrap_or_default(),
        }
    }
}

fn optional_text(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumResponse {
    pub id: Uuid,
    pub forum_category_id: Uuid,
    pub category_name: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

impl ForumResponse {
    fn new(forum: ForumModel, category: Option<ForumCategoryModel>) -> Self {
        Self {
            id: forum.id,
            forum_category_id: forum.forum_category_id,
            category_name: category.map(|c| c.name),
            name: forum.name,
            description: forum.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumTopicResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
    pub creator: Option<CreatorResponse>,
    pub message_count: u64,
    /// Whether the current user may edit or delete the topic
    pub can_edit: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: CategoryResponse,
    /// Newest first
    pub topics: Vec<ForumTopicResponse>,
}

impl ForumDetailResponse {
    fn new(detail: ForumDetail, actor: Option<&AuthUser>) -> Self {
        let topics = detail
            .topics
            .into_iter()
            .map(|TopicSummary { topic, creator, message_count }| ForumTopicResponse {
                can_edit: UserPermissions::can_edit_forum_topic(actor, &topic),
                id: topic.id,
                name: topic.name,
                created_at: topic.created_at,
                creator: creator.map(CreatorResponse::from),
                message_count,
            })
            .collect();

        Self {
            id: detail.forum.id,
            name: detail.forum.name,
            description: detail.forum.description,
            category: CategoryResponse::from(detail.category),
            topics,
        }
    }
}

fn category_choices(categories: Vec<ForumCategoryModel>) -> serde_json::Value {
    serde_json::Value::Array(
        categories
            .into_iter()
            .map(|c| serde_json::json!({ "id": c.id, "name": c.name }))
            .collect(),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/forums",
    security(("jwt_token" = [])),
    params(ForumListQuery),
    responses(
        (status = 200, description = "Forums, optionally of one category", body = Vec<ForumResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "forums"
)]
pub async fn list_forums(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<ForumListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let forums = ForumService::new(db).list(query.category_id).await?;
    let items: Vec<ForumResponse> = forums
        .into_iter()
        .map(|(forum, category)| ForumResponse::new(forum, category))
        .collect();

    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}",
    params(("id" = Uuid, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Forum with its topics", body = ForumDetailResponse),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn get_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let detail = ForumService::new(db).detail(id).await?;
    Ok(ApiResponse::ok(ForumDetailResponse::new(
        detail,
        auth_user.as_ref(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/create",
    security(("jwt_token" = [])),
    params(CreateForumQuery),
    responses(
        (status = 200, description = "Empty forum form", body = ForumForm),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn create_forum_form(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<CreateForumQuery>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let category = CategoryService::new(db)
        .get_by_id(required_parent(query.category_id)?)
        .await?;
    Ok(FormView::new(ForumForm::default())
        .with_context(serde_json::json!({ "category": CategoryResponse::from(category) }))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/create",
    security(("jwt_token" = [])),
    params(CreateForumQuery),
    request_body(content = ForumForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirects to the board index"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
        (status = 422, description = "Form with field errors", body = ForumForm),
    ),
    tag = "forums"
)]
pub async fn create_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<CreateForumQuery>,
    Form(form): Form<ForumForm>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let category = CategoryService::new(db.clone())
        .get_by_id(required_parent(query.category_id)?)
        .await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({ "category": CategoryResponse::from(category) }))
            .into_response());
    }

    ForumService::new(db)
        .create(category.id, &form.name, optional_text(&form.description))
        .await?;
    Ok(see_other(categories_url()))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Forum form with current values and category choices", body = ForumEditForm),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn edit_forum_form(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let forum = ForumService::new(db.clone()).get_by_id(id).await?;
    let categories = CategoryService::new(db).list().await?;
    Ok(FormView::new(ForumEditForm::from(&forum))
        .with_context(serde_json::json!({
            "id": forum.id,
            "categories": category_choices(categories),
        }))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Forum ID")),
    request_body(content = ForumEditForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirects to the board index"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Forum not found", body = AppError),
        (status = 422, description = "Form with field errors", body = ForumEditForm),
    ),
    tag = "forums"
)]
pub async fn update_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Form(form): Form<ForumEditForm>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let service = ForumService::new(db.clone());
    let categories = CategoryService::new(db);
    let forum = service.get_by_id(id).await?;

    let form = form.trimmed();
    let mut errors = validate_form(&form);
    let category_id = match Uuid::parse_str(&form.forum_category_id) {
        Ok(category_id) => categories.find_by_id(category_id).await?.map(|c| c.id),
        Err(_) => None,
    };
    if category_id.is_none() {
        add_field_error(&mut errors, "forum_category_id", "Choose an existing category");
    }

    let Some(category_id) = category_id.filter(|_| errors.is_empty()) else {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({
                "id": forum.id,
                "categories": category_choices(categories.list().await?),
            }))
            .into_response());
    };

    service
        .update(
            forum.id,
            category_id,
            &form.name,
            optional_text(&form.description),
        )
        .await?;
    Ok(see_other(categories_url()))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Forum to confirm deletion of", body = ForumResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn delete_forum_confirm(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let forum = ForumService::new(db.clone()).get_by_id(id).await?;
    let category = CategoryService::new(db)
        .find_by_id(forum.forum_category_id)
        .await?;
    Ok(ApiResponse::ok(ForumResponse::new(forum, category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Forum ID")),
    responses(
        (status = 303, description = "Deleted with all topics, messages and attachments"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn delete_forum(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let removed = ForumService::new(db.clone()).delete(id).await?;
    AttachmentService::new(db, storage)
        .remove_files(&removed)
        .await;

    Ok(see_other(categories_url()))
}
