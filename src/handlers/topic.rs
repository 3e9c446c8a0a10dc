use crate::config::storage::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{
    attachment::AttachmentResponse, forum_url, required_parent, see_other, topic_url,
    CreatorResponse,
};
use crate::middleware::AuthUser;
use crate::models::{ForumModel, ForumTopicModel, UserModel};
use crate::response::{validate_form, ApiResponse, FormView};
use crate::services::{
    attachment::AttachmentService,
    forum::ForumService,
    permissions::UserPermissions,
    topic::{ThreadMessage, TopicService, TopicThread},
};
use crate::utils::render_markdown;
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
pub struct TopicListQuery {
    /// Only topics of this forum
    pub forum_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CreateTopicQuery {
    /// Forum the new topic is opened in
    pub forum_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct TopicForm {
    /// Topic title (1-200 characters)
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Name is required and must be at most 200 characters"))]
    pub name: String,
}

impl TopicForm {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicResponse {
    pub id: Uuid,
    pub forum_id: Uuid,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
    pub creator: Option<CreatorResponse>,
    /// Whether the current user may edit or delete the topic
    pub can_edit: bool,
}

impl TopicResponse {
    fn new(topic: ForumTopicModel, creator: Option<UserModel>, actor: Option<&AuthUser>) -> Self {
        Self {
            can_edit: UserPermissions::can_edit_forum_topic(actor, &topic),
            id: topic.id,
            forum_id: topic.forum_id,
            name: topic.name,
            created_at: topic.created_at,
            creator: creator.map(CreatorResponse::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumRefResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<ForumModel> for ForumRefResponse {
    fn from(forum: ForumModel) -> Self {
        Self {
            id: forum.id,
            name: forum.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThreadMessageResponse {
    pub id: Uuid,
    /// Raw markdown as written
    pub text: String,
    /// Sanitized HTML rendering of `text`
    pub text_html: String,
    pub created_at: chrono::NaiveDateTime,
    pub modified_at: chrono::NaiveDateTime,
    pub creator: Option<CreatorResponse>,
    pub can_edit: bool,
    pub attachments: Vec<AttachmentResponse>,
}

impl ThreadMessageResponse {
    fn new(entry: ThreadMessage, actor: Option<&AuthUser>) -> Self {
        let ThreadMessage {
            message,
            creator,
            attachments,
        } = entry;
        Self {
            can_edit: UserPermissions::can_edit_forum_message(actor, &message),
            text_html: render_markdown(&message.text),
            id: message.id,
            text: message.text,
            created_at: message.created_at,
            modified_at: message.modified_at,
            creator: creator.map(CreatorResponse::from),
            attachments: attachments
                .into_iter()
                .map(AttachmentResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
    pub forum: ForumRefResponse,
    pub creator: Option<CreatorResponse>,
    pub can_edit: bool,
    /// Oldest first
    pub messages: Vec<ThreadMessageResponse>,
}

impl TopicDetailResponse {
    fn new(thread: TopicThread, actor: Option<&AuthUser>) -> Self {
        Self {
            can_edit: UserPermissions::can_edit_forum_topic(actor, &thread.topic),
            id: thread.topic.id,
            name: thread.topic.name,
            created_at: thread.topic.created_at,
            forum: ForumRefResponse::from(thread.forum),
            creator: thread.creator.map(CreatorResponse::from),
            messages: thread
                .messages
                .into_iter()
                .map(|entry| ThreadMessageResponse::new(entry, actor))
                .collect(),
        }
    }
}

/// Load a topic the actor may edit. Anything else looks like a missing topic.
async fn editable_topic(
    service: &TopicService,
    actor: &AuthUser,
    id: Uuid,
) -> AppResult<ForumTopicModel> {
    let topic = service.get_by_id(id).await?;
    if !UserPermissions::can_edit_forum_topic(Some(actor), &topic) {
        return Err(AppError::NotFound);
    }
    Ok(topic)
}

#[utoipa::path(
    get,
    path = "/api/v1/topics",
    security(("jwt_token" = [])),
    params(TopicListQuery),
    responses(
        (status = 200, description = "Topics, newest first", body = Vec<TopicResponse>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "topics"
)]
pub async fn list_topics(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<TopicListQuery>,
) -> AppResult<impl IntoResponse> {
    let topics = TopicService::new(db).list(query.forum_id).await?;
    let items: Vec<TopicResponse> = topics
        .into_iter()
        .map(|(topic, creator)| TopicResponse::new(topic, creator, Some(&auth_user)))
        .collect();

    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{id}",
    params(("id" = Uuid, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Topic thread with messages and attachments", body = TopicDetailResponse),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "topics"
)]
pub async fn get_topic(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let thread = TopicService::new(db).thread(id).await?;
    Ok(ApiResponse::ok(TopicDetailResponse::new(
        thread,
        auth_user.as_ref(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/create",
    security(("jwt_token" = [])),
    params(CreateTopicQuery),
    responses(
        (status = 200, description = "Empty topic form", body = TopicForm),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "topics"
)]
pub async fn create_topic_form(
    Extension(db): Extension<DatabaseConnection>,
    _auth_user: AuthUser,
    Query(query): Query<CreateTopicQuery>,
) -> AppResult<Response> {
    let forum = ForumService::new(db)
        .get_by_id(required_parent(query.forum_id)?)
        .await?;
    Ok(FormView::new(TopicForm::default())
        .with_context(serde_json::json!({ "forum": ForumRefResponse::from(forum) }))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/create",
    security(("jwt_token" = [])),
    params(CreateTopicQuery),
    request_body(content = TopicForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirects to the forum"),
        (status = 404, description = "Forum not found", body = AppError),
        (status = 422, description = "Form with field errors", body = TopicForm),
    ),
    tag = "topics"
)]
pub async fn create_topic(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<CreateTopicQuery>,
    Form(form): Form<TopicForm>,
) -> AppResult<Response> {
    let forum = ForumService::new(db.clone())
        .get_by_id(required_parent(query.forum_id)?)
        .await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({ "forum": ForumRefResponse::from(forum) }))
            .into_response());
    }

    TopicService::new(db)
        .create(forum.id, auth_user.user_id, &form.name)
        .await?;
    Ok(see_other(forum_url(forum.id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Topic form with current values", body = TopicForm),
        (status = 404, description = "Topic not found or not editable", body = AppError),
    ),
    tag = "topics"
)]
pub async fn edit_topic_form(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let service = TopicService::new(db);
    let topic = editable_topic(&service, &auth_user, id).await?;
    Ok(FormView::new(TopicForm { name: topic.name })
        .with_context(serde_json::json!({ "id": topic.id, "forum_id": topic.forum_id }))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Topic ID")),
    request_body(content = TopicForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirects to the topic"),
        (status = 404, description = "Topic not found or not editable", body = AppError),
        (status = 422, description = "Form with field errors", body = TopicForm),
    ),
    tag = "topics"
)]
pub async fn update_topic(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Form(form): Form<TopicForm>,
) -> AppResult<Response> {
    let service = TopicService::new(db);
    let topic = editable_topic(&service, &auth_user, id).await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({ "id": topic.id, "forum_id": topic.forum_id }))
            .into_response());
    }

    let topic = service.rename(topic, &form.name).await?;
    Ok(see_other(topic_url(topic.id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/topics/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Topic ID")),
    responses(
        (status = 200, description = "Topic to confirm deletion of", body = TopicResponse),
        (status = 404, description = "Topic not found or not deletable", body = AppError),
    ),
    tag = "topics"
)]
pub async fn delete_topic_confirm(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = TopicService::new(db);
    let topic = editable_topic(&service, &auth_user, id).await?;
    Ok(ApiResponse::ok(TopicResponse::new(
        topic,
        None,
        Some(&auth_user),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/topics/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Topic ID")),
    responses(
        (status = 303, description = "Deleted with its messages and attachments; redirects to the forum"),
        (status = 404, description = "Topic not found or not deletable", body = AppError),
    ),
    tag = "topics"
)]
pub async fn delete_topic(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let service = TopicService::new(db.clone());
    let topic = editable_topic(&service, &auth_user, id).await?;

    let removed = service.delete(&topic).await?;
    AttachmentService::new(db, storage)
        .remove_files(&removed)
        .await;

    Ok(see_other(forum_url(topic.forum_id)))
}
