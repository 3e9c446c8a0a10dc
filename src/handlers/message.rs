use crate::config::storage::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{
    attachment::AttachmentResponse, required_parent, see_other, topic_url, CreatorResponse,
};
use crate::middleware::AuthUser;
use crate::models::{ForumMessageModel, ForumTopicModel, UserModel};
use crate::response::{validate_form, ApiResponse, FormView};
use crate::services::{
    attachment::AttachmentService, message::MessageService, permissions::UserPermissions,
    topic::TopicService,
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
pub struct MessageListQuery {
    /// Only messages of this topic
    pub topic_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CreateMessageQuery {
    /// Topic the message is posted in
    pub topic_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct MessageForm {
    /// Message body in markdown
    #[serde(default)]
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,
}

impl MessageForm {
    fn trimmed(self) -> Self {
        Self {
            text: self.text.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub forum_topic_id: Uuid,
    pub text: String,
    /// Sanitized HTML rendering of `text`
    pub text_html: String,
    pub created_at: chrono::NaiveDateTime,
    pub modified_at: chrono::NaiveDateTime,
    pub creator: Option<CreatorResponse>,
    pub can_edit: bool,
    /// Only filled in on the detail view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentResponse>>,
}

impl MessageResponse {
    fn new(
        message: ForumMessageModel,
        creator: Option<UserModel>,
        actor: Option<&AuthUser>,
    ) -> Self {
        Self {
            can_edit: UserPermissions::can_edit_forum_message(actor, &message),
            text_html: render_markdown(&message.text),
            id: message.id,
            forum_topic_id: message.forum_topic_id,
            text: message.text,
            created_at: message.created_at,
            modified_at: message.modified_at,
            creator: creator.map(CreatorResponse::from),
            attachments: None,
        }
    }
}

fn topic_context(topic: &ForumTopicModel) -> serde_json::Value {
    serde_json::json!({ "topic": { "id": topic.id, "name": topic.name } })
}

/// Load a message the actor may edit. Anything else looks like a missing message.
async fn editable_message(
    service: &MessageService,
    actor: &AuthUser,
    id: Uuid,
) -> AppResult<ForumMessageModel> {
    let message = service.get_by_id(id).await?;
    if !UserPermissions::can_edit_forum_message(Some(actor), &message) {
        return Err(AppError::NotFound);
    }
    Ok(message)
}

#[utoipa::path(
    get,
    path = "/api/v1/messages",
    security(("jwt_token" = [])),
    params(MessageListQuery),
    responses(
        (status = 200, description = "Messages in posting order", body = Vec<MessageResponse>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "messages"
)]
pub async fn list_messages(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<MessageListQuery>,
) -> AppResult<impl IntoResponse> {
    let messages = MessageService::new(db).list(query.topic_id).await?;
    let items: Vec<MessageResponse> = messages
        .into_iter()
        .map(|(message, creator)| MessageResponse::new(message, creator, Some(&auth_user)))
        .collect();

    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message with its attachments", body = MessageResponse),
        (status = 404, description = "Message not found", body = AppError),
    ),
    tag = "messages"
)]
pub async fn get_message(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (message, creator) = MessageService::new(db.clone()).get_with_creator(id).await?;
    let attachments = AttachmentService::new(db, storage)
        .list(Some(message.id))
        .await?;

    let mut response = MessageResponse::new(message, creator, Some(&auth_user));
    response.attachments = Some(
        attachments
            .into_iter()
            .map(|(attachment, _)| AttachmentResponse::from(attachment))
            .collect(),
    );
    Ok(ApiResponse::ok(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/create",
    security(("jwt_token" = [])),
    params(CreateMessageQuery),
    responses(
        (status = 200, description = "Empty message form", body = MessageForm),
        (status = 404, description = "Topic not found", body = AppError),
    ),
    tag = "messages"
)]
pub async fn create_message_form(
    Extension(db): Extension<DatabaseConnection>,
    _auth_user: AuthUser,
    Query(query): Query<CreateMessageQuery>,
) -> AppResult<Response> {
    let topic = TopicService::new(db)
        .get_by_id(required_parent(query.topic_id)?)
        .await?;
    Ok(FormView::new(MessageForm::default())
        .with_context(topic_context(&topic))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/messages/create",
    security(("jwt_token" = [])),
    params(CreateMessageQuery),
    request_body(content = MessageForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Posted; redirects to the topic"),
        (status = 404, description = "Topic not found", body = AppError),
        (status = 422, description = "Form with field errors", body = MessageForm),
    ),
    tag = "messages"
)]
pub async fn create_message(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<CreateMessageQuery>,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    let topic = TopicService::new(db.clone())
        .get_by_id(required_parent(query.topic_id)?)
        .await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(topic_context(&topic))
            .into_response());
    }

    MessageService::new(db)
        .create(topic.id, auth_user.user_id, &form.text)
        .await?;
    Ok(see_other(topic_url(topic.id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message form with current text", body = MessageForm),
        (status = 404, description = "Message not found or not editable", body = AppError),
    ),
    tag = "messages"
)]
pub async fn edit_message_form(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let service = MessageService::new(db);
    let message = editable_message(&service, &auth_user, id).await?;
    Ok(FormView::new(MessageForm { text: message.text })
        .with_context(serde_json::json!({ "id": message.id, "forum_topic_id": message.forum_topic_id }))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/messages/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body(content = MessageForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirects to the topic"),
        (status = 404, description = "Message not found or not editable", body = AppError),
        (status = 422, description = "Form with field errors", body = MessageForm),
    ),
    tag = "messages"
)]
pub async fn update_message(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    let service = MessageService::new(db);
    let message = editable_message(&service, &auth_user, id).await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({ "id": message.id, "forum_topic_id": message.forum_topic_id }))
            .into_response());
    }

    let message = service.update_text(message, &form.text).await?;
    Ok(see_other(topic_url(message.forum_topic_id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message to confirm deletion of", body = MessageResponse),
        (status = 404, description = "Message not found or not deletable", body = AppError),
    ),
    tag = "messages"
)]
pub async fn delete_message_confirm(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = MessageService::new(db);
    let message = editable_message(&service, &auth_user, id).await?;
    Ok(ApiResponse::ok(MessageResponse::new(
        message,
        None,
        Some(&auth_user),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/messages/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 303, description = "Deleted with its attachments; redirects to the topic"),
        (status = 404, description = "Message not found or not deletable", body = AppError),
    ),
    tag = "messages"
)]
pub async fn delete_message(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let service = MessageService::new(db.clone());
    let message = editable_message(&service, &auth_user, id).await?;

    let removed = service.delete(&message).await?;
    AttachmentService::new(db, storage)
        .remove_files(&removed)
        .await;

    Ok(see_other(topic_url(message.forum_topic_id)))
}
