use crate::config::storage::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{required_parent, see_other, topic_url};
use crate::middleware::AuthUser;
use crate::models::{ForumMessageAttachmentModel, ForumMessageModel};
use crate::response::{add_field_error, validate_form, ApiResponse, FieldErrors, FormView};
use crate::services::{
    attachment::{
        client_file_name, AttachmentService, UploadedFile, ALLOWED_EXTENSIONS,
        PROHIBITED_FILE_TYPE,
    },
    message::MessageService,
    permissions::UserPermissions,
};
use axum::{
    extract::{Multipart, Path, Query},
    response::{IntoResponse, Response},
    Extension, Form,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttachmentListQuery {
    /// Only attachments of this message
    pub message_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CreateAttachmentQuery {
    /// Message the file is attached to
    pub message_id: Option<Uuid>,
}

/// Display name of an attachment. Uploads send it as the `file_name` part
/// next to the `file` part.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttachmentForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "File name is required and must be at most 200 characters"))]
    pub file_name: String,
}

impl AttachmentForm {
    fn trimmed(self) -> Self {
        Self {
            file_name: self.file_name.trim().to_string(),
        }
    }
}

/// Multipart body of an upload, for the API docs.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AttachmentUpload {
    /// Display name (1-200 characters)
    file_name: String,
    /// Image content; .jpg, .jpeg, .png or .gif
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub forum_message_id: Uuid,
    pub file_name: String,
    /// Public URL path, e.g. `/attachments/<32 hex digits>.gif`
    pub file_path: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<ForumMessageAttachmentModel> for AttachmentResponse {
    fn from(attachment: ForumMessageAttachmentModel) -> Self {
        Self {
            id: attachment.id,
            forum_message_id: attachment.forum_message_id,
            file_name: attachment.file_name,
            file_path: attachment.file_path,
            created_at: attachment.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentDetailResponse {
    #[serde(flatten)]
    pub attachment: AttachmentResponse,
    pub forum_topic_id: Uuid,
    /// Whether the current user may rename or delete the attachment
    pub can_edit: bool,
}

/// Check the display name and the uploaded file.
fn validate_upload(form: &AttachmentForm, upload: Option<&UploadedFile>) -> FieldErrors {
    let mut errors = validate_form(form);
    match upload {
        None => add_field_error(&mut errors, "file", "A file is required"),
        Some(upload) if !upload.has_allowed_extension() => {
            add_field_error(&mut errors, "file", PROHIBITED_FILE_TYPE)
        }
        Some(_) => {}
    }
    errors
}

/// Read the `file_name` and `file` parts. The file is buffered in memory up
/// to `max_bytes`; anything larger is rejected before it reaches the disk.
async fn read_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> AppResult<(AttachmentForm, Option<UploadedFile>)> {
    let mut form = AttachmentForm::default();
    let mut upload = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file_name" => {
                form.file_name = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
            }
            "file" => {
                let file_name = client_file_name(field.file_name().unwrap_or_default()).to_string();
                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?
                {
                    if data.len() + chunk.len() > max_bytes {
                        return Err(AppError::PayloadTooLarge);
                    }
                    data.extend_from_slice(&chunk);
                }
                // Browsers send an empty, unnamed part when no file was picked.
                if !(file_name.is_empty() && data.is_empty()) {
                    upload = Some(UploadedFile {
                        client_file_name: file_name,
                        data,
                    });
                }
            }
            _ => {}
        }
    }

    Ok((form, upload))
}

/// Load the message an upload targets, if the actor may edit it.
async fn editable_message(
    db: &DatabaseConnection,
    actor: &AuthUser,
    id: Uuid,
) -> AppResult<ForumMessageModel> {
    let message = MessageService::new(db.clone()).get_by_id(id).await?;
    if !UserPermissions::can_edit_forum_message(Some(actor), &message) {
        return Err(AppError::NotFound);
    }
    Ok(message)
}

/// Load an attachment whose owning message the actor may edit.
async fn editable_attachment(
    service: &AttachmentService,
    actor: &AuthUser,
    id: Uuid,
) -> AppResult<(ForumMessageAttachmentModel, ForumMessageModel)> {
    let (attachment, message) = service.get_with_message(id).await?;
    if !UserPermissions::can_edit_forum_message(Some(actor), &message) {
        return Err(AppError::NotFound);
    }
    Ok((attachment, message))
}

fn upload_context(message: &ForumMessageModel, storage: &StorageConfig) -> serde_json::Value {
    serde_json::json!({
        "message_id": message.id,
        "forum_topic_id": message.forum_topic_id,
        "allowed_extensions": ALLOWED_EXTENSIONS,
        "max_upload_bytes": storage.max_upload_bytes,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments",
    security(("jwt_token" = [])),
    params(AttachmentListQuery),
    responses(
        (status = 200, description = "Attachments, oldest first", body = Vec<AttachmentResponse>),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "attachments"
)]
pub async fn list_attachments(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    _auth_user: AuthUser,
    Query(query): Query<AttachmentListQuery>,
) -> AppResult<impl IntoResponse> {
    let attachments = AttachmentService::new(db, storage)
        .list(query.message_id)
        .await?;
    let items: Vec<AttachmentResponse> = attachments
        .into_iter()
        .map(|(attachment, _)| AttachmentResponse::from(attachment))
        .collect();

    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Attachment ID")),
    responses(
        (status = 200, description = "Attachment with its owning topic", body = AttachmentDetailResponse),
        (status = 404, description = "Attachment not found", body = AppError),
    ),
    tag = "attachments"
)]
pub async fn get_attachment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let (attachment, message) = AttachmentService::new(db, storage)
        .get_with_message(id)
        .await?;

    Ok(ApiResponse::ok(AttachmentDetailResponse {
        can_edit: UserPermissions::can_edit_forum_message(Some(&auth_user), &message),
        forum_topic_id: message.forum_topic_id,
        attachment: AttachmentResponse::from(attachment),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments/create",
    security(("jwt_token" = [])),
    params(CreateAttachmentQuery),
    responses(
        (status = 200, description = "Empty upload form with the accepted file types", body = AttachmentForm),
        (status = 404, description = "Message not found or not editable", body = AppError),
    ),
    tag = "attachments"
)]
pub async fn create_attachment_form(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Query(query): Query<CreateAttachmentQuery>,
) -> AppResult<Response> {
    let message = editable_message(&db, &auth_user, required_parent(query.message_id)?).await?;
    Ok(FormView::new(AttachmentForm::default())
        .with_context(upload_context(&message, &storage))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/attachments/create",
    security(("jwt_token" = [])),
    params(CreateAttachmentQuery),
    request_body(content = AttachmentUpload, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Stored; redirects to the topic"),
        (status = 404, description = "Message not found or not editable", body = AppError),
        (status = 413, description = "File too large", body = AppError),
        (status = 422, description = "Form with field errors", body = AttachmentForm),
    ),
    tag = "attachments"
)]
pub async fn create_attachment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Query(query): Query<CreateAttachmentQuery>,
    multipart: Multipart,
) -> AppResult<Response> {
    let message = editable_message(&db, &auth_user, required_parent(query.message_id)?).await?;

    let (form, upload) = read_upload(multipart, storage.max_upload_bytes).await?;
    let form = form.trimmed();
    let errors = validate_upload(&form, upload.as_ref());
    let Some(upload) = upload.filter(|_| errors.is_empty()) else {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(upload_context(&message, &storage))
            .into_response());
    };

    AttachmentService::new(db, storage)
        .create(&message, &form.file_name, &upload)
        .await?;
    Ok(see_other(topic_url(message.forum_topic_id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Attachment ID")),
    responses(
        (status = 200, description = "Form with the current display name", body = AttachmentForm),
        (status = 404, description = "Attachment not found or not editable", body = AppError),
    ),
    tag = "attachments"
)]
pub async fn edit_attachment_form(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let service = AttachmentService::new(db, storage);
    let (attachment, message) = editable_attachment(&service, &auth_user, id).await?;
    Ok(FormView::new(AttachmentForm {
        file_name: attachment.file_name,
    })
    .with_context(serde_json::json!({
        "id": attachment.id,
        "file_path": attachment.file_path,
        "forum_topic_id": message.forum_topic_id,
    }))
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/attachments/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Attachment ID")),
    request_body(content = AttachmentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Renamed; redirects to the topic"),
        (status = 404, description = "Attachment not found or not editable", body = AppError),
        (status = 422, description = "Form with field errors", body = AttachmentForm),
    ),
    tag = "attachments"
)]
pub async fn update_attachment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Form(form): Form<AttachmentForm>,
) -> AppResult<Response> {
    let service = AttachmentService::new(db, storage);
    let (attachment, message) = editable_attachment(&service, &auth_user, id).await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({
                "id": attachment.id,
                "file_path": attachment.file_path,
                "forum_topic_id": message.forum_topic_id,
            }))
            .into_response());
    }

    service.rename(attachment, &form.file_name).await?;
    Ok(see_other(topic_url(message.forum_topic_id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Attachment ID")),
    responses(
        (status = 200, description = "Attachment to confirm deletion of", body = AttachmentResponse),
        (status = 404, description = "Attachment not found or not deletable", body = AppError),
    ),
    tag = "attachments"
)]
pub async fn delete_attachment_confirm(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = AttachmentService::new(db, storage);
    let (attachment, _) = editable_attachment(&service, &auth_user, id).await?;
    Ok(ApiResponse::ok(AttachmentResponse::from(attachment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/attachments/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Attachment ID")),
    responses(
        (status = 303, description = "File and record removed; redirects to the topic"),
        (status = 404, description = "Attachment not found or not deletable", body = AppError),
    ),
    tag = "attachments"
)]
pub async fn delete_attachment(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let service = AttachmentService::new(db, storage);
    let (attachment, message) = editable_attachment(&service, &auth_user, id).await?;

    service.delete(&attachment).await?;
    Ok(see_other(topic_url(message.forum_topic_id)))
}
