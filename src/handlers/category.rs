use crate::config::storage::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{categories_url, see_other};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{ForumCategoryModel, ForumModel};
use crate::response::{validate_form, ApiResponse, FormView};
use crate::services::{
    attachment::AttachmentService,
    category::{CategoryOverview, CategoryService, ForumSummary},
    forum::ForumService,
};
use axum::{
    extract::Path,
    response::{IntoResponse, Response},
    Extension, Form,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryForm {
    /// Category name (1-200 characters)
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Name is required and must be at most 200 characters"))]
    pub name: String,
}

impl CategoryForm {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }
}

impl From<&ForumCategoryModel> for CategoryForm {
    fn from(category: &ForumCategoryModel) -> Self {
        Self {
            name: category.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<ForumCategoryModel> for CategoryResponse {
    fn from(category: ForumCategoryModel) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Number of topics in the forum
    pub topic_count: u64,
}

impl From<ForumSummary> for ForumSummaryResponse {
    fn from(summary: ForumSummary) -> Self {
        Self {
            id: summary.forum.id,
            name: summary.forum.name,
            description: summary.forum.description,
            topic_count: summary.topic_count,
        }
    }
}

/// A category on the board index.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryIndexResponse {
    pub id: Uuid,
    pub name: String,
    pub forums: Vec<ForumSummaryResponse>,
}

impl From<CategoryOverview> for CategoryIndexResponse {
    fn from(overview: CategoryOverview) -> Self {
        Self {
            id: overview.category.id,
            name: overview.category.name,
            forums: overview
                .forums
                .into_iter()
                .map(ForumSummaryResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub forums: Vec<CategoryForumResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryForumResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<ForumModel> for CategoryForumResponse {
    fn from(forum: ForumModel) -> Self {
        Self {
            id: forum.id,
            name: forum.name,
            description: forum.description,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Board index: categories with their forums", body = Vec<CategoryIndexResponse>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let service = CategoryService::new(db);
    let overview = service.list_overview().await?;
    let items: Vec<CategoryIndexResponse> = overview
        .into_iter()
        .map(CategoryIndexResponse::from)
        .collect();

    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category with its forums", body = CategoryDetailResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn get_category(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let category = CategoryService::new(db.clone()).get_by_id(id).await?;
    let forums = ForumService::new(db).list(Some(id)).await?;

    Ok(ApiResponse::ok(CategoryDetailResponse {
        id: category.id,
        name: category.name,
        forums: forums
            .into_iter()
            .map(|(forum, _)| CategoryForumResponse::from(forum))
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/create",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Empty category form", body = CategoryForm),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "categories"
)]
pub async fn create_category_form(auth_user: AuthUser) -> AppResult<Response> {
    require_admin(&auth_user)?;
    Ok(FormView::new(CategoryForm::default()).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/create",
    security(("jwt_token" = [])),
    request_body(content = CategoryForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirects to the board index"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 422, description = "Form with field errors", body = CategoryForm),
    ),
    tag = "categories"
)]
pub async fn create_category(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form).with_errors(errors).into_response());
    }

    CategoryService::new(db).create(&form.name).await?;
    Ok(see_other(categories_url()))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category form with current values", body = CategoryForm),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn edit_category_form(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let category = CategoryService::new(db).get_by_id(id).await?;
    Ok(FormView::new(CategoryForm::from(&category))
        .with_context(serde_json::json!({ "id": category.id }))
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/{id}/edit",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body(content = CategoryForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Saved; redirects to the board index"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
        (status = 422, description = "Form with field errors", body = CategoryForm),
    ),
    tag = "categories"
)]
pub async fn update_category(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let service = CategoryService::new(db);
    let category = service.get_by_id(id).await?;

    let form = form.trimmed();
    let errors = validate_form(&form);
    if !errors.is_empty() {
        return Ok(FormView::new(form)
            .with_errors(errors)
            .with_context(serde_json::json!({ "id": category.id }))
            .into_response());
    }

    service.update(category.id, &form.name).await?;
    Ok(see_other(categories_url()))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category to confirm deletion of", body = CategoryResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn delete_category_confirm(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;

    let category = CategoryService::new(db).get_by_id(id).await?;
    Ok(ApiResponse::ok(CategoryResponse::from(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories/{id}/delete",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 303, description = "Deleted with all forums, topics, messages and attachments"),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "Category not found", body = AppError),
    ),
    tag = "categories"
)]
pub async fn delete_category(
    Extension(db): Extension<DatabaseConnection>,
    Extension(storage): Extension<StorageConfig>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    require_admin(&auth_user)?;

    let removed = CategoryService::new(db.clone()).delete(id).await?;
    AttachmentService::new(db, storage)
        .remove_files(&removed)
        .await;

    Ok(see_other(categories_url()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected_after_trimming() {
        let form = CategoryForm {
            name: "   ".to_string(),
        }
        .trimmed();
        let errors = validate_form(&form);
        assert!(errors.contains_key("name"));
    }

    #[test]
    fn name_limit_counts_characters() {
        let ok = CategoryForm {
            name: "é".repeat(200),
        };
        assert!(validate_form(&ok).is_empty());

        let too_long = CategoryForm {
            name: "a".repeat(201),
        };
        assert!(validate_form(&too_long).contains_key("name"));
    }
}
