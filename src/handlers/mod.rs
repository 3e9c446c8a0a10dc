pub mod admin;
pub mod attachment;
pub mod auth;
pub mod category;
pub mod csrf;
pub mod forum;
pub mod message;
pub mod topic;

use crate::error::{AppError, AppResult};
use crate::models::UserModel;
use anyhow::anyhow;
use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

pub use auth::*;

/// Public identity of a topic or message author.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatorResponse {
    pub id: Uuid,
    pub username: String,
}

impl From<UserModel> for CreatorResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Index page that administrators return to after managing the hierarchy.
pub(crate) fn categories_url() -> String {
    "/api/v1/categories".to_string()
}

pub(crate) fn forum_url(id: Uuid) -> String {
    format!("/api/v1/forums/{}", id)
}

pub(crate) fn topic_url(id: Uuid) -> String {
    format!("/api/v1/topics/{}", id)
}

/// 303 See Other, so the client follows up with a GET.
pub(crate) fn see_other(location: String) -> Response {
    Redirect::to(&location).into_response()
}

/// Required parent id from the query string; a missing one is a missing parent.
pub(crate) fn required_parent(id: Option<Uuid>) -> AppResult<Uuid> {
    id.ok_or(AppError::NotFound)
}

pub(crate) fn append_set_cookie(response: &mut Response, cookie_value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie_value).map_err(|e| {
        AppError::Internal(anyhow!("Failed to build Set-Cookie header value: {}", e))
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}
