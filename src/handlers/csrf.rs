use crate::config::csrf::CsrfConfig;
use crate::error::AppResult;
use crate::handlers::append_set_cookie;
use crate::response::ApiResponse;
use crate::utils::{cookie::build_csrf_cookie, csrf::issue_token};
use axum::{
    response::{IntoResponse, Response},
    Extension,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CsrfTokenResponse {
    /// Echo this value in the `X-CSRF-Token` header of every mutating request.
    pub csrf_token: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/csrf",
    responses(
        (status = 200, description = "Fresh CSRF token, also set as the csrf_token cookie", body = CsrfTokenResponse),
    ),
    tag = "auth"
)]
pub async fn get_csrf_token(Extension(csrf): Extension<CsrfConfig>) -> AppResult<Response> {
    let token = issue_token(&csrf.secret)?;
    let cookie = build_csrf_cookie(&token);
    let mut response = ApiResponse::ok(CsrfTokenResponse { csrf_token: token }).into_response();
    append_set_cookie(&mut response, &cookie)?;
    Ok(response)
}
