use crate::{
    error::{AppError, AppResult},
    models::{Role, User},
    utils::{
        cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
        jwt::decode_jwt,
    },
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::convert::Infallible;
use uuid::Uuid;

/// The authenticated actor of a request.
///
/// Built once by the auth middleware and handed to handlers and the
/// permission checks as an explicit value.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Rejects requests without a valid access token.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = resolve_auth_user(&db, &headers).await?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Attaches the actor when a valid token is present, otherwise lets the
/// request through anonymously.
pub async fn optional_auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_auth_user(&db, &headers).await {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
        }
        Err(AppError::Unauthorized) => {}
        Err(e) => tracing::warn!("Treating request as anonymous: {}", e),
    }
    next.run(request).await
}

async fn resolve_auth_user(db: &DatabaseConnection, headers: &HeaderMap) -> AppResult<AuthUser> {
    // Prefer Authorization: Bearer, fallback to HttpOnly cookie.
    let token = extract_bearer_token(headers)
        .or_else(|| extract_cookie(headers, ACCESS_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let claims = decode_jwt(&token).map_err(|_| AppError::Unauthorized)?;
    let user_id: Uuid = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;

    // Role is read fresh so that demotions take effect immediately.
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role(),
        username: user.username,
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Categories and forums are managed by administrators only.
pub fn require_admin(auth_user: &AuthUser) -> AppResult<()> {
    if !auth_user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn empty_or_foreign_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(extract_bearer_token(&headers), None);
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic Zm9vOmJhcg=="),
        );
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn only_admins_pass_the_admin_gate() {
        let mut user = AuthUser {
            user_id: Uuid::new_v4(),
            username: "u".to_string(),
            role: Role::User,
        };
        assert!(matches!(require_admin(&user), Err(AppError::Forbidden)));
        user.role = Role::Admin;
        assert!(require_admin(&user).is_ok());
    }
}
