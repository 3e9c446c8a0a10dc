use crate::{
    config::csrf::CsrfConfig,
    error::AppError,
    utils::{
        cookie::{extract_cookie, CSRF_COOKIE},
        csrf::tokens_match,
    },
};
use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
    Extension,
};

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Every state-changing request must echo the `csrf_token` cookie in the
/// `X-CSRF-Token` header.
pub async fn csrf_middleware(
    Extension(config): Extension<CsrfConfig>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let cookie = extract_cookie(&headers, CSRF_COOKIE);
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());

    match (cookie, header) {
        (Some(cookie), Some(header)) if tokens_match(&config.secret, &cookie, header) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected request with missing or invalid CSRF token"
            );
            Err(AppError::Forbidden)
        }
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
