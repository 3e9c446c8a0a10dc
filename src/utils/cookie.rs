use axum::http::{header, HeaderMap};
use std::sync::OnceLock;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const CSRF_COOKIE: &str = "csrf_token";

#[derive(Debug, Clone)]
struct CookieConfig {
    secure: bool,
    same_site: &'static str,
}

impl CookieConfig {
    fn from_env() -> Self {
        let same_site = parse_same_site(
            &std::env::var("AUTH_COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()),
        );
        let mut secure = crate::config::parse_bool_env("AUTH_COOKIE_SECURE", false);

        // Browsers require SameSite=None cookies to also be Secure.
        if same_site == "None" {
            secure = true;
        }

        Self { secure, same_site }
    }
}

fn cookie_config() -> &'static CookieConfig {
    static CONFIG: OnceLock<CookieConfig> = OnceLock::new();
    CONFIG.get_or_init(CookieConfig::from_env)
}

fn parse_same_site(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

fn finish(mut cookie: String) -> String {
    if cookie_config().secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// HttpOnly session cookie holding the access token.
pub fn build_auth_cookie(value: &str, max_age_seconds: u64) -> String {
    finish(format!(
        "{ACCESS_TOKEN_COOKIE}={value}; Path=/; Max-Age={max_age_seconds}; HttpOnly; SameSite={}",
        cookie_config().same_site
    ))
}

pub fn build_clear_auth_cookie() -> String {
    finish(format!(
        "{ACCESS_TOKEN_COOKIE}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite={}",
        cookie_config().same_site
    ))
}

/// The CSRF cookie is readable by scripts: clients echo it back in a header.
pub fn build_csrf_cookie(value: &str) -> String {
    finish(format!(
        "{CSRF_COOKIE}={value}; Path=/; SameSite={}",
        cookie_config().same_site
    ))
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| {
            cookie_header.split(';').find_map(|cookie| {
                let (key, value) = cookie.trim().split_once('=')?;
                (key.trim() == name).then(|| value.trim().to_string())
            })
        })
}
