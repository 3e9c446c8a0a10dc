pub mod auth;
pub mod csrf;
pub mod security;

pub use auth::AuthUser;
