use crate::config::parse_bool_env;
use crate::error::AppResult;
use crate::models::{user, Role, User};
use crate::utils::hash_password;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;
use uuid::Uuid;

/// Credentials of the administrator created on first start.
#[derive(Clone)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl BootstrapAdminConfig {
    pub fn from_env() -> Option<Self> {
        if !parse_bool_env("BOOTSTRAP_ADMIN_ENABLED", false) {
            return None;
        }

        Some(Self {
            username: env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?,
            email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok()?,
            password: env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?,
        })
    }
}

/// Make sure at least one administrator exists.
///
/// Does nothing when an admin is already present. Otherwise promotes the
/// account matching the configured username or email, or creates it.
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapAdminConfig::from_env() else {
        return Ok(());
    };

    let admin_exists = User::find()
        .filter(user::Column::Role.eq(Role::Admin.as_str()))
        .one(db)
        .await?
        .is_some();
    if admin_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(
            sea_orm::Condition::any()
                .add(user::Column::Email.eq(cfg.email.clone()))
                .add(user::Column::Username.eq(cfg.username.clone())),
        )
        .one(db)
        .await?;

    let now = chrono::Utc::now().naive_utc();

    if let Some(existing) = existing {
        tracing::info!("Promoting {} to admin", existing.username);
        let mut active: user::ActiveModel = existing.into();
        active.role = sea_orm::ActiveValue::Set(Role::Admin.as_str().to_string());
        active.updated_at = sea_orm::ActiveValue::Set(now);
        active.update(db).await?;
        return Ok(());
    }

    let new_admin = user::ActiveModel {
        id: sea_orm::ActiveValue::Set(Uuid::new_v4()),
        username: sea_orm::ActiveValue::Set(cfg.username),
        email: sea_orm::ActiveValue::Set(cfg.email),
        password_hash: sea_orm::ActiveValue::Set(hash_password(&cfg.password)?),
        role: sea_orm::ActiveValue::Set(Role::Admin.as_str().to_string()),
        created_at: sea_orm::ActiveValue::Set(now),
        updated_at: sea_orm::ActiveValue::Set(now),
    };

    let admin = new_admin.insert(db).await?;
    tracing::info!("Created bootstrap admin {}", admin.username);
    Ok(())
}
