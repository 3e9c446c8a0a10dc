use axum::{extract::Extension, middleware, response::IntoResponse, routing::get, Json, Router};
use forum_board::config::{self, csrf::CsrfConfig, jwt::JwtConfig, storage::StorageConfig};
use forum_board::{handlers, migration, routes, services, utils};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Auth routes
        handlers::csrf::get_csrf_token,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_current_user,
        handlers::auth::logout,
        // Category routes
        handlers::category::list_categories,
        handlers::category::get_category,
        handlers::category::create_category_form,
        handlers::category::create_category,
        handlers::category::edit_category_form,
        handlers::category::update_category,
        handlers::category::delete_category_confirm,
        handlers::category::delete_category,
        // Forum routes
        handlers::forum::list_forums,
        handlers::forum::get_forum,
        handlers::forum::create_forum_form,
        handlers::forum::create_forum,
        handlers::forum::edit_forum_form,
        handlers::forum::update_forum,
        handlers::forum::delete_forum_confirm,
        handlers::forum::delete_forum,
        // Topic routes
        handlers::topic::list_topics,
        handlers::topic::get_topic,
        handlers::topic::create_topic_form,
        handlers::topic::create_topic,
        handlers::topic::edit_topic_form,
        handlers::topic::update_topic,
        handlers::topic::delete_topic_confirm,
        handlers::topic::delete_topic,
        // Message routes
        handlers::message::list_messages,
        handlers::message::get_message,
        handlers::message::create_message_form,
        handlers::message::create_message,
        handlers::message::edit_message_form,
        handlers::message::update_message,
        handlers::message::delete_message_confirm,
        handlers::message::delete_message,
        // Attachment routes
        handlers::attachment::list_attachments,
        handlers::attachment::get_attachment,
        handlers::attachment::create_attachment_form,
        handlers::attachment::create_attachment,
        handlers::attachment::edit_attachment_form,
        handlers::attachment::update_attachment,
        handlers::attachment::delete_attachment_confirm,
        handlers::attachment::delete_attachment,
        // Admin routes
        handlers::admin::list_users,
        handlers::admin::update_user_role,
        handlers::admin::delete_user,
    ),
    components(
        schemas(
            forum_board::response::ApiResponse<serde_json::Value>,
            forum_board::response::PaginatedResponse<serde_json::Value>,
            forum_board::response::PaginationQuery,
            forum_board::error::AppError,
            handlers::CreatorResponse,
            // Auth
            handlers::csrf::CsrfTokenResponse,
            handlers::auth::RegisterRequest,
            handlers::auth::LoginRequest,
            handlers::auth::AuthResponse,
            handlers::auth::UserResponse,
            // Category
            handlers::category::CategoryForm,
            handlers::category::CategoryResponse,
            handlers::category::CategoryIndexResponse,
            handlers::category::CategoryDetailResponse,
            handlers::category::CategoryForumResponse,
            handlers::category::ForumSummaryResponse,
            // Forum
            handlers::forum::ForumForm,
            handlers::forum::ForumEditForm,
            handlers::forum::ForumResponse,
            handlers::forum::ForumDetailResponse,
            handlers::forum::ForumTopicResponse,
            // Topic
            handlers::topic::TopicForm,
            handlers::topic::TopicResponse,
            handlers::topic::TopicDetailResponse,
            handlers::topic::ThreadMessageResponse,
            handlers::topic::ForumRefResponse,
            // Message
            handlers::message::MessageForm,
            handlers::message::MessageResponse,
            // Attachment
            handlers::attachment::AttachmentForm,
            handlers::attachment::AttachmentUpload,
            handlers::attachment::AttachmentResponse,
            handlers::attachment::AttachmentDetailResponse,
            // Admin
            handlers::admin::AdminUserResponse,
            handlers::admin::UpdateRoleRequest,
        )
    ),
    tags(
        (name = "auth", description = "Authentication operations"),
        (name = "categories", description = "Category management operations"),
        (name = "forums", description = "Forum management operations"),
        (name = "topics", description = "Topic operations"),
        (name = "messages", description = "Message operations"),
        (name = "attachments", description = "Message attachment operations"),
        (name = "admin", description = "Administrative operations"),
    )
)]
struct ApiDoc;

/// Configuration read and checked before anything is started.
struct StartupConfig {
    database_url: String,
    jwt: JwtConfig,
    csrf: CsrfConfig,
    storage: StorageConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_board=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let startup = validate_config()?;

    utils::jwt::init_jwt_config(startup.jwt)?;

    tracing::info!("Starting forum board v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::connect(&startup.database_url).await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    services::bootstrap_admin::ensure_bootstrap_admin(&db).await?;

    let app = create_app(&startup.storage)
        .layer(Extension(db))
        .layer(Extension(startup.storage))
        .layer(Extension(startup.csrf));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<StartupConfig> {
    let jwt = JwtConfig::from_env()?;
    let csrf = CsrfConfig::from_env()?;

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable must be set"))?;

    // Attachment directory; created if missing
    let storage = StorageConfig::from_env();
    let attachments_dir = storage.attachments_dir();
    std::fs::create_dir_all(&attachments_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to create attachment directory '{}': {}",
            attachments_dir.display(),
            e
        )
    })?;

    Ok(StartupConfig {
        database_url,
        jwt,
        csrf,
        storage,
    })
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(forum_board::middleware::csrf::CSRF_HEADER),
        ]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins).allow_credentials(true)
    }
}

fn create_app(storage: &StorageConfig) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/attachments", ServeDir::new(storage.attachments_dir()))
        .layer(middleware::from_fn(
            forum_board::middleware::security::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "Forum board",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
