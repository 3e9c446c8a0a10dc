#![allow(dead_code)]

use forum_board::config::{csrf::CsrfConfig, storage::StorageConfig};
use forum_board::models::{
    forum, forum_category, forum_message, forum_topic, user, Forum, ForumCategory, ForumMessage,
    ForumTopic, User,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};
use tower_http::services::ServeDir;
use uuid::Uuid;

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;

fn init_env() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var(
            "CSRF_SECRET",
            "integration_test_csrf_secret_at_least_32_characters",
        );
        let config = forum_board::config::jwt::JwtConfig::from_env().unwrap();
        let _ = forum_board::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
    pub storage: StorageConfig,
    pub csrf_token: String,
    scratch: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    /// URL outside the API prefix, e.g. a public attachment path.
    pub fn root_url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.get(self.url(path)), token)
    }

    /// A state-changing request carrying the CSRF cookie and header.
    pub fn send(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let request = self
            .client
            .request(method, self.url(path))
            .header("Cookie", format!("csrf_token={}", self.csrf_token))
            .header("X-CSRF-Token", &self.csrf_token);
        with_token(request, token)
    }

    pub async fn post_form(
        &self,
        path: &str,
        token: Option<&str>,
        form: &[(&str, &str)],
    ) -> Response {
        self.send(Method::POST, path, token)
            .form(form)
            .send()
            .await
            .expect("Failed to send form")
    }

    pub async fn upload(
        &self,
        message_id: Uuid,
        token: &str,
        display_name: &str,
        client_file_name: &str,
        data: Vec<u8>,
    ) -> Response {
        let part = reqwest::multipart::Part::bytes(data).file_name(client_file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("file_name", display_name.to_string())
            .part("file", part);
        self.send(
            Method::POST,
            &format!("/attachments/create?message_id={}", message_id),
            Some(token),
        )
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload")
    }

    /// Number of files currently stored under the attachment directory.
    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.storage.attachments_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.scratch);
    }
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let scratch = std::env::temp_dir().join(format!("forum_board_test_{}", Uuid::new_v4().simple()));
    let mut storage = StorageConfig::new(scratch.join("wwwroot"));
    // Small enough that an oversized body is fully sent before the server answers.
    storage.max_upload_bytes = TEST_MAX_UPLOAD_BYTES;
    std::fs::create_dir_all(storage.attachments_dir()).expect("Failed to create content root");

    let database_url = format!("sqlite://{}?mode=rwc", scratch.join("forum.db").display());
    let db = sea_orm::Database::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    forum_board::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let csrf = CsrfConfig::from_env().expect("CSRF config");

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(forum_board::routes::create_routes())
        .nest_service("/attachments", ServeDir::new(storage.attachments_dir()))
        .layer(axum::middleware::from_fn(
            forum_board::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(storage.clone()))
        .layer(axum::extract::Extension(csrf));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let addr_str = format!("http://{}", addr);
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let body: serde_json::Value = client
        .get(format!("{}/api/v1/csrf", addr_str))
        .send()
        .await
        .expect("Failed to fetch CSRF token")
        .json()
        .await
        .unwrap();
    let csrf_token = body["data"]["csrf_token"]
        .as_str()
        .expect("Response missing csrf_token")
        .to_string();

    TestApp {
        addr: addr_str,
        db,
        client,
        storage,
        csrf_token,
        scratch,
    }
}

/// Register a user and return (user_id, token).
pub async fn create_test_user(app: &TestApp, username_prefix: &str) -> (Uuid, String) {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    let unique_username = format!("{}_{}", username_prefix, counter);

    let resp = app
        .send(Method::POST, "/auth/register", None)
        .json(&serde_json::json!({
            "username": unique_username,
            "email": format!("{}@test.com", unique_username),
            "password": "test_password_123"
        }))
        .send()
        .await
        .expect("Failed to register user");

    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap();
    if !body["success"].as_bool().unwrap_or(false) {
        panic!(
            "Failed to register user '{}': status={}, body={}",
            unique_username, status, body
        );
    }

    let user_id = body["data"]["user_id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("Response missing user_id");
    let token = body["data"]["token"]
        .as_str()
        .expect("Response missing token")
        .to_string();
    (user_id, token)
}

/// Register a user and give it the admin role.
pub async fn create_admin(app: &TestApp) -> (Uuid, String) {
    let (admin_id, token) = create_test_user(app, "admin").await;
    make_admin(&app.db, admin_id).await;
    (admin_id, token)
}

/// Make a user admin by directly updating the database.
pub async fn make_admin(db: &DatabaseConnection, user_id: Uuid) {
    User::update_many()
        .col_expr(user::Column::Role, Expr::value("admin"))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await
        .expect("Failed to make user admin");
}

pub fn assert_redirect(resp: &Response, location: &str) {
    assert_eq!(resp.status(), 303, "expected a redirect to {}", location);
    assert_eq!(
        resp.headers()["location"].to_str().unwrap(),
        location,
        "unexpected redirect target"
    );
}

pub async fn create_category(app: &TestApp, admin_token: &str, name: &str) -> Uuid {
    let resp = app
        .post_form("/categories/create", Some(admin_token), &[("name", name)])
        .await;
    assert_redirect(&resp, "/api/v1/categories");

    ForumCategory::find()
        .filter(forum_category::Column::Name.eq(name))
        .one(&app.db)
        .await
        .unwrap()
        .expect("category was not stored")
        .id
}

pub async fn create_forum(app: &TestApp, admin_token: &str, category_id: Uuid, name: &str) -> Uuid {
    let resp = app
        .post_form(
            &format!("/forums/create?category_id={}", category_id),
            Some(admin_token),
            &[("name", name), ("description", "A test forum")],
        )
        .await;
    assert_redirect(&resp, "/api/v1/categories");

    Forum::find()
        .filter(forum::Column::Name.eq(name))
        .one(&app.db)
        .await
        .unwrap()
        .expect("forum was not stored")
        .id
}

pub async fn create_topic(app: &TestApp, token: &str, forum_id: Uuid, name: &str) -> Uuid {
    let resp = app
        .post_form(
            &format!("/topics/create?forum_id={}", forum_id),
            Some(token),
            &[("name", name)],
        )
        .await;
    assert_redirect(&resp, &format!("/api/v1/forums/{}", forum_id));

    ForumTopic::find()
        .filter(forum_topic::Column::Name.eq(name))
        .one(&app.db)
        .await
        .unwrap()
        .expect("topic was not stored")
        .id
}

pub async fn post_message(app: &TestApp, token: &str, topic_id: Uuid, text: &str) -> Uuid {
    let resp = app
        .post_form(
            &format!("/messages/create?topic_id={}", topic_id),
            Some(token),
            &[("text", text)],
        )
        .await;
    assert_redirect(&resp, &format!("/api/v1/topics/{}", topic_id));

    ForumMessage::find()
        .filter(forum_message::Column::Text.eq(text))
        .one(&app.db)
        .await
        .unwrap()
        .expect("message was not stored")
        .id
}

/// Admin, category, forum and a topic owned by a regular user.
pub struct Board {
    pub admin_token: String,
    pub owner_id: Uuid,
    pub owner_token: String,
    pub category_id: Uuid,
    pub forum_id: Uuid,
    pub topic_id: Uuid,
}

pub async fn seed_board(app: &TestApp) -> Board {
    let (_admin_id, admin_token) = create_admin(app).await;
    let (owner_id, owner_token) = create_test_user(app, "owner").await;
    let category_id = create_category(app, &admin_token, "General").await;
    let forum_id = create_forum(app, &admin_token, category_id, "Off-topic").await;
    let topic_id = create_topic(app, &owner_token, forum_id, "Welcome").await;

    Board {
        admin_token,
        owner_id,
        owner_token,
        category_id,
        forum_id,
        topic_id,
    }
}
