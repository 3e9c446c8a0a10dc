use crate::handlers;
use crate::middleware::{
    auth::{auth_middleware, optional_auth_middleware},
    csrf::csrf_middleware,
};
use axum::{extract::DefaultBodyLimit, middleware, routing, Router};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let public = public_routes();
    let public_read = public_read_routes().layer(middleware::from_fn(optional_auth_middleware));
    let protected = protected_routes().layer(middleware::from_fn(auth_middleware));

    public
        .merge(public_read)
        .merge(protected)
        .layer(middleware::from_fn(csrf_middleware))
}

/// Routes that never look at the caller.
fn public_routes() -> Router {
    Router::new()
        .route("/csrf", routing::get(handlers::csrf::get_csrf_token))
        .route("/auth/register", routing::post(handlers::register))
        .route("/auth/login", routing::post(handlers::login))
        .route(
            "/categories",
            routing::get(handlers::category::list_categories),
        )
}

/// Anonymous reads that still report what the caller may edit.
fn public_read_routes() -> Router {
    Router::new()
        .route("/forums/{id}", routing::get(handlers::forum::get_forum))
        .route("/topics/{id}", routing::get(handlers::topic::get_topic))
}

fn protected_routes() -> Router {
    Router::new()
        // Auth
        .route("/auth/me", routing::get(handlers::get_current_user))
        .route("/auth/logout", routing::post(handlers::logout))
        // Categories (admin only - checked in handler)
        .route(
            "/categories/create",
            routing::get(handlers::category::create_category_form)
                .post(handlers::category::create_category),
        )
        .route(
            "/categories/{id}",
            routing::get(handlers::category::get_category),
        )
        .route(
            "/categories/{id}/edit",
            routing::get(handlers::category::edit_category_form)
                .post(handlers::category::update_category),
        )
        .route(
            "/categories/{id}/delete",
            routing::get(handlers::category::delete_category_confirm)
                .post(handlers::category::delete_category),
        )
        // Forums (admin only - checked in handler)
        .route("/forums", routing::get(handlers::forum::list_forums))
        .route(
            "/forums/create",
            routing::get(handlers::forum::create_forum_form)
                .post(handlers::forum::create_forum),
        )
        .route(
            "/forums/{id}/edit",
            routing::get(handlers::forum::edit_forum_form).post(handlers::forum::update_forum),
        )
        .route(
            "/forums/{id}/delete",
            routing::get(handlers::forum::delete_forum_confirm)
                .post(handlers::forum::delete_forum),
        )
        // Topics
        .route("/topics", routing::get(handlers::topic::list_topics))
        .route(
            "/topics/create",
            routing::get(handlers::topic::create_topic_form)
                .post(handlers::topic::create_topic),
        )
        .route(
            "/topics/{id}/edit",
            routing::get(handlers::topic::edit_topic_form).post(handlers::topic::update_topic),
        )
        .route(
            "/topics/{id}/delete",
            routing::get(handlers::topic::delete_topic_confirm)
                .post(handlers::topic::delete_topic),
        )
        // Messages
        .route("/messages", routing::get(handlers::message::list_messages))
        .route(
            "/messages/create",
            routing::get(handlers::message::create_message_form)
                .post(handlers::message::create_message),
        )
        .route(
            "/messages/{id}",
            routing::get(handlers::message::get_message),
        )
        .route(
            "/messages/{id}/edit",
            routing::get(handlers::message::edit_message_form)
                .post(handlers::message::update_message),
        )
        .route(
            "/messages/{id}/delete",
            routing::get(handlers::message::delete_message_confirm)
                .post(handlers::message::delete_message),
        )
        // Attachments; the upload handler enforces its own size limit
        .route(
            "/attachments",
            routing::get(handlers::attachment::list_attachments),
        )
        .route(
            "/attachments/create",
            routing::get(handlers::attachment::create_attachment_form)
                .post(handlers::attachment::create_attachment)
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/attachments/{id}",
            routing::get(handlers::attachment::get_attachment),
        )
        .route(
            "/attachments/{id}/edit",
            routing::get(handlers::attachment::edit_attachment_form)
                .post(handlers::attachment::update_attachment),
        )
        .route(
            "/attachments/{id}/delete",
            routing::get(handlers::attachment::delete_attachment_confirm)
                .post(handlers::attachment::delete_attachment),
        )
        // Admin
        .route("/admin/users", routing::get(handlers::admin::list_users))
        .route(
            "/admin/users/{id}/role",
            routing::put(handlers::admin::update_user_role),
        )
        .route(
            "/admin/users/{id}",
            routing::delete(handlers::admin::delete_user),
        )
}
