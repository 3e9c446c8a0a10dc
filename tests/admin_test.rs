mod common;

use forum_board::models::{ForumMessage, User};
use reqwest::Method;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn admin_lists_users() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;
    common::create_test_user(&app, "member").await;

    let resp = app
        .get("/admin/users?page=1&per_page=10", Some(&admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert!(body["data"]["items"][0].get("password_hash").is_none());
}

#[tokio::test]
async fn regular_user_is_forbidden() {
    let app = common::spawn_app().await;
    let (user_id, token) = common::create_test_user(&app, "member").await;

    let resp = app.get("/admin/users", Some(&token)).send().await.unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .send(Method::PUT, &format!("/admin/users/{}/role", user_id), Some(&token))
        .json(&serde_json::json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let user = User::find_by_id(user_id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn promoted_user_gains_admin_rights_immediately() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;
    let (user_id, token) = common::create_test_user(&app, "member").await;

    let resp = app
        .send(Method::PUT, &format!("/admin/users/{}/role", user_id), Some(&admin_token))
        .json(&serde_json::json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");

    // The same token now passes the admin check.
    let resp = app
        .post_form("/categories/create", Some(&token), &[("name", "Promoted")])
        .await;
    common::assert_redirect(&resp, "/api/v1/categories");
}

#[tokio::test]
async fn unknown_role_is_rejected() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;
    let (user_id, _token) = common::create_test_user(&app, "member").await;

    let resp = app
        .send(Method::PUT, &format!("/admin/users/{}/role", user_id), Some(&admin_token))
        .json(&serde_json::json!({ "role": "superuser" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .send(Method::PUT, &format!("/admin/users/{}/role", Uuid::new_v4()), Some(&admin_token))
        .json(&serde_json::json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn user_owning_topics_cannot_be_deleted() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app
        .send(Method::DELETE, &format!("/admin/users/{}", board.owner_id), Some(&board.admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("1 topic"));

    assert!(User::find_by_id(board.owner_id).one(&app.db).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_user_removes_their_messages_and_files() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    let (replier_id, replier_token) = common::create_test_user(&app, "replier").await;
    let message_id = common::post_message(&app, &replier_token, board.topic_id, "Drive-by").await;
    let resp = app
        .upload(message_id, &replier_token, "Banner", "banner.gif", b"GIF89a".to_vec())
        .await;
    assert_eq!(resp.status(), 303);
    assert_eq!(app.stored_file_count(), 1);

    let resp = app
        .send(Method::DELETE, &format!("/admin/users/{}", replier_id), Some(&board.admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    assert!(User::find_by_id(replier_id).one(&app.db).await.unwrap().is_none());
    assert_eq!(ForumMessage::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(app.stored_file_count(), 0);

    let resp = app
        .send(Method::DELETE, &format!("/admin/users/{}", replier_id), Some(&board.admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
