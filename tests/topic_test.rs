mod common;

use forum_board::models::{ForumMessage, ForumTopic};
use reqwest::Method;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn topic_thread_shows_messages_in_order() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    let (_reader_id, reader_token) = common::create_test_user(&app, "reader").await;

    common::post_message(&app, &board.owner_token, board.topic_id, "Hello **world**").await;
    common::post_message(&app, &reader_token, board.topic_id, "Hi <script>alert(1)</script>").await;

    let resp = app
        .get(&format!("/topics/{}", board.topic_id), Some(&reader_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["name"], "Welcome");
    assert_eq!(data["forum"]["name"], "Off-topic");
    assert_eq!(data["can_edit"], false);

    let messages = data["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["text"], "Hello **world**");
    assert!(messages[0]["text_html"]
        .as_str()
        .unwrap()
        .contains("<strong>world</strong>"));
    assert_eq!(messages[0]["can_edit"], false);
    assert!(!messages[1]["text_html"].as_str().unwrap().contains("<script"));
    assert_eq!(messages[1]["can_edit"], true);
}

#[tokio::test]
async fn anonymous_visitor_reads_topic_without_edit_rights() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app
        .get(&format!("/topics/{}", board.topic_id), None)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["can_edit"], false);
    assert_eq!(body["data"]["creator"]["id"], board.owner_id.to_string());

    let resp = app
        .get(&format!("/topics/{}", Uuid::new_v4()), None)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn create_topic_needs_a_forum_and_a_name() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app
        .get(
            &format!("/topics/create?forum_id={}", board.forum_id),
            Some(&board.owner_token),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .post_form(
            &format!("/topics/create?forum_id={}", board.forum_id),
            Some(&board.owner_token),
            &[("name", " ")],
        )
        .await;
    assert_eq!(resp.status(), 422);

    let resp = app
        .post_form(
            &format!("/topics/create?forum_id={}", Uuid::new_v4()),
            Some(&board.owner_token),
            &[("name", "Lost")],
        )
        .await;
    assert_eq!(resp.status(), 404);

    let resp = app
        .post_form(
            &format!("/topics/create?forum_id={}", board.forum_id),
            None,
            &[("name", "Anonymous")],
        )
        .await;
    assert_eq!(resp.status(), 401);

    assert_eq!(ForumTopic::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn owner_renames_topic() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app
        .get(&format!("/topics/{}/edit", board.topic_id), Some(&board.owner_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["form"]["name"], "Welcome");

    let resp = app
        .post_form(
            &format!("/topics/{}/edit", board.topic_id),
            Some(&board.owner_token),
            &[("name", "Welcome aboard")],
        )
        .await;
    common::assert_redirect(&resp, &format!("/api/v1/topics/{}", board.topic_id));

    let topic = ForumTopic::find_by_id(board.topic_id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(topic.name, "Welcome aboard");
}

#[tokio::test]
async fn other_users_cannot_see_edit_or_delete_forms() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    let (_intruder_id, intruder_token) = common::create_test_user(&app, "intruder").await;

    for path in [
        format!("/topics/{}/edit", board.topic_id),
        format!("/topics/{}/delete", board.topic_id),
    ] {
        let resp = app.get(&path, Some(&intruder_token)).send().await.unwrap();
        assert_eq!(resp.status(), 404, "GET {}", path);
    }

    let resp = app
        .post_form(
            &format!("/topics/{}/edit", board.topic_id),
            Some(&intruder_token),
            &[("name", "Hijacked")],
        )
        .await;
    assert_eq!(resp.status(), 404);

    let resp = app
        .post_form(
            &format!("/topics/{}/delete", board.topic_id),
            Some(&intruder_token),
            &[],
        )
        .await;
    assert_eq!(resp.status(), 404);

    let topic = ForumTopic::find_by_id(board.topic_id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(topic.name, "Welcome");
}

#[tokio::test]
async fn admin_may_edit_any_topic() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app
        .post_form(
            &format!("/topics/{}/edit", board.topic_id),
            Some(&board.admin_token),
            &[("name", "Moderated")],
        )
        .await;
    common::assert_redirect(&resp, &format!("/api/v1/topics/{}", board.topic_id));
}

#[tokio::test]
async fn deleting_topic_removes_messages_and_second_delete_is_not_found() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    common::post_message(&app, &board.owner_token, board.topic_id, "Soon gone").await;

    let resp = app
        .get(&format!("/topics/{}/delete", board.topic_id), Some(&board.owner_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Welcome");

    let resp = app
        .send(
            Method::POST,
            &format!("/topics/{}/delete", board.topic_id),
            Some(&board.owner_token),
        )
        .send()
        .await
        .unwrap();
    common::assert_redirect(&resp, &format!("/api/v1/forums/{}", board.forum_id));

    assert_eq!(ForumTopic::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(ForumMessage::find().count(&app.db).await.unwrap(), 0);

    let resp = app
        .send(
            Method::POST,
            &format!("/topics/{}/delete", board.topic_id),
            Some(&board.owner_token),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn list_topics_filters_by_forum() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    let other_forum =
        common::create_forum(&app, &board.admin_token, board.category_id, "Elsewhere").await;
    common::create_topic(&app, &board.owner_token, other_forum, "Far away").await;

    let body: Value = app
        .get(&format!("/topics?forum_id={}", board.forum_id), Some(&board.owner_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let topics = body["data"].as_array().unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["name"], "Welcome");

    let body: Value = app
        .get("/topics", Some(&board.owner_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}
