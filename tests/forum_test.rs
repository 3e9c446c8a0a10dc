mod common;

use forum_board::models::{Forum, ForumTopic};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn forum_detail_is_public_and_lists_topics() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    common::post_message(&app, &board.owner_token, board.topic_id, "First!").await;

    let resp = app
        .get(&format!("/forums/{}", board.forum_id), None)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["name"], "Off-topic");
    assert_eq!(data["description"], "A test forum");
    assert_eq!(data["category"]["name"], "General");
    assert_eq!(data["topics"][0]["name"], "Welcome");
    assert_eq!(data["topics"][0]["message_count"], 1);
    assert_eq!(data["topics"][0]["can_edit"], false);

    // The owner sees their own topic as editable.
    let resp = app
        .get(&format!("/forums/{}", board.forum_id), Some(&board.owner_token))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["topics"][0]["can_edit"], true);
}

#[tokio::test]
async fn index_counts_topics_per_forum() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    common::create_topic(&app, &board.owner_token, board.forum_id, "Second").await;

    let body: Value = app
        .get("/categories", None)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"][0]["forums"][0]["topic_count"], 2);
}

#[tokio::test]
async fn create_forum_requires_existing_category() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;

    let resp = app
        .post_form("/forums/create", Some(&admin_token), &[("name", "Orphan")])
        .await;
    assert_eq!(resp.status(), 404);

    let resp = app
        .post_form(
            &format!("/forums/create?category_id={}", Uuid::new_v4()),
            Some(&admin_token),
            &[("name", "Orphan")],
        )
        .await;
    assert_eq!(resp.status(), 404);

    assert_eq!(Forum::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn blank_description_is_stored_as_none() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;
    let category_id = common::create_category(&app, &admin_token, "General").await;

    let resp = app
        .post_form(
            &format!("/forums/create?category_id={}", category_id),
            Some(&admin_token),
            &[("name", "Quiet"), ("description", "   ")],
        )
        .await;
    common::assert_redirect(&resp, "/api/v1/categories");

    let forum = Forum::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(forum.name, "Quiet");
    assert_eq!(forum.description, None);
}

#[tokio::test]
async fn edit_moves_forum_to_another_category() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;
    let other = common::create_category(&app, &board.admin_token, "Archive").await;

    let resp = app
        .get(&format!("/forums/{}/edit", board.forum_id), Some(&board.admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["data"]["form"]["forum_category_id"],
        board.category_id.to_string()
    );
    assert_eq!(body["data"]["context"]["categories"].as_array().unwrap().len(), 2);

    let other_id = other.to_string();
    let resp = app
        .post_form(
            &format!("/forums/{}/edit", board.forum_id),
            Some(&board.admin_token),
            &[
                ("forum_category_id", other_id.as_str()),
                ("name", "Old threads"),
                ("description", ""),
            ],
        )
        .await;
    common::assert_redirect(&resp, "/api/v1/categories");

    let forum = Forum::find_by_id(board.forum_id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(forum.forum_category_id, other);
    assert_eq!(forum.name, "Old threads");
    assert_eq!(forum.description, None);
}

#[tokio::test]
async fn edit_rejects_unknown_category() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let missing = Uuid::new_v4().to_string();
    for category in [missing.as_str(), "not-a-uuid", ""] {
        let resp = app
            .post_form(
                &format!("/forums/{}/edit", board.forum_id),
                Some(&board.admin_token),
                &[("forum_category_id", category), ("name", "Moved")],
            )
            .await;
        assert_eq!(resp.status(), 422);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body["data"]["errors"]["forum_category_id"][0],
            "Choose an existing category"
        );
    }

    let forum = Forum::find_by_id(board.forum_id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(forum.name, "Off-topic");
    assert_eq!(forum.forum_category_id, board.category_id);
}

#[tokio::test]
async fn forum_management_is_admin_only() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app.get("/forums", Some(&board.owner_token)).send().await.unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app
        .post_form(
            &format!("/forums/create?category_id={}", board.category_id),
            Some(&board.owner_token),
            &[("name", "Mine")],
        )
        .await;
    assert_eq!(resp.status(), 403);

    let resp = app
        .post_form(
            &format!("/forums/{}/delete", board.forum_id),
            Some(&board.owner_token),
            &[],
        )
        .await;
    assert_eq!(resp.status(), 403);
    assert_eq!(Forum::find().count(&app.db).await.unwrap(), 1);

    let resp = app.get("/forums", Some(&board.admin_token)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["category_name"], "General");
}

#[tokio::test]
async fn deleting_forum_removes_its_topics() {
    let app = common::spawn_app().await;
    let board = common::seed_board(&app).await;

    let resp = app
        .post_form(
            &format!("/forums/{}/delete", board.forum_id),
            Some(&board.admin_token),
            &[],
        )
        .await;
    common::assert_redirect(&resp, "/api/v1/categories");

    assert_eq!(Forum::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(ForumTopic::find().count(&app.db).await.unwrap(), 0);

    let resp = app
        .get(&format!("/forums/{}", board.forum_id), None)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
