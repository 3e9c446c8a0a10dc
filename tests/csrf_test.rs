mod common;

use serde_json::Value;

#[tokio::test]
async fn csrf_endpoint_sets_readable_cookie() {
    let app = common::spawn_app().await;

    let resp = app.get("/csrf", None).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let cookie = resp
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("csrf_token="))
        .map(|c| c.to_string())
        .expect("csrf cookie");
    assert!(!cookie.contains("HttpOnly"));

    let body: Value = resp.json().await.unwrap();
    let token = body["data"]["csrf_token"].as_str().unwrap();
    assert!(cookie.starts_with(&format!("csrf_token={};", token)));
}

#[tokio::test]
async fn post_without_token_is_forbidden() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;

    let resp = app
        .client
        .post(app.url("/categories/create"))
        .bearer_auth(&admin_token)
        .form(&[("name", "General")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = app.get("/categories", None).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn header_must_match_cookie() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;

    let other: Value = app
        .get("/csrf", None)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let other_token = other["data"]["csrf_token"].as_str().unwrap();
    assert_ne!(other_token, app.csrf_token);

    let resp = app
        .client
        .post(app.url("/categories/create"))
        .bearer_auth(&admin_token)
        .header("Cookie", format!("csrf_token={}", app.csrf_token))
        .header("X-CSRF-Token", other_token)
        .form(&[("name", "General")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn forged_token_is_rejected_even_when_echoed() {
    let app = common::spawn_app().await;
    let (_admin_id, admin_token) = common::create_admin(&app).await;

    let forged = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    let resp = app
        .client
        .post(app.url("/categories/create"))
        .bearer_auth(&admin_token)
        .header("Cookie", format!("csrf_token={}", forged))
        .header("X-CSRF-Token", forged)
        .form(&[("name", "General")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn reads_do_not_need_a_token() {
    let app = common::spawn_app().await;
    let (_user_id, token) = common::create_test_user(&app, "reader").await;

    let resp = app
        .client
        .get(app.url("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
