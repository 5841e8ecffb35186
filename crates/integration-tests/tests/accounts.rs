//! Registration, login and logout against a running storefront.
//!
//! Requires a migrated database and the storefront server.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use shopkeep_integration_tests::{PASSWORD, TestClient, location, pool, unique_email};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_then_login() {
    let (client, email) = TestClient::signed_in("shopper").await;

    let profile = client.page("/users/profile").await;
    assert!(profile.contains(&email));
    assert!(profile.contains("Welcome back, shopper"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_duplicate_email_is_rejected() {
    let pool = pool().await;
    let client = TestClient::new();
    let email = unique_email("twice");

    let resp = client.register("first", &email).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client.register("second", &email.to_uppercase()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("This email is already registered"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wrong_password_does_not_log_in() {
    let client = TestClient::new();
    let email = unique_email("forgetful");
    client.register("forgetful", &email).await;

    let resp = client.login(&email, "not the password at all").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/users/login"));

    let login_page = client.page("/users/login").await;
    assert!(login_page.contains("Sorry, your login details are incorrect"));

    let resp = client.get("/users/profile").await;
    assert_eq!(location(&resp).as_deref(), Some("/users/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_logout_ends_session() {
    let (client, _) = TestClient::signed_in("leaver").await;

    let resp = client.get("/users/logout").await;
    assert_eq!(location(&resp).as_deref(), Some("/users/login"));

    let resp = client.get("/cart").await;
    assert_eq!(location(&resp).as_deref(), Some("/users/login"));

    let resp = TestClient::new().login("nobody@example.com", PASSWORD).await;
    assert_eq!(location(&resp).as_deref(), Some("/users/login"));
}
