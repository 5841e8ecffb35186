//! Cart behaviour against a running storefront.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use shopkeep_integration_tests::{TestClient, create_product, location, pool, user_id};

async fn cart_rows(pool: &sqlx::PgPool, user_id: i32, product_id: i32) -> Vec<i32> {
    sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cart_requires_login() {
    let resp = TestClient::new().get("/cart").await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/users/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_adding_twice_accumulates_one_line() {
    let pool = pool().await;
    let (client, email) = TestClient::signed_in("buyer").await;
    let user = user_id(&pool, &email).await;
    let product = create_product(&pool, "Matcha tin", 1800).await;
    let add = format!("/cart/{product}/add");

    let resp = client.submit("/categories", &add, &[("quantity", "2")]).await;
    assert_eq!(location(&resp).as_deref(), Some("/cart"));
    let resp = client.submit("/categories", &add, &[("quantity", "3")]).await;
    assert_eq!(location(&resp).as_deref(), Some("/cart"));

    assert_eq!(cart_rows(&pool, user, product).await, vec![5]);

    let cart = client.page("/cart").await;
    assert!(cart.contains("Matcha tin"));
    assert!(cart.contains("Item added to cart"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_update_missing_line_creates_nothing() {
    let pool = pool().await;
    let (client, email) = TestClient::signed_in("updater").await;
    let user = user_id(&pool, &email).await;
    let product = create_product(&pool, "Bamboo whisk", 2400).await;

    let resp = client
        .submit("/categories", &format!("/cart/{product}/quantity/update"), &[("quantity", "4")])
        .await;
    assert_eq!(location(&resp).as_deref(), Some("/cart"));

    assert!(cart_rows(&pool, user, product).await.is_empty());
    let cart = client.page("/cart").await;
    assert!(cart.contains("That product is not in your cart"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_update_and_remove_line() {
    let pool = pool().await;
    let (client, email) = TestClient::signed_in("remover").await;
    let user = user_id(&pool, &email).await;
    let product = create_product(&pool, "Tea towel", 900).await;

    client.submit("/categories", &format!("/cart/{product}/add"), &[]).await;
    assert_eq!(cart_rows(&pool, user, product).await, vec![1]);

    client
        .submit("/categories", &format!("/cart/{product}/quantity/update"), &[("quantity", "7")])
        .await;
    assert_eq!(cart_rows(&pool, user, product).await, vec![7]);

    client.submit("/categories", &format!("/cart/{product}/remove"), &[]).await;
    assert!(cart_rows(&pool, user, product).await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_past_quantity_limit_keeps_line() {
    let pool = pool().await;
    let (client, email) = TestClient::signed_in("hoarder").await;
    let user = user_id(&pool, &email).await;
    let product = create_product(&pool, "Tea bowl", 3200).await;
    let add = format!("/cart/{product}/add");

    let resp = client.submit("/categories", &add, &[("quantity", "2147483647")]).await;
    assert_eq!(location(&resp).as_deref(), Some("/cart"));
    assert_eq!(cart_rows(&pool, user, product).await, vec![i32::MAX]);

    let resp = client.submit("/categories", &add, &[("quantity", "1")]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/cart"));
    assert_eq!(cart_rows(&pool, user, product).await, vec![i32::MAX]);

    let cart = client.page("/cart").await;
    assert!(cart.contains("A cart can hold at most 2147483647 of one product"));
}
