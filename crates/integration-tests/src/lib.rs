//! Integration tests for the Shopkeep storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p shopkeep-cli -- migrate
//! PAYMENT_WEBHOOK_SECRET=whsec_integration cargo run -p shopkeep-storefront &
//! PAYMENT_WEBHOOK_SECRET=whsec_integration cargo test -p shopkeep-integration-tests -- --ignored
//! ```
//!
//! Tests talk to the server over HTTP and read the database directly to
//! check what was stored. Every client sends its own `X-Forwarded-For`
//! address so the credential rate limiter treats tests independently.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, Response, StatusCode, header::LOCATION, redirect};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

/// Password used for every account the tests register.
pub const PASSWORD: &str = "correct horse battery staple";

/// Base URL of the running storefront.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the storefront database.
pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL must be set for integration tests");
    shopkeep_storefront::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database")
}

/// Secret the server was started with.
#[must_use]
pub fn webhook_secret() -> SecretString {
    SecretString::from(
        std::env::var("PAYMENT_WEBHOOK_SECRET")
            .expect("PAYMENT_WEBHOOK_SECRET must match the running server"),
    )
}

/// A unique email address for one test run.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// A browser-like session: cookies kept, redirects not followed.
pub struct TestClient {
    pub client: Client,
    pub base_url: String,
}

impl TestClient {
    #[must_use]
    pub fn new() -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let id = Uuid::new_v4();
        let [a, b, c, ..] = *id.as_bytes();
        headers.insert(
            "x-forwarded-for",
            format!("10.{a}.{b}.{c}").parse().expect("valid header value"),
        );

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a page and return its body.
    pub async fn page(&self, path: &str) -> String {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.text().await.expect("Failed to read body")
    }

    /// The CSRF token embedded in the page at `path`.
    pub async fn csrf_token(&self, path: &str) -> String {
        extract_csrf_token(&self.page(path).await).expect("page has no CSRF token")
    }

    /// POST a form with a fresh CSRF token taken from `form_page`.
    pub async fn submit(&self, form_page: &str, action: &str, fields: &[(&str, &str)]) -> Response {
        let token = self.csrf_token(form_page).await;
        let mut form: Vec<(&str, &str)> = fields.to_vec();
        form.push(("_csrf", &token));

        self.client
            .post(self.url(action))
            .form(&form)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn register(&self, username: &str, email: &str) -> Response {
        self.submit(
            "/users/register",
            "/users/register",
            &[
                ("username", username),
                ("email", email),
                ("password", PASSWORD),
                ("confirm_password", PASSWORD),
            ],
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.submit(
            "/users/login",
            "/users/login",
            &[("email", email), ("password", password)],
        )
        .await
    }

    /// Register and log in a fresh user, returning their email.
    pub async fn signed_in(prefix: &str) -> (Self, String) {
        let client = Self::new();
        let email = unique_email(prefix);

        let resp = client.register(prefix, &email).await;
        assert_eq!(location(&resp).as_deref(), Some("/users/login"));

        let resp = client.login(&email, PASSWORD).await;
        assert_eq!(location(&resp).as_deref(), Some("/users/profile"));

        (client, email)
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(resp: &Response) -> Option<String> {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Pull the value of the first `_csrf` hidden input out of a page.
#[must_use]
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let field = html.find(r#"name="_csrf""#)?;
    let rest = html.get(field..)?;
    let value = rest.find(r#"value=""#)? + r#"value=""#.len();
    let rest = rest.get(value..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(str::to_owned)
}

/// Insert a category and a product priced at `cost`, returning the
/// product id.
pub async fn create_product(pool: &PgPool, name: &str, cost: i64) -> i32 {
    let category_id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO categories (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind("Integration")
    .fetch_one(pool)
    .await
    .expect("Failed to create category");

    sqlx::query_scalar(
        r"
        INSERT INTO products (name, cost, description, category_id)
        VALUES ($1, $2, 'Created by an integration test', $3)
        RETURNING id
        ",
    )
    .bind(name)
    .bind(cost)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .expect("Failed to create product")
}

/// Insert a tag, or find the existing one with this name.
pub async fn create_tag(pool: &PgPool, name: &str) -> i32 {
    sqlx::query_scalar(
        r"
        INSERT INTO tags (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("Failed to create tag")
}

/// Attach tags to a product directly in the join table.
pub async fn tag_product(pool: &PgPool, product_id: i32, tag_ids: &[i32]) {
    sqlx::query(
        r"
        INSERT INTO products_tags (product_id, tag_id)
        SELECT $1, UNNEST($2::int[])
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(product_id)
    .bind(tag_ids)
    .execute(pool)
    .await
    .expect("Failed to tag product");
}

/// Tag ids linked to a product, ascending.
pub async fn product_tags(pool: &PgPool, product_id: i32) -> Vec<i32> {
    sqlx::query_scalar("SELECT tag_id FROM products_tags WHERE product_id = $1 ORDER BY tag_id")
        .bind(product_id)
        .fetch_all(pool)
        .await
        .expect("Failed to read product tags")
}

/// Category id of a product.
pub async fn category_of(pool: &PgPool, product_id: i32) -> i32 {
    sqlx::query_scalar("SELECT category_id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("product should exist")
}

/// Id of the user registered with `email`.
pub async fn user_id(pool: &PgPool, email: &str) -> i32 {
    sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("user should exist")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_token() {
        let html = r#"<form><input type="hidden" name="_csrf" value="abc123"></form>"#;
        assert_eq!(extract_csrf_token(html).as_deref(), Some("abc123"));
        assert_eq!(extract_csrf_token("<form></form>"), None);
    }
}
