//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Redirect to /landing
//! GET  /landing                           - Landing page
//!
//! # Products
//! GET  /products                          - Listing, filtered by the search form
//! GET  /products/brands                   - Brands with product counts
//! GET|POST /products/create               - Create form
//! GET|POST /products/{id}/update          - Update form
//! GET|POST /products/{id}/delete          - Delete confirmation
//!
//! # Taxonomies (same routes under /categories, /tags and /brands)
//! GET  /categories                        - List + create form
//! POST /categories/create                 - Create
//! GET|POST /categories/{id}/update        - Rename
//! POST /categories/{id}/delete            - Delete
//!
//! # Users
//! GET|POST /users/register                - Registration (rate limited)
//! GET|POST /users/login                   - Login (rate limited)
//! GET  /users/profile                     - Profile (requires login)
//! GET  /users/logout                      - Logout
//!
//! # Cart (requires login)
//! GET  /cart                              - Cart page
//! POST /cart/{product_id}/add             - Add or increase a line
//! POST /cart/{product_id}/quantity/update - Set a line's quantity
//! POST /cart/{product_id}/remove          - Remove a line
//!
//! # Checkout
//! GET  /checkout                          - Order summary (requires login)
//! GET  /checkout/success                  - Payment completed
//! GET  /checkout/cancelled                - Payment cancelled
//! POST /checkout/process_payment          - Payment webhook (no CSRF)
//!
//! # Media
//! GET  /cloudinary/sign                   - Sign upload parameters
//! ```

pub mod cart;
pub mod checkout;
pub mod cloudinary;
pub mod landing;
pub mod products;
pub mod taxonomy;
pub mod users;

use axum::{
    Router,
    handler::Handler,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::models::Taxonomy;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/brands", get(products::brands))
        .route("/create", get(products::create_page).post(products::create))
        .route(
            "/{id}/update",
            get(products::update_page).post(products::update),
        )
        .route(
            "/{id}/delete",
            get(products::delete_page).post(products::delete),
        )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(users::register_page).post(users::register.layer(auth_rate_limiter())),
        )
        .route(
            "/login",
            get(users::login_page).post(users::login.layer(auth_rate_limiter())),
        )
        .route("/profile", get(users::profile))
        .route("/logout", get(users::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::index))
        .route("/{product_id}/add", post(cart::add))
        .route(
            "/{product_id}/quantity/update",
            post(cart::update_quantity),
        )
        .route("/{product_id}/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::summary))
        .route("/success", get(checkout::success))
        .route("/cancelled", get(checkout::cancelled))
        .route("/process_payment", post(checkout::process_payment))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let router = Router::new()
        .route("/", get(landing::root))
        .route("/landing", get(landing::landing))
        .nest("/products", product_routes())
        .nest("/users", user_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/cloudinary/sign", get(cloudinary::sign));

    Taxonomy::ALL.into_iter().fold(router, |router, kind| {
        router.nest(kind.path(), taxonomy::routes(kind))
    })
}

/// Repository messages are lowercase; messages shown to users start with a
/// capital.
pub(crate) fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
