//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. Security headers (CSP allowing the Cloudinary widget)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. CSRF check on unsafe methods
//!
//! Per route: `RequireUser` extractor and the credential
//! form rate limiter.

pub mod auth;
pub mod context;
pub mod csrf;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireUser, clear_current_user, set_current_user};
pub use context::PageContext;
pub use csrf::csrf_middleware;
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
