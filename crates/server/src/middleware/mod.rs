//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on write routes (governor)
//!
//! Authentication is an extractor, not a layer: handlers that need a user
//! take [`RequireAuth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::RequireAuth;
pub use rate_limit::write_rate_limiter;
pub use request_id::request_id_middleware;
