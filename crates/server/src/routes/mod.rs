//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Database readiness
//! GET    /me                                  - Current user
//!
//! # Appointments (auth required)
//! GET    /appointments                        - List (never fails, empty on bad filters)
//! POST   /appointments                        - Book (201, 409 on clash)
//! GET    /appointments/{id}                   - Read
//! PATCH  /appointments/{id}                   - Update (role-filtered)
//! DELETE /appointments/{id}                   - Cancel (204)
//!
//! # Availability
//! GET    /availability/check                  - Slot check (all-open on lookup failure)
//! GET    /shops/{id}/availability/day         - Staff list for a date
//! GET    /shops/{id}/availability/month       - Month view
//! GET    /shops/{id}/availability/team        - Team calendar (managers)
//!
//! # Shops
//! GET    /shops                               - Shop list
//! GET    /shops/{id}                          - Shop with slot grid
//! GET    /shops/{id}/services                 - Services
//!
//! # Overrides (managers)
//! GET    /shops/{id}/overrides                - List in range
//! PUT    /shops/{id}/overrides                - Upsert
//! DELETE /shops/{id}/overrides/{overrideId}   - Delete
//! ```

pub mod appointments;
pub mod availability;
pub mod me;
pub mod overrides;
pub mod shops;

use axum::Router;

use crate::middleware::write_rate_limiter;
use crate::state::AppState;

/// Create all API routes.
///
/// Appointment writes sit behind the per-IP rate limiter.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(me::router())
        .merge(shops::router())
        .merge(availability::router())
        .merge(overrides::router())
        .merge(appointments::read_router())
        .merge(appointments::write_router().layer(write_rate_limiter()))
}
