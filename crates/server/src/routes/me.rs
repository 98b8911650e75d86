//! Current user handler.

use axum::{Json, Router, routing::get};

use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Build the `/me` router.
pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// The authenticated user as resolved from the identity provider.
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}
