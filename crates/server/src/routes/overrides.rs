//! Availability override handlers.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{delete, get},
};

use chairbook_core::{AvailableTimeId, ShopId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{OverrideRecord, UpsertOverride};
use crate::routes::availability::{RangeParams, calendar};
use crate::routes::shops::load_shop;
use crate::state::AppState;

/// Build the overrides router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shops/{id}/overrides", get(index).put(upsert))
        .route("/shops/{id}/overrides/{override_id}", delete(remove))
}

/// Overrides of a shop in a date range.
///
/// # Errors
///
/// Returns 400 for a bad range, 403 unless the caller manages the shop.
pub async fn index(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
    params: std::result::Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<OverrideRecord>>> {
    let Path(id) = id?;
    let Query(params) = params?;
    let range = params.range()?;
    let shop = load_shop(state.pool(), id).await?;
    let records = calendar(&state).overrides(&user, &shop, &range).await?;
    Ok(Json(records))
}

/// Create or replace the override for a date and staff set.
///
/// # Errors
///
/// Returns 400 for an invalid body, 403 unless the caller manages the shop.
pub async fn upsert(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
    body: std::result::Result<Json<UpsertOverride>, JsonRejection>,
) -> Result<Json<OverrideRecord>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let shop = load_shop(state.pool(), id).await?;
    let record = calendar(&state)
        .upsert_override(&user, &shop, &input)
        .await?;
    Ok(Json(record))
}

/// Delete an override.
///
/// # Errors
///
/// Returns 403 unless the caller manages the shop, 404 if no such override exists.
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    ids: std::result::Result<Path<(ShopId, AvailableTimeId)>, PathRejection>,
) -> Result<StatusCode> {
    let Path((shop_id, override_id)) = ids?;
    let shop = load_shop(state.pool(), shop_id).await?;
    calendar(&state)
        .delete_override(&user, &shop, override_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
