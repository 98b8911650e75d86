//! Shop handlers.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    routing::get,
};
use sqlx::PgPool;

use chairbook_core::ShopId;

use crate::db::ShopRepository;
use crate::error::{AppError, Result};
use crate::models::{Service, Shop, ShopView};
use crate::state::AppState;

/// Build the shops router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shops", get(index))
        .route("/shops/{id}", get(show))
        .route("/shops/{id}/services", get(services))
}

/// Load a shop or answer 404.
pub(crate) async fn load_shop(pool: &PgPool, id: ShopId) -> Result<Shop> {
    ShopRepository::new(pool)
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {id} not found")))
}

/// List all shops.
///
/// # Errors
///
/// Returns 500 if the lookup fails.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ShopView>>> {
    let shops = ShopRepository::new(state.pool()).list().await?;
    Ok(Json(shops.iter().map(ShopView::from).collect()))
}

/// Show a shop with its derived slot grid.
///
/// # Errors
///
/// Returns 404 if the shop does not exist.
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
) -> Result<Json<ShopView>> {
    let Path(id) = id?;
    let shop = load_shop(state.pool(), id).await?;
    Ok(Json(ShopView::from(&shop)))
}

/// Services offered by a shop.
///
/// # Errors
///
/// Returns 404 if the shop does not exist.
pub async fn services(
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
) -> Result<Json<Vec<Service>>> {
    let Path(id) = id?;
    let shop = load_shop(state.pool(), id).await?;
    let services = ShopRepository::new(state.pool()).services(shop.id).await?;
    Ok(Json(services))
}
