//! Availability handlers: the slot check used while booking and the shop
//! calendars.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;

use chairbook_core::schedule::{DateRange, DayAvailability, DaySummary, SlotGrid};
use chairbook_core::wire::calendar_date;
use chairbook_core::{ShopId, UserId};

use crate::db::ShopRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::routes::shops::load_shop;
use crate::services::calendar::{StaffDay, TeamRow};
use crate::services::{AvailabilityService, CalendarError, CalendarService};
use crate::state::AppState;

/// Build the availability router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/availability/check", get(check))
        .route("/shops/{id}/availability/day", get(day))
        .route("/shops/{id}/availability/month", get(month))
        .route("/shops/{id}/availability/team", get(team))
}

/// Query string of `GET /availability/check`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckParams {
    pub shop_id: ShopId,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    /// Any value that is not a positive number means "no preference".
    #[serde(default)]
    pub employee_id: Option<String>,
}

impl CheckParams {
    fn employee(&self) -> Option<UserId> {
        self.employee_id.as_deref().and_then(UserId::parse_optional)
    }
}

/// Query string of a single-day calendar request.
#[derive(Debug, Deserialize)]
pub struct DayParams {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
}

/// Query string of a date-range request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date")]
    pub end_date: NaiveDate,
}

impl RangeParams {
    pub(crate) fn range(&self) -> std::result::Result<DateRange, CalendarError> {
        Ok(DateRange::new(self.start_date, self.end_date)?)
    }
}

/// Evaluate every slot of one day.
///
/// Lookup failures answer every slot open, on the default grid if the shop
/// itself could not be read. Only a missing or malformed `shopId` or `date`
/// and an unknown shop are errors.
///
/// # Errors
///
/// Returns 400 for bad parameters and 404 for an unknown shop.
pub async fn check(
    State(state): State<AppState>,
    params: std::result::Result<Query<CheckParams>, QueryRejection>,
) -> Result<Json<DayAvailability>> {
    let Query(params) = params?;
    let shop = match ShopRepository::new(state.pool()).get(params.shop_id).await {
        Ok(Some(shop)) => shop,
        Ok(None) => {
            return Err(AppError::NotFound(format!("shop {} not found", params.shop_id)));
        }
        Err(e) => {
            tracing::warn!(error = %e, shop_id = %params.shop_id, "Shop lookup failed, answering all-open");
            return Ok(Json(DayAvailability::all_open(
                params.date,
                &SlotGrid::default(),
            )));
        }
    };
    let day = AvailabilityService::new(state.pool())
        .evaluate_fail_open(&shop, params.employee(), params.date)
        .await;
    Ok(Json(day))
}

/// Staff list for one day, with each member's availability.
///
/// # Errors
///
/// Returns 400 for bad parameters, 404 for an unknown shop, 500 if a lookup fails.
pub async fn day(
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
    params: std::result::Result<Query<DayParams>, QueryRejection>,
) -> Result<Json<Vec<StaffDay>>> {
    let Path(id) = id?;
    let Query(params) = params?;
    let shop = load_shop(state.pool(), id).await?;
    let staff = calendar(&state).day_staff(&shop, params.date).await?;
    Ok(Json(staff))
}

/// Month view: one summary per day.
///
/// # Errors
///
/// Returns 400 for a bad or inverted range, 404 for an unknown shop.
pub async fn month(
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
    params: std::result::Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<DaySummary>>> {
    let Path(id) = id?;
    let Query(params) = params?;
    let range = params.range()?;
    let shop = load_shop(state.pool(), id).await?;
    let days = calendar(&state).month(&shop, &range).await?;
    Ok(Json(days))
}

/// Team calendar for the shop's managers.
///
/// # Errors
///
/// As [`month`], plus 401 and 403.
pub async fn team(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<ShopId>, PathRejection>,
    params: std::result::Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<TeamRow>>> {
    let Path(id) = id?;
    let Query(params) = params?;
    let range = params.range()?;
    let shop = load_shop(state.pool(), id).await?;
    let rows = calendar(&state).team(&user, &shop, &range).await?;
    Ok(Json(rows))
}

pub(crate) fn calendar(state: &AppState) -> CalendarService<'_> {
    CalendarService::new(state.pool(), state.config().default_daily_capacity)
}
