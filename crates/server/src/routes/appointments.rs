//! Appointment handlers.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Deserialize;

use chairbook_core::booking::{AppointmentPatch, CreateAppointment};
use chairbook_core::wire::{calendar_date, lenient_user_id};
use chairbook_core::{AppointmentId, ShopId, UserId};

use crate::db::AppointmentRepository;
use crate::db::appointments::AppointmentFilter;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::AppointmentView;
use crate::services::BookingService;
use crate::services::booking::now;
use crate::state::AppState;

/// Page size when `take` is absent.
pub const DEFAULT_TAKE: i64 = 50;
/// Largest accepted page size.
pub const MAX_TAKE: i64 = 200;

/// Build the appointments router. Writes are registered separately so they
/// can sit behind the rate limiter.
pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list))
        .route("/appointments/{id}", get(show))
}

/// Appointment writes.
pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create))
        .route("/appointments/{id}", patch(update).delete(remove))
}

/// Query string of `GET /appointments`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub shop_id: Option<ShopId>,
    #[serde(default, with = "calendar_date::option")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_user_id::deserialize")]
    pub employee_id: Option<UserId>,
    pub past: Option<bool>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
}

impl ListParams {
    fn filter(&self) -> AppointmentFilter {
        AppointmentFilter {
            shop_id: self.shop_id,
            date: self.date,
            employee_id: self.employee_id,
            past: self.past,
            limit: self.take.unwrap_or(DEFAULT_TAKE).clamp(1, MAX_TAKE),
            offset: self.skip.unwrap_or(0).max(0),
        }
    }
}

/// List appointments visible to the caller.
///
/// Never fails once authenticated: malformed filters and lookup failures
/// answer an empty list.
pub async fn list(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Json<Vec<AppointmentView>> {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Malformed appointment filter");
            return Json(Vec::new());
        }
    };

    let now = now();
    match AppointmentRepository::new(state.pool())
        .list(user.actor(), &params.filter(), now)
        .await
    {
        Ok(appointments) => Json(appointments.iter().map(|a| a.view(now)).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "Appointment list failed, answering empty");
            Json(Vec::new())
        }
    }
}

/// Book an appointment.
///
/// # Errors
///
/// Returns 400 for an invalid body, 404 for an unknown shop and 409 when
/// the day is closed or the interval is taken.
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateAppointment>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentView>)> {
    let Json(request) = body?;
    let appointment = BookingService::new(state.pool())
        .create(&user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(appointment.view(now()))))
}

/// Read one appointment.
///
/// # Errors
///
/// Returns 404 if it does not exist and 403 if the caller may not see it.
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<AppointmentId>, PathRejection>,
) -> Result<Json<AppointmentView>> {
    let Path(id) = id?;
    let appointment = BookingService::new(state.pool()).get(&user, id).await?;
    Ok(Json(appointment.view(now())))
}

/// Apply a partial update. Fields the caller's role may not write are dropped.
///
/// # Errors
///
/// As [`show`], plus 400 and 409 for invalid or conflicting schedule changes.
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<AppointmentId>, PathRejection>,
    body: std::result::Result<Json<AppointmentPatch>, JsonRejection>,
) -> Result<Json<AppointmentView>> {
    let Path(id) = id?;
    let Json(patch) = body?;
    let appointment = BookingService::new(state.pool())
        .update(&user, id, patch)
        .await?;
    Ok(Json(appointment.view(now())))
}

/// Cancel an appointment.
///
/// # Errors
///
/// As [`show`].
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    id: std::result::Result<Path<AppointmentId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = id?;
    BookingService::new(state.pool()).delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn parse(query: &str) -> std::result::Result<ListParams, QueryRejection> {
        let uri: Uri = format!("/appointments?{query}").parse().unwrap();
        Query::<ListParams>::try_from_uri(&uri).map(|Query(p)| p)
    }

    #[test]
    fn test_defaults() {
        let filter = parse("").unwrap().filter();
        assert_eq!(filter.limit, DEFAULT_TAKE);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.past, None);
    }

    #[test]
    fn test_take_is_clamped() {
        assert_eq!(parse("take=1000").unwrap().filter().limit, MAX_TAKE);
        assert_eq!(parse("take=0").unwrap().filter().limit, 1);
        assert_eq!(parse("skip=-5").unwrap().filter().offset, 0);
    }

    #[test]
    fn test_full_filter() {
        let filter = parse("shopId=3&date=2024-06-10&employeeId=7&past=false")
            .unwrap()
            .filter();
        assert_eq!(filter.shop_id, Some(ShopId::new(3)));
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert_eq!(filter.employee_id, Some(UserId::new(7)));
        assert_eq!(filter.past, Some(false));
    }

    #[test]
    fn test_placeholder_employee_is_ignored() {
        let filter = parse("employeeId=undefined").unwrap().filter();
        assert_eq!(filter.employee_id, None);
    }

    #[test]
    fn test_malformed_filters_reject() {
        assert!(parse("date=tomorrow").is_err());
        assert!(parse("shopId=abc").is_err());
        assert!(parse("past=maybe").is_err());
    }
}
