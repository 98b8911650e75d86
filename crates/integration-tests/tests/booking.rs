//! Integration tests for booking and conflict resolution.
//!
//! These tests require:
//! - A `PostgreSQL` database reachable through `TEST_DATABASE_URL`
//!
//! Run with: `cargo test -p chairbook-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinSet;

use chairbook_core::Role;
use chairbook_integration_tests::TestContext;

/// 2031-06-09 is a Monday; the default hours open 09:30-21:30.
const MONDAY: &str = "2031-06-09";

// ============================================================================
// Booking Flow Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_overlapping_booking_is_rejected() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let first = ctx.user(Role::Customer).await;
    let second = ctx.user(Role::Customer).await;

    let resp = ctx.book(&first, &shop, MONDAY, "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let booked: Value = resp.json().await.unwrap();
    assert_eq!(booked["time"], "10:15");
    assert_eq!(booked["endTime"], "11:00");
    assert_eq!(booked["employeeId"], json!(shop.barber.id));
    assert_eq!(booked["customerId"], json!(first.id));

    // Same interval, different customer
    let resp = ctx.book(&second, &shop, MONDAY, "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(
        message.contains("10:15-11:00 is already booked"),
        "unexpected error: {message}"
    );

    // Partial overlap is a conflict too
    let resp = ctx.book(&second, &shop, MONDAY, "10:30", "11:15").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Back-to-back is fine: intervals are half-open
    let resp = ctx.book(&second, &shop, MONDAY, "11:00", "11:45").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_booked_intervals_show_in_check() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;

    let resp = ctx.book(&customer, &shop, MONDAY, "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let day = ctx.check(&shop, MONDAY).await;
    assert_eq!(day["isAvailable"], true);
    assert_eq!(
        day["bookedTimeSlots"],
        json!([{ "start": "10:15", "end": "11:00" }])
    );

    let slots = day["availableTimes"].as_array().unwrap();
    let taken: Vec<&str> = slots
        .iter()
        .filter(|s| s["available"] == false)
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(taken, vec!["10:15"]);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_booking_on_closed_day_is_rejected() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;

    // Sunday is closed by default
    let resp = ctx.book(&customer, &shop, "2031-06-08", "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("closed"));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_invalid_interval_is_rejected() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;

    let resp = ctx.book(&customer, &shop, MONDAY, "11:00", "10:15").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx.book(&customer, &shop, MONDAY, "25:00", "26:00").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_concurrent_bookings_admit_exactly_one() {
    const ATTEMPTS: usize = 8;

    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;

    let mut tasks = JoinSet::new();
    for _ in 0..ATTEMPTS {
        let customer = ctx.user(Role::Customer).await;
        let request = ctx
            .client
            .post(ctx.url("/appointments"))
            .bearer_auth(&customer.token)
            .json(&json!({
                "shopId": shop.id,
                "date": MONDAY,
                "time": "14:00",
                "endTime": "14:45",
                "employeeId": shop.barber.id,
            }));
        tasks.spawn(async move { request.send().await.unwrap().status() });
    }

    let mut created = 0;
    let mut conflicts = 0;
    while let Some(status) = tasks.join_next().await {
        match status.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, ATTEMPTS - 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE shop_id = $1")
        .bind(shop.id.as_i32())
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
