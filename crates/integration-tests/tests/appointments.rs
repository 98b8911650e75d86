//! Integration tests for the appointment list and updates.
//!
//! These tests require:
//! - A `PostgreSQL` database reachable through `TEST_DATABASE_URL`
//!
//! Run with: `cargo test -p chairbook-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use chairbook_core::Role;
use chairbook_integration_tests::{SESSION_COOKIE, TestContext};

const MONDAY: &str = "2031-06-09";

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_list_requires_authentication() {
    let ctx = TestContext::new().await;

    let resp = ctx.client.get(ctx.url("/appointments")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .client
        .get(ctx.url("/appointments"))
        .bearer_auth("tok_unknown")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_session_cookie_authenticates() {
    let ctx = TestContext::new().await;
    let customer = ctx.user(Role::Customer).await;

    let resp = ctx
        .client
        .get(ctx.url("/me"))
        .header("Cookie", format!("{SESSION_COOKIE}={}", customer.token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["id"], json!(customer.id));
    assert_eq!(me["email"], customer.email);
}

// ============================================================================
// List Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_malformed_filter_answers_empty_list() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;
    let resp = ctx.book(&customer, &shop, MONDAY, "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ctx
        .client
        .get(ctx.url("/appointments?date=tomorrow"))
        .bearer_auth(&customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_customers_only_see_their_own_appointments() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let alice = ctx.user(Role::Customer).await;
    let bob = ctx.user(Role::Customer).await;

    assert_eq!(
        ctx.book(&alice, &shop, MONDAY, "10:15", "11:00").await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        ctx.book(&bob, &shop, MONDAY, "11:00", "11:45").await.status(),
        StatusCode::CREATED
    );

    let list = |token: String| {
        let request = ctx
            .client
            .get(ctx.url(&format!("/appointments?shopId={}", shop.id)))
            .bearer_auth(token);
        async move {
            let resp = request.send().await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            resp.json::<Vec<Value>>().await.unwrap()
        }
    };

    let mine = list(alice.token.clone()).await;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["customerId"], json!(alice.id));

    // The barber sees every appointment assigned to them
    let staff = list(shop.barber.token.clone()).await;
    assert_eq!(staff.len(), 2);
}

// ============================================================================
// Update Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_customer_cannot_reassign_employee() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let other_shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;

    let resp = ctx.book(&customer, &shop, MONDAY, "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let booked: Value = resp.json().await.unwrap();
    let id = booked["id"].as_i64().unwrap();

    let resp = ctx
        .client
        .patch(ctx.url(&format!("/appointments/{id}")))
        .bearer_auth(&customer.token)
        .json(&json!({
            "employeeId": other_shop.barber.id,
            "time": "12:00",
            "endTime": "12:45",
            "notes": "  Skin fade, please  ",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["employeeId"], json!(shop.barber.id));
    assert_eq!(updated["time"], "10:15");
    assert_eq!(updated["notes"], "Skin fade, please");
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_reschedule_onto_taken_slot_conflicts() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;

    let first: Value = ctx
        .book(&customer, &shop, MONDAY, "10:15", "11:00")
        .await
        .json()
        .await
        .unwrap();
    let second: Value = ctx
        .book(&customer, &shop, MONDAY, "11:00", "11:45")
        .await
        .json()
        .await
        .unwrap();

    let move_to = |id: i64, time: &str, end: &str| {
        ctx.client
            .patch(ctx.url(&format!("/appointments/{id}")))
            .bearer_auth(&shop.barber.token)
            .json(&json!({ "time": time, "endTime": end }))
            .send()
    };

    // Onto the first appointment: conflict
    let resp = move_to(second["id"].as_i64().unwrap(), "10:30", "11:15")
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Shifting within its own interval does not conflict with itself
    let resp = move_to(first["id"].as_i64().unwrap(), "10:00", "10:45")
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_cancel_frees_the_slot() {
    let ctx = TestContext::new().await;
    let shop = ctx.shop().await;
    let customer = ctx.user(Role::Customer).await;
    let other = ctx.user(Role::Customer).await;

    let booked: Value = ctx
        .book(&customer, &shop, MONDAY, "10:15", "11:00")
        .await
        .json()
        .await
        .unwrap();
    let id = booked["id"].as_i64().unwrap();

    // Another customer may not cancel it
    let resp = ctx
        .client
        .delete(ctx.url(&format!("/appointments/{id}")))
        .bearer_auth(&other.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = ctx
        .client
        .delete(ctx.url(&format!("/appointments/{id}")))
        .bearer_auth(&customer.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ctx.book(&other, &shop, MONDAY, "10:15", "11:00").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}
