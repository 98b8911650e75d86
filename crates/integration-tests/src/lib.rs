//! Integration tests for Chairbook.
//!
//! Each test builds a [`TestContext`]: the real router from
//! `chairbook-server` served on a random local port, backed by a migrated
//! `PostgreSQL` database and a stub identity provider that answers for the
//! tokens the test registers.
//!
//! # Running Tests
//!
//! ```bash
//! # Point the tests at a disposable database
//! export TEST_DATABASE_URL=postgres://localhost/chairbook_test
//!
//! # Run the ignored integration tests
//! cargo test -p chairbook-integration-tests -- --ignored
//! ```
//!
//! Every fixture uses fresh shops and uuid-tagged users, so tests may share
//! one database and run in parallel.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use chairbook_core::schedule::ShopSchedule;
use chairbook_core::{Email, Role, ShopId, UserId};
use chairbook_server::config::{IdentityConfig, ServerConfig};
use chairbook_server::db::shops::NewShop;
use chairbook_server::db::{ShopRepository, UserRepository};
use chairbook_server::state::AppState;

/// Cookie the test server reads the session token from.
pub const SESSION_COOKIE: &str = "__session";

/// Session token to identity payload, shared with the stub provider.
type Sessions = Arc<RwLock<HashMap<String, Value>>>;

/// A running server plus the handles a test needs to drive it.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub pool: PgPool,
    sessions: Sessions,
}

/// A user created for one test, with the token that signs them in.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub email: String,
    pub token: String,
}

/// A shop with one barber on its staff.
#[derive(Debug, Clone)]
pub struct TestShop {
    pub id: ShopId,
    pub owner: TestUser,
    pub barber: TestUser,
}

impl TestContext {
    /// Connect, migrate and start the servers.
    ///
    /// # Panics
    ///
    /// Panics if no database URL is configured or anything fails to start.
    pub async fn new() -> Self {
        let database_url = database_url();
        let pool = chairbook_server::db::create_pool(&database_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("../server/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let sessions: Sessions = Arc::default();
        let identity_url = spawn_identity_stub(sessions.clone()).await;

        let config = ServerConfig {
            database_url,
            host: "127.0.0.1".parse().expect("Invalid host"),
            port: 0,
            identity: IdentityConfig {
                base_url: identity_url,
                session_cookie: SESSION_COOKIE.to_string(),
                cache_ttl: Duration::from_secs(60),
                request_timeout: Duration::from_secs(5),
            },
            default_daily_capacity: 32,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let state = AppState::new(config, pool.clone()).expect("Failed to build app state");
        let base_url = spawn_app(state).await;

        Self {
            client: reqwest::Client::new(),
            base_url,
            pool,
            sessions,
        }
    }

    /// Absolute URL for a path on the test server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Create a user and register a session token for them.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn user(&self, role: Role) -> TestUser {
        let tag = Uuid::new_v4();
        let email = format!("integration-{tag}@example.com");
        let subject = format!("test:{tag}");
        let user = UserRepository::new(&self.pool)
            .create(
                &subject,
                &Email::parse(&email).expect("Invalid test email"),
                Some("Test"),
                Some("User"),
                role,
            )
            .await
            .expect("Failed to create test user");

        let token = format!("tok_{tag}");
        self.sessions.write().await.insert(
            token.clone(),
            json!({
                "subject": subject,
                "email": email,
                "firstName": "Test",
            }),
        );

        TestUser {
            id: user.id,
            email,
            token,
        }
    }

    /// Create a shop with default hours, an admin owner and one barber.
    ///
    /// # Panics
    ///
    /// Panics if any insert fails.
    pub async fn shop(&self) -> TestShop {
        let owner = self.user(Role::Admin).await;
        let barber = self.user(Role::Barber).await;
        let shops = ShopRepository::new(&self.pool);
        let shop = shops
            .create(&NewShop {
                name: format!("Integration Cuts {}", Uuid::new_v4()),
                owner_id: Some(owner.id),
                address: None,
                schedule: ShopSchedule::default(),
            })
            .await
            .expect("Failed to create test shop");
        shops
            .add_staff(shop.id, barber.id)
            .await
            .expect("Failed to link barber");

        TestShop {
            id: shop.id,
            owner,
            barber,
        }
    }

    /// Book through the API as `user`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn book(
        &self,
        user: &TestUser,
        shop: &TestShop,
        date: &str,
        time: &str,
        end_time: &str,
    ) -> reqwest::Response {
        self.client
            .post(self.url("/appointments"))
            .bearer_auth(&user.token)
            .json(&json!({
                "shopId": shop.id,
                "date": date,
                "time": time,
                "endTime": end_time,
                "employeeId": shop.barber.id,
            }))
            .send()
            .await
            .expect("Failed to send booking")
    }

    /// Run the slot check for the shop's barber.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the answer is not 200 JSON.
    pub async fn check(&self, shop: &TestShop, date: &str) -> Value {
        let resp = self
            .client
            .get(self.url(&format!(
                "/availability/check?shopId={}&date={date}&employeeId={}",
                shop.id, shop.barber.id
            )))
            .send()
            .await
            .expect("Failed to check availability");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        resp.json().await.expect("Failed to parse availability")
    }
}

fn database_url() -> SecretString {
    ["TEST_DATABASE_URL", "CHAIRBOOK_DATABASE_URL", "DATABASE_URL"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .map(SecretString::from)
        .expect("Set TEST_DATABASE_URL to run integration tests")
}

/// Serve the app on a random port and return its base URL.
async fn spawn_app(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind app listener");
    let addr = listener.local_addr().expect("Failed to read app address");
    let app = chairbook_server::app(state);

    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });

    format!("http://{addr}")
}

/// Serve a stand-in for the hosted identity provider.
async fn spawn_identity_stub(sessions: Sessions) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind identity listener");
    let addr = listener
        .local_addr()
        .expect("Failed to read identity address");
    let app = Router::new()
        .route("/v1/sessions/current", get(current_session))
        .with_state(sessions);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Url::parse(&format!("http://{addr}/")).expect("Invalid identity URL")
}

async fn current_session(
    State(sessions): State<Sessions>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    sessions
        .read()
        .await
        .get(token)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::UNAUTHORIZED)
}
