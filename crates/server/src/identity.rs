//! Client for the hosted identity provider.
//!
//! The provider owns sign-in. This server only asks it who a session token
//! belongs to: `GET {base}/v1/sessions/current` with the token as a bearer
//! credential. Successful lookups are cached with `moka` so a burst of
//! requests from one browser costs a single round trip.

use std::sync::Arc;

use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use chairbook_core::Role;

use crate::config::IdentityConfig;

/// Errors talking to the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The token is missing, expired or unknown to the provider.
    #[error("session is not valid")]
    Unauthenticated,

    /// HTTP request failed (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an unexpected status.
    #[error("identity provider returned HTTP {0}")]
    UnexpectedStatus(u16),

    /// The provider's endpoint URL could not be built.
    #[error("invalid identity provider URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The session payload returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    /// Stable subject id of the user at the provider.
    pub subject: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Role claim, if the provider manages roles.
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
}

/// Accepts any casing of a role name; unknown names become `None`.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.parse().ok()))
}

/// Client for the identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    endpoint: Url,
    cache: Cache<String, SessionIdentity>,
}

impl IdentityClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                endpoint: config.base_url.join("v1/sessions/current")?,
                cache,
            }),
        })
    }

    /// Resolve a session token to the identity behind it.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthenticated` if the provider rejects the
    /// token, and a transport or status error if the provider is unreachable.
    #[instrument(skip(self, token))]
    pub async fn resolve(&self, token: &str) -> Result<SessionIdentity, IdentityError> {
        if let Some(identity) = self.inner.cache.get(token).await {
            debug!("Session cache hit");
            return Ok(identity);
        }

        let response = self
            .inner
            .client
            .get(self.inner.endpoint.clone())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::NOT_FOUND
        {
            return Err(IdentityError::Unauthenticated);
        }
        if !status.is_success() {
            tracing::error!(status = %status, "Identity provider returned non-success status");
            return Err(IdentityError::UnexpectedStatus(status.as_u16()));
        }

        let identity: SessionIdentity = response.json().await?;
        self.inner
            .cache
            .insert(token.to_string(), identity.clone())
            .await;

        Ok(identity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_payload_parses() {
        let identity: SessionIdentity = serde_json::from_value(serde_json::json!({
            "subject": "user_2abc",
            "email": "sam@example.com",
            "firstName": "Sam",
            "role": "barber"
        }))
        .unwrap();
        assert_eq!(identity.subject, "user_2abc");
        assert_eq!(identity.first_name.as_deref(), Some("Sam"));
        assert_eq!(identity.last_name, None);
        assert_eq!(identity.role, Some(Role::Barber));
    }

    #[test]
    fn test_unknown_role_is_ignored() {
        let identity: SessionIdentity = serde_json::from_value(serde_json::json!({
            "subject": "user_2abc",
            "email": "sam@example.com",
            "role": "owner"
        }))
        .unwrap();
        assert_eq!(identity.role, None);
    }

    #[test]
    fn test_endpoint_joins_base_path() {
        let config = IdentityConfig {
            base_url: Url::parse("https://auth.example.com/").unwrap(),
            session_cookie: "__session".to_string(),
            cache_ttl: std::time::Duration::from_secs(60),
            request_timeout: std::time::Duration::from_secs(5),
        };
        let client = IdentityClient::new(&config).unwrap();
        assert_eq!(
            client.inner.endpoint.as_str(),
            "https://auth.example.com/v1/sessions/current"
        );
    }
}
