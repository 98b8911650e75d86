//! Authentication extractor.
//!
//! Sign-in happens at the hosted identity provider. Requests carry its
//! session token either in the session cookie or as a bearer credential;
//! the token is resolved to an identity and mirrored into `users`.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use chairbook_core::Email;

use crate::db::UserRepository;
use crate::db::users::IdentityProfile;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Rejects with `401` when no token is present or the provider does not
/// recognise it.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_name = &state.config().identity.session_cookie;
        let token = session_token(&parts.headers, cookie_name)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let identity = state.identity().resolve(token).await?;
        let email = Email::parse(&identity.email).map_err(|e| {
            tracing::warn!(subject = %identity.subject, error = %e, "Identity provider sent an invalid email");
            AppError::Unauthorized("Not authenticated".to_string())
        })?;

        let user = UserRepository::new(state.pool())
            .upsert_from_identity(&IdentityProfile {
                external_id: identity.subject,
                email,
                first_name: identity.first_name,
                last_name: identity.last_name,
                role: identity.role,
            })
            .await?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", user.id.as_i32());

        Ok(Self(CurrentUser::from(&user)))
    }
}

/// Extract the session token: the named cookie first, then a bearer header.
pub(crate) fn session_token<'h>(headers: &'h HeaderMap, cookie_name: &str) -> Option<&'h str> {
    cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))
}

fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
