//! User management commands.
//!
//! Users normally appear on first sign-in through the identity provider.
//! These commands create staff ahead of time and manage roles, which the
//! provider only seeds once.
//!
//! # Usage
//!
//! ```bash
//! chairbook user create -e sam@example.com --first-name Sam -r barber
//! chairbook user set-role -e sam@example.com -r admin
//! ```

use chairbook_core::{Email, Role, UserId};
use chairbook_server::db::{RepositoryError, UserRepository};

use super::CommandError;

fn parse_role(raw: &str) -> Result<Role, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidRole(raw.to_owned()))
}

fn parse_email(raw: &str) -> Result<Email, CommandError> {
    Email::parse(raw).map_err(|_| CommandError::InvalidEmail(raw.to_owned()))
}

/// Subject id for users created before they ever sign in.
fn placeholder_subject(email: &Email) -> String {
    format!("local:{email}")
}

/// Create a user.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    role: &str,
    external_id: Option<&str>,
) -> Result<UserId, CommandError> {
    let role = parse_role(role)?;
    let email = parse_email(email)?;
    let external_id = external_id.map_or_else(|| placeholder_subject(&email), String::from);

    let pool = super::connect().await?;
    tracing::info!("Creating user: {} ({})", email, role);

    let user = UserRepository::new(&pool)
        .create(&external_id, &email, first_name, last_name, role)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CommandError::UserExists(email.to_string()),
            other => CommandError::Repository(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}

/// Change a user's role.
pub async fn set_role(email: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_role(role)?;
    let email = parse_email(email)?;

    let pool = super::connect().await?;
    let user = UserRepository::new(&pool)
        .set_role(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::UserNotFound(email.to_string()),
            other => CommandError::Repository(other),
        })?;

    tracing::info!("Role of {} is now {}", user.email, user.role);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_is_case_insensitive() {
        assert_eq!(parse_role("Barber").unwrap(), Role::Barber);
        assert!(matches!(
            parse_role("owner"),
            Err(CommandError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_placeholder_subject() {
        let email = parse_email("sam@example.com").unwrap();
        assert_eq!(placeholder_subject(&email), "local:sam@example.com");
    }

    #[test]
    fn test_invalid_email() {
        assert!(matches!(
            parse_email("not-an-email"),
            Err(CommandError::InvalidEmail(_))
        ));
    }
}
