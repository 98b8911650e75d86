//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use chairbook_core::access::Actor;
use chairbook_core::{Email, Role, UserId};

/// A user mirrored from the hosted identity provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Subject id assigned by the identity provider.
    #[serde(skip)]
    pub external_id: String,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.email.to_string(),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.display_name(),
            role: user.role,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            external_id: "sub_1".to_string(),
            email: Email::parse("sam@example.com").unwrap(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            phone: None,
            role: Role::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(user(Some("Sam"), Some("Cole")).display_name(), "Sam Cole");
        assert_eq!(user(Some("Sam"), None).display_name(), "Sam");
        assert_eq!(user(None, None).display_name(), "sam@example.com");
    }

    #[test]
    fn test_external_id_not_serialized() {
        let json = serde_json::to_value(user(None, None)).unwrap();
        assert!(json.get("externalId").is_none());
        assert_eq!(json["role"], "CUSTOMER");
    }
}
