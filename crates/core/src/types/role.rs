//! User roles and appointment status enums.

use serde::{Deserialize, Serialize};

/// Role of a user. Gates every permission check.
///
/// `Employee` and `Barber` are both schedulable staff. A `Barber`
/// additionally owns shops and can manage everything inside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Customer,
    Employee,
    Barber,
    Admin,
}

impl Role {
    /// Whether users with this role can be assigned appointments.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Employee | Self::Barber)
    }

    /// Whether this role may edit scheduling fields and manage overrides.
    #[must_use]
    pub const fn can_manage_schedule(self) -> bool {
        !matches!(self, Self::Customer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Employee => write!(f, "employee"),
            Self::Barber => write!(f, "barber"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "employee" => Ok(Self::Employee),
            "barber" => Ok(Self::Barber),
            "admin" => Ok(Self::Admin),
            other => Err(format!("invalid role: {other}")),
        }
    }
}

/// Persisted status of a booked appointment.
///
/// Cancellation deletes the row, so there is no cancelled status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "appointment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Booked,
    Confirmed,
}

/// Lifecycle stage derived from an appointment row and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Row exists and the appointment has not ended yet.
    Booked,
    /// The appointment ended in the past and has no review.
    Completed,
    /// A review is linked to the appointment.
    Reviewed,
}

impl Lifecycle {
    /// Derive the lifecycle stage.
    #[must_use]
    pub const fn derive(has_ended: bool, has_review: bool) -> Self {
        if has_review {
            Self::Reviewed
        } else if has_ended {
            Self::Completed
        } else {
            Self::Booked
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_strings() {
        for role in [Role::Customer, Role::Employee, Role::Barber, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Role::Barber).unwrap(), "\"BARBER\"");
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::Employee.is_staff());
        assert!(Role::Barber.is_staff());
        assert!(!Role::Admin.is_staff());
        assert!(!Role::Customer.is_staff());
        assert!(!Role::Customer.can_manage_schedule());
        assert!(Role::Admin.can_manage_schedule());
    }

    #[test]
    fn test_lifecycle_derivation() {
        assert_eq!(Lifecycle::derive(false, false), Lifecycle::Booked);
        assert_eq!(Lifecycle::derive(true, false), Lifecycle::Completed);
        assert_eq!(Lifecycle::derive(true, true), Lifecycle::Reviewed);
    }
}
