//! Who may see and change what.

use serde::{Deserialize, Serialize};

use crate::types::{Role, UserId};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

/// The parties attached to one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentScope {
    pub customer_id: UserId,
    pub employee_id: UserId,
    /// Owner of the shop the appointment belongs to, if it has one.
    pub shop_owner_id: Option<UserId>,
}

impl Actor {
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the actor may read (and therefore modify or delete) an appointment.
    ///
    /// Customers see their own bookings, employees the ones assigned to
    /// them, barbers additionally everything in shops they own, and admins
    /// everything.
    #[must_use]
    pub fn can_view(&self, scope: &AppointmentScope) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => scope.customer_id == self.user_id,
            Role::Employee => scope.employee_id == self.user_id,
            Role::Barber => {
                scope.employee_id == self.user_id || scope.shop_owner_id == Some(self.user_id)
            }
        }
    }

    /// Whether the actor may manage a shop's schedule and overrides.
    ///
    /// `is_staff` says whether the actor is linked to the shop as staff.
    #[must_use]
    pub fn can_manage_shop(&self, owner_id: Option<UserId>, is_staff: bool) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Barber => owner_id == Some(self.user_id) || is_staff,
            Role::Employee => is_staff,
            Role::Customer => false,
        }
    }

    /// Whether the actor may book on behalf of another customer.
    #[must_use]
    pub const fn can_book_for_others(&self) -> bool {
        self.role.can_manage_schedule()
    }
}
