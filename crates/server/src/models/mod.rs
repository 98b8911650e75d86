//! Domain models for the booking server.
//!
//! These are validated domain objects, separate from database row types.
//! Response shapes (camelCase JSON) live next to the model they render.

pub mod appointment;
pub mod overrides;
pub mod shop;
pub mod user;

pub use appointment::{Appointment, AppointmentView};
pub use overrides::{OverrideRecord, UpsertOverride};
pub use shop::{Service, Shop, ShopView};
pub use user::{CurrentUser, User};
