//! Business logic services.
//!
//! # Services
//!
//! - `availability` - Slot evaluation for one shop, employee and day
//! - `booking` - Appointment create, read, update and cancel
//! - `calendar` - Month view, day staff list, team calendar and overrides

pub mod availability;
pub mod booking;
pub mod calendar;

pub use availability::AvailabilityService;
pub use booking::{BookingError, BookingService};
pub use calendar::{CalendarError, CalendarService};
