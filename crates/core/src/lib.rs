//! Chairbook Core - Shared types and scheduling logic.
//!
//! This crate provides the types and pure logic used across all Chairbook components:
//! - `server` - Booking API (availability, appointments, overrides)
//! - `cli` - Command-line tools for migrations, seeding and data cleanup
//!
//! # Architecture
//!
//! The core crate contains no I/O: no database access and no HTTP clients.
//! Everything that decides whether a slot can be booked lives here so it can
//! be tested without a database. Enable the `postgres` feature for `sqlx`
//! encodings of the id and enum types.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, roles, statuses, emails and prices
//! - [`wire`] - `HH:MM` times, calendar dates and lenient id parsing
//! - [`schedule`] - Slot grid, interval overlap, availability, monthly aggregation
//! - [`access`] - Appointment visibility and shop management rules
//! - [`booking`] - Create and patch request bodies
//! - [`draft`] - Client-held booking draft
//! - [`legacy`] - `EmployeeId:` markers in old appointment notes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod booking;
pub mod draft;
pub mod legacy;
pub mod schedule;
pub mod types;
pub mod wire;

pub use types::*;
