//! HTTP request handlers, organized by resource.

pub mod bookings;
pub mod changes;
pub mod health;
pub mod venues;
