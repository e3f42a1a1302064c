//! Application layer containing the booking-flow orchestration.
//!
//! This module defines the `BookingController`, which owns the visible booking
//! step and drives the estimate, checkout and realtime collaborators. Ride-status
//! updates are pumped by a background `tokio` task into a `watch` cell so they
//! stay out-of-band with respect to the step machine.

pub mod controller;
pub mod subscription;
