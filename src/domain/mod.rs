//! Domain layer: booking types and the ports the controller talks through.

pub mod booking;
pub mod checkout;
pub mod estimate;
pub mod identity;
pub mod ports;
pub mod route;
