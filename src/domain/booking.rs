use serde::{Deserialize, Serialize};

/// The visible phase of the booking flow. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookingStep {
    /// Entering pickup and dropoff.
    #[default]
    AwaitingRoute,
    /// A quote is on screen, waiting for confirm or cancel.
    ReviewingEstimate,
    /// Checkout submitted, waiting for the payment service to answer.
    Requesting,
    /// The user was handed off to payment; a driver is being matched.
    AwaitingDriver,
}

/// Latest value pushed on the `ride_status` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_mins: Option<u32>,
}

impl RideStatus {
    pub const IDLE: &'static str = "IDLE";

    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            driver: None,
            eta_mins: None,
        }
    }
}

impl Default for RideStatus {
    fn default() -> Self {
        Self::new(Self::IDLE)
    }
}

/// How the payment surface sent the user back (`?status=success|cancel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentReturn {
    Success,
    Cancel,
}

impl std::str::FromStr for PaymentReturn {
    type Err = crate::error::BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "cancel" => Ok(Self::Cancel),
            other => Err(crate::error::BookingError::Protocol(format!(
                "unknown payment return status: {other}"
            ))),
        }
    }
}
