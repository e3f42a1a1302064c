use crate::domain::booking::BookingStep;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("sign-in required before booking")]
    Unauthenticated,
    #[error("both pickup and dropoff must be provided")]
    InvalidRoute,
    #[error("action not allowed in step {actual:?} (expected {expected:?})")]
    InvalidStep {
        expected: BookingStep,
        actual: BookingStep,
    },
    #[error("another request is already in flight")]
    RequestInFlight,
    #[error("estimate service unavailable: {0}")]
    EstimateUnavailable(String),
    #[error("checkout failed: {0}")]
    CheckoutFailed(String),
    #[error("checkout service returned no redirect target")]
    MissingRedirect,
    #[error("geocoding failed: {0}")]
    Geocoding(String),
    #[error("status channel error: {0}")]
    Channel(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type Result<T> = std::result::Result<T, BookingError>;
