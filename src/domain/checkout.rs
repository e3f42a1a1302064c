use super::estimate::Estimate;
use super::identity::Identity;
use super::route::ResolvedRoute;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/rides/create-checkout`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub user_email: Option<String>,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
}

impl CheckoutRequest {
    pub fn new(estimate: &Estimate, identity: &Identity, route: ResolvedRoute) -> Self {
        Self {
            price: estimate.price,
            user_email: identity.email.clone(),
            pickup_lat: route.pickup.lat,
            pickup_lng: route.pickup.lng,
            dropoff_lat: route.dropoff.lat,
            dropoff_lng: route.dropoff.lng,
        }
    }
}

/// Response of the checkout service. The redirect target is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub checkout_url: Option<String>,
}
