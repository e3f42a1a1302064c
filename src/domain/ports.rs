use super::booking::RideStatus;
use super::checkout::CheckoutRequest;
use super::estimate::Estimate;
use super::identity::Identity;
use super::route::{ResolvedRoute, RouteRequest};
use crate::error::Result;
use async_trait::async_trait;

/// Fare lookup for a route.
///
/// Implementations degrade instead of failing when the service answers with
/// an error status: they return [`Estimate::fallback`]. Only a transport
/// failure or an unreadable body surfaces as an error.
#[async_trait]
pub trait EstimateService: Send + Sync {
    async fn estimate(&self, route: &RouteRequest) -> Result<Estimate>;
}

/// Payment session creation. Success means a redirect target was issued.
///
/// The target is returned exactly as the service sent it.
#[async_trait]
pub trait CheckoutService: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String>;
}

/// Turns the free-text route into coordinates for the checkout payload.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, route: &RouteRequest) -> Result<ResolvedRoute>;
}

/// A push source of ride-status notifications.
///
/// `next_status` yields `Ok(None)` when the server ended the session on
/// purpose; any `Err` is a transport loss and the caller may `connect` again.
#[async_trait]
pub trait StatusChannel: Send {
    async fn connect(&mut self) -> Result<()>;
    async fn next_status(&mut self) -> Result<Option<RideStatus>>;
    async fn close(&mut self);
}

pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Identity;
    /// Opens the provider's sign-in surface.
    fn prompt_sign_in(&self);
}

/// Blocking, user-visible notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Sends the user away from the application.
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: &str);
}

pub type EstimateServiceBox = Box<dyn EstimateService>;
pub type CheckoutServiceBox = Box<dyn CheckoutService>;
pub type GeocoderBox = Box<dyn Geocoder>;
pub type StatusChannelBox = Box<dyn StatusChannel>;
pub type IdentityProviderBox = Box<dyn IdentityProvider>;
pub type NotifierBox = Box<dyn Notifier>;
pub type NavigatorBox = Box<dyn Navigator>;
