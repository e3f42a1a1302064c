use super::subscription::StatusSubscription;
use crate::config::ReconnectPolicy;
use crate::domain::booking::{BookingStep, PaymentReturn, RideStatus};
use crate::domain::checkout::CheckoutRequest;
use crate::domain::estimate::Estimate;
use crate::domain::identity::Identity;
use crate::domain::ports::{
    CheckoutServiceBox, EstimateServiceBox, GeocoderBox, IdentityProviderBox, NavigatorBox,
    NotifierBox, StatusChannelBox,
};
use crate::domain::route::RouteRequest;
use crate::error::{BookingError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const SIGN_IN_PROMPT: &str = "Please Login to Search";
pub const INCOMPLETE_ROUTE: &str = "Please enter both a pickup and a dropoff location";
pub const ESTIMATE_FAILED: &str = "Backend connection failed";
pub const LOCATION_FAILED: &str = "We could not locate your pickup or dropoff, please check the addresses";
pub const CHECKOUT_FAILED: &str = "Payment could not be started, please retry";
pub const PAYMENT_CANCELLED: &str = "Payment was cancelled, your quote is still available";

/// The collaborators the controller drives.
pub struct BookingServices {
    pub estimates: EstimateServiceBox,
    pub checkout: CheckoutServiceBox,
    pub geocoder: GeocoderBox,
    pub identity: IdentityProviderBox,
    pub notifier: NotifierBox,
    pub navigator: NavigatorBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Estimate,
    Checkout,
}

#[derive(Debug, Default)]
struct FlowState {
    step: BookingStep,
    route: RouteRequest,
    estimate: Option<Estimate>,
    in_flight: Option<InFlight>,
}

/// The booking-flow state machine.
///
/// `BookingController` owns the current [`BookingStep`], the route being
/// quoted and the held [`Estimate`]. Only one estimate or checkout request can
/// be outstanding at a time; a second trigger while one is pending is rejected
/// with [`BookingError::RequestInFlight`] and never reaches the services.
///
/// Ride-status updates arrive on an injected [`StatusChannel`](crate::domain::ports::StatusChannel)
/// that is subscribed for the whole lifetime of the controller, independent of
/// the booking step.
pub struct BookingController {
    services: BookingServices,
    state: Mutex<FlowState>,
    status: watch::Receiver<RideStatus>,
    subscription: Option<StatusSubscription>,
}

impl BookingController {
    /// Creates a controller and subscribes to `channel` immediately.
    ///
    /// # Arguments
    ///
    /// * `services` - The estimate, checkout, geocoding and user-facing collaborators.
    /// * `channel` - The realtime status source. Owned by the controller from now on.
    /// * `policy` - Backoff applied when the status channel drops.
    pub fn new(
        services: BookingServices,
        channel: StatusChannelBox,
        policy: ReconnectPolicy,
    ) -> Self {
        let (sink, status) = watch::channel(RideStatus::default());
        let subscription = StatusSubscription::spawn(channel, policy, sink);
        Self {
            services,
            state: Mutex::new(FlowState::default()),
            status,
            subscription: Some(subscription),
        }
    }

    pub fn step(&self) -> BookingStep {
        self.state().step
    }

    pub fn estimate(&self) -> Option<Estimate> {
        self.state().estimate.clone()
    }

    pub fn route(&self) -> RouteRequest {
        self.state().route.clone()
    }

    /// `true` while an estimate or checkout request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.state().in_flight.is_some()
    }

    /// Most recent ride status, `IDLE` until the first event arrives.
    pub fn ride_status(&self) -> RideStatus {
        self.status.borrow().clone()
    }

    /// A receiver that wakes on every ride-status change.
    pub fn status_updates(&self) -> watch::Receiver<RideStatus> {
        self.status.clone()
    }

    /// Replaces the route being entered. Only allowed on the route-entry step,
    /// and not while the current route is being quoted.
    pub fn set_route(&self, route: RouteRequest) -> Result<()> {
        let mut state = self.state();
        ensure_idle(&state)?;
        expect_step(&state, BookingStep::AwaitingRoute)?;
        state.route = route;
        Ok(())
    }

    /// Quotes the current route and moves to [`BookingStep::ReviewingEstimate`].
    ///
    /// A degraded quote from the estimate service counts as success. A
    /// transport failure is notified to the user and leaves the step unchanged.
    pub async fn request_estimate(&self) -> Result<Estimate> {
        self.require_identity()?;

        let (route, guard) = {
            let mut state = self.state();
            ensure_idle(&state)?;
            expect_step(&state, BookingStep::AwaitingRoute)?;
            if !state.route.is_complete() {
                self.services.notifier.notify(INCOMPLETE_ROUTE);
                return Err(BookingError::InvalidRoute);
            }
            state.in_flight = Some(InFlight::Estimate);
            (state.route.clone(), InFlightGuard::new(&self.state, state.step))
        };

        debug!(origin = %route.origin, destination = %route.destination, "requesting estimate");
        match self.services.estimates.estimate(&route).await {
            Ok(estimate) => {
                guard.complete(|state| {
                    state.estimate = Some(estimate.clone());
                    state.step = BookingStep::ReviewingEstimate;
                });
                info!(price = %estimate.price, "estimate ready");
                Ok(estimate)
            }
            Err(e) => {
                drop(guard);
                warn!(error = %e, "estimate request failed");
                self.services.notifier.notify(ESTIMATE_FAILED);
                Err(e)
            }
        }
    }

    /// Submits the held estimate for payment and redirects to the checkout page.
    ///
    /// The step is [`BookingStep::Requesting`] while the checkout call is
    /// pending. On success the user is redirected and the step becomes
    /// [`BookingStep::AwaitingDriver`]; on any failure it returns to
    /// [`BookingStep::ReviewingEstimate`] so the user can retry.
    pub async fn confirm(&self) -> Result<String> {
        let identity = self.require_identity()?;

        let (route, estimate, guard) = {
            let mut state = self.state();
            ensure_idle(&state)?;
            expect_step(&state, BookingStep::ReviewingEstimate)?;
            let estimate = state.estimate.clone().ok_or(BookingError::InvalidStep {
                expected: BookingStep::ReviewingEstimate,
                actual: state.step,
            })?;
            let restore = state.step;
            state.in_flight = Some(InFlight::Checkout);
            state.step = BookingStep::Requesting;
            (
                state.route.clone(),
                estimate,
                InFlightGuard::new(&self.state, restore),
            )
        };

        let resolved = match self.services.geocoder.resolve(&route).await {
            Ok(resolved) => resolved,
            Err(e) => {
                drop(guard);
                warn!(error = %e, "could not geocode route");
                self.services.notifier.notify(LOCATION_FAILED);
                return Err(e);
            }
        };

        let request = CheckoutRequest::new(&estimate, &identity, resolved);
        match self.services.checkout.create_checkout(&request).await {
            Ok(target) => {
                guard.complete(|state| state.step = BookingStep::AwaitingDriver);
                info!(target = %target, "redirecting to checkout");
                self.services.navigator.redirect(&target);
                Ok(target)
            }
            Err(e) => {
                drop(guard);
                warn!(error = %e, "checkout could not be started");
                self.services.notifier.notify(CHECKOUT_FAILED);
                Err(e)
            }
        }
    }

    /// Discards the held estimate and goes back to route entry.
    pub fn cancel(&self) -> Result<()> {
        let mut state = self.state();
        ensure_idle(&state)?;
        expect_step(&state, BookingStep::ReviewingEstimate)?;
        state.estimate = None;
        state.step = BookingStep::AwaitingRoute;
        debug!("estimate discarded");
        Ok(())
    }

    /// Handles the user coming back from the payment page.
    pub fn payment_returned(&self, outcome: PaymentReturn) -> Result<()> {
        let mut state = self.state();
        expect_step(&state, BookingStep::AwaitingDriver)?;
        match outcome {
            PaymentReturn::Success => info!("payment completed, awaiting driver"),
            PaymentReturn::Cancel => {
                state.step = BookingStep::ReviewingEstimate;
                drop(state);
                self.services.notifier.notify(PAYMENT_CANCELLED);
            }
        }
        Ok(())
    }

    /// Releases the realtime subscription and waits for the channel to close.
    pub async fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close().await;
        }
    }

    fn require_identity(&self) -> Result<Identity> {
        let identity = self.services.identity.current();
        if identity.signed_in {
            Ok(identity)
        } else {
            self.services.notifier.notify(SIGN_IN_PROMPT);
            self.services.identity.prompt_sign_in();
            Err(BookingError::Unauthenticated)
        }
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<FlowState>) -> MutexGuard<'_, FlowState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn expect_step(state: &FlowState, expected: BookingStep) -> Result<()> {
    if state.step == expected {
        Ok(())
    } else {
        Err(BookingError::InvalidStep {
            expected,
            actual: state.step,
        })
    }
}

fn ensure_idle(state: &FlowState) -> Result<()> {
    match state.in_flight {
        Some(pending) => {
            debug!(?pending, "ignoring trigger while a request is in flight");
            Err(BookingError::RequestInFlight)
        }
        None => Ok(()),
    }
}

/// Clears the in-flight flag when a request settles.
///
/// Dropping the guard without calling `complete` (failure, or the future being
/// cancelled) restores the step the request started from.
struct InFlightGuard<'a> {
    state: &'a Mutex<FlowState>,
    restore: BookingStep,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(state: &'a Mutex<FlowState>, restore: BookingStep) -> Self {
        Self {
            state,
            restore,
            armed: true,
        }
    }

    fn complete(mut self, apply: impl FnOnce(&mut FlowState)) {
        let mut state = lock(self.state);
        state.in_flight = None;
        apply(&mut state);
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = lock(self.state);
            state.in_flight = None;
            state.step = self.restore;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{CheckoutService, EstimateService};
    use crate::infrastructure::geocoding::PlaceholderGeocoder;
    use crate::infrastructure::in_memory::{
        InMemoryStatusChannel, RecordingNavigator, RecordingNotifier, StaticIdentity,
    };
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct FixedEstimate(Result<Estimate>);

    #[async_trait]
    impl EstimateService for FixedEstimate {
        async fn estimate(&self, _route: &RouteRequest) -> Result<Estimate> {
            match &self.0 {
                Ok(estimate) => Ok(estimate.clone()),
                Err(e) => Err(BookingError::EstimateUnavailable(e.to_string())),
            }
        }
    }

    /// Counts calls and blocks each one until released.
    #[derive(Clone, Default)]
    struct GatedCheckout {
        calls: Arc<AtomicUsize>,
        release: Arc<Notify>,
        fail: bool,
    }

    #[async_trait]
    impl CheckoutService for GatedCheckout {
        async fn create_checkout(&self, _request: &CheckoutRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            if self.fail {
                Err(BookingError::MissingRedirect)
            } else {
                Ok("https://pay.example/abc".to_string())
            }
        }
    }

    struct Harness {
        controller: BookingController,
        notifier: RecordingNotifier,
        navigator: RecordingNavigator,
        identity: StaticIdentity,
        checkout: GatedCheckout,
    }

    fn harness(identity: StaticIdentity, estimates: FixedEstimate, checkout: GatedCheckout) -> Harness {
        let notifier = RecordingNotifier::new();
        let navigator = RecordingNavigator::new();
        let (channel, _feeder) = InMemoryStatusChannel::new();
        let services = BookingServices {
            estimates: Box::new(estimates),
            checkout: Box::new(checkout.clone()),
            geocoder: Box::new(PlaceholderGeocoder),
            identity: Box::new(identity.clone()),
            notifier: Box::new(notifier.clone()),
            navigator: Box::new(navigator.clone()),
        };
        let controller = BookingController::new(services, Box::new(channel), ReconnectPolicy::default());
        controller
            .set_route(RouteRequest::new("Union Square, NY", "Central Park, NY"))
            .unwrap();
        Harness {
            controller,
            notifier,
            navigator,
            identity,
            checkout,
        }
    }

    fn quoted() -> FixedEstimate {
        FixedEstimate(Ok(Estimate {
            price: dec!(11.75),
            duration_minutes: 15,
            distance_km: 5.5,
        }))
    }

    fn signed_in() -> StaticIdentity {
        StaticIdentity::new(Identity::signed_in("Ada", "ada@example.com"))
    }

    #[tokio::test]
    async fn test_signed_out_estimate_prompts_sign_in() {
        let h = harness(StaticIdentity::new(Identity::anonymous()), quoted(), GatedCheckout::default());

        let result = h.controller.request_estimate().await;

        assert!(matches!(result, Err(BookingError::Unauthenticated)));
        assert_eq!(h.controller.step(), BookingStep::AwaitingRoute);
        assert_eq!(h.notifier.messages(), vec![SIGN_IN_PROMPT.to_string()]);
        assert_eq!(h.identity.sign_in_prompts(), 1);
    }

    #[tokio::test]
    async fn test_estimate_advances_to_review() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());

        let estimate = h.controller.request_estimate().await.unwrap();

        assert_eq!(estimate.price, dec!(11.75));
        assert_eq!(h.controller.step(), BookingStep::ReviewingEstimate);
        assert_eq!(h.controller.estimate(), Some(estimate));
        assert!(!h.controller.is_busy());
    }

    #[tokio::test]
    async fn test_estimate_transport_failure_halts_flow() {
        let failing = FixedEstimate(Err(BookingError::EstimateUnavailable("dns".to_string())));
        let h = harness(signed_in(), failing, GatedCheckout::default());

        assert!(h.controller.request_estimate().await.is_err());
        assert_eq!(h.controller.step(), BookingStep::AwaitingRoute);
        assert_eq!(h.controller.estimate(), None);
        assert_eq!(h.notifier.messages(), vec![ESTIMATE_FAILED.to_string()]);
        assert!(!h.controller.is_busy());
    }

    #[tokio::test]
    async fn test_incomplete_route_is_rejected() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        h.controller.set_route(RouteRequest::new("Union Square, NY", "")).unwrap();

        let result = h.controller.request_estimate().await;

        assert!(matches!(result, Err(BookingError::InvalidRoute)));
        assert_eq!(h.controller.step(), BookingStep::AwaitingRoute);
        assert_eq!(h.notifier.messages(), vec![INCOMPLETE_ROUTE.to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_discards_estimate() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        h.controller.request_estimate().await.unwrap();

        h.controller.cancel().unwrap();

        assert_eq!(h.controller.step(), BookingStep::AwaitingRoute);
        assert_eq!(h.controller.estimate(), None);
        assert!(h.controller.cancel().is_err());
    }

    #[tokio::test]
    async fn test_confirm_redirects_once() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        h.controller.request_estimate().await.unwrap();
        h.checkout.release.notify_one();

        let target = h.controller.confirm().await.unwrap();

        assert_eq!(target.as_str(), "https://pay.example/abc");
        assert_eq!(h.navigator.targets(), vec![target]);
        assert_eq!(h.controller.step(), BookingStep::AwaitingDriver);
        assert_eq!(h.checkout.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_confirm_is_ignored_while_in_flight() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        h.controller.request_estimate().await.unwrap();

        let first = h.controller.confirm();
        let second = async {
            // Let the first confirm reach the checkout service.
            while h.checkout.calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            assert_eq!(h.controller.step(), BookingStep::Requesting);
            let second = h.controller.confirm().await;
            h.checkout.release.notify_one();
            second
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(BookingError::RequestInFlight)));
        assert_eq!(h.checkout.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.navigator.targets().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_failure_is_retryable() {
        let checkout = GatedCheckout {
            fail: true,
            ..GatedCheckout::default()
        };
        let h = harness(signed_in(), quoted(), checkout);
        h.controller.request_estimate().await.unwrap();
        h.checkout.release.notify_one();

        let result = h.controller.confirm().await;

        assert!(matches!(result, Err(BookingError::MissingRedirect)));
        assert_eq!(h.controller.step(), BookingStep::ReviewingEstimate);
        assert!(h.controller.estimate().is_some());
        assert!(h.navigator.targets().is_empty());
        assert_eq!(h.notifier.messages(), vec![CHECKOUT_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_dropped_confirm_restores_review_step() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        h.controller.request_estimate().await.unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(20), h.controller.confirm()).await;

        assert!(pending.is_err());
        assert_eq!(h.controller.step(), BookingStep::ReviewingEstimate);
        assert!(!h.controller.is_busy());
    }

    #[tokio::test]
    async fn test_payment_cancel_returns_to_review() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        h.controller.request_estimate().await.unwrap();
        h.checkout.release.notify_one();
        h.controller.confirm().await.unwrap();

        h.controller.payment_returned(PaymentReturn::Cancel).unwrap();

        assert_eq!(h.controller.step(), BookingStep::ReviewingEstimate);
        assert!(h.controller.estimate().is_some());
        assert_eq!(h.notifier.messages(), vec![PAYMENT_CANCELLED.to_string()]);
    }

    #[tokio::test]
    async fn test_payment_return_outside_awaiting_driver() {
        let h = harness(signed_in(), quoted(), GatedCheckout::default());
        assert!(matches!(
            h.controller.payment_returned(PaymentReturn::Success),
            Err(BookingError::InvalidStep { .. })
        ));
    }
}
