#![allow(dead_code)]

use ridequest::application::controller::{BookingController, BookingServices};
use ridequest::config::{Config, ReconnectPolicy};
use ridequest::domain::identity::Identity;
use ridequest::domain::route::RouteRequest;
use ridequest::infrastructure::geocoding::PlaceholderGeocoder;
use ridequest::infrastructure::http::ApiClient;
use ridequest::infrastructure::in_memory::{
    InMemoryStatusChannel, RecordingNavigator, RecordingNotifier, StaticIdentity, StatusFeeder,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ORIGIN: &str = "Union Square, NY";
pub const DESTINATION: &str = "Central Park, NY";

pub struct Flow {
    pub controller: BookingController,
    pub notifier: RecordingNotifier,
    pub navigator: RecordingNavigator,
    pub identity: StaticIdentity,
    pub feeder: StatusFeeder,
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_url: server.uri(),
        ..Config::default()
    }
}

/// A controller wired to the mock API, with an in-process status channel.
pub fn flow(server: &MockServer, identity: Identity) -> Flow {
    let api = ApiClient::new(&config_for(server)).unwrap();
    let notifier = RecordingNotifier::new();
    let navigator = RecordingNavigator::new();
    let identity = StaticIdentity::new(identity);
    let (channel, feeder) = InMemoryStatusChannel::new();

    let services = BookingServices {
        estimates: Box::new(api.clone()),
        checkout: Box::new(api),
        geocoder: Box::new(PlaceholderGeocoder),
        identity: Box::new(identity.clone()),
        notifier: Box::new(notifier.clone()),
        navigator: Box::new(navigator.clone()),
    };
    let controller =
        BookingController::new(services, Box::new(channel), ReconnectPolicy::default());
    controller
        .set_route(RouteRequest::new(ORIGIN, DESTINATION))
        .unwrap();

    Flow {
        controller,
        notifier,
        navigator,
        identity,
        feeder,
    }
}

pub fn rider() -> Identity {
    Identity::signed_in("Ada", "ada@example.com")
}

pub async fn mount_estimate(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/rides/estimate"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_quote(server: &MockServer) {
    mount_estimate(
        server,
        200,
        json!({"price": 11.75, "distance_km": 5.5, "duration_min": 15}),
    )
    .await;
}

pub async fn mount_checkout(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/rides/create-checkout"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}
