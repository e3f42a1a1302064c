use crate::config::Config;
use crate::domain::ports::Geocoder;
use crate::domain::route::{Coordinates, ResolvedRoute, RouteRequest};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

pub const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Demo coordinates used when no mapping service is configured.
pub const PLACEHOLDER_PICKUP: Coordinates = Coordinates::new(40.7, -74.0);
pub const PLACEHOLDER_DROPOFF: Coordinates = Coordinates::new(40.8, -73.9);

/// Geocodes both ends of the route with the Google Geocoding API.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

impl GoogleGeocoder {
    pub fn new(config: &Config, key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: GOOGLE_GEOCODE_URL.to_string(),
            key: key.into(),
        })
    }

    /// Points the geocoder at a different endpoint, e.g. a local stub.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let response: GeocodeResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.key.as_str())])
            .send()
            .await
            .map_err(|e| BookingError::Geocoding(e.to_string()))?
            .error_for_status()
            .map_err(|e| BookingError::Geocoding(e.to_string()))?
            .json()
            .await
            .map_err(|e| BookingError::Geocoding(e.to_string()))?;

        if response.status != "OK" {
            return Err(BookingError::Geocoding(format!(
                "{} for {address}",
                response.status
            )));
        }
        let location = response
            .results
            .into_iter()
            .next()
            .map(|result| result.geometry.location)
            .ok_or_else(|| BookingError::Geocoding(format!("no results for {address}")))?;
        debug!(address, lat = location.lat, lng = location.lng, "geocoded");
        Ok(location)
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, route: &RouteRequest) -> Result<ResolvedRoute> {
        let (pickup, dropoff) =
            futures::try_join!(self.geocode(&route.origin), self.geocode(&route.destination))?;
        Ok(ResolvedRoute { pickup, dropoff })
    }
}

/// Returns fixed demo coordinates regardless of the addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGeocoder;

#[async_trait]
impl Geocoder for PlaceholderGeocoder {
    async fn resolve(&self, route: &RouteRequest) -> Result<ResolvedRoute> {
        warn!(
            origin = %route.origin,
            destination = %route.destination,
            "no mapping key configured, sending placeholder coordinates"
        );
        Ok(ResolvedRoute {
            pickup: PLACEHOLDER_PICKUP,
            dropoff: PLACEHOLDER_DROPOFF,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_geocoder() {
        let resolved = PlaceholderGeocoder
            .resolve(&RouteRequest::new("Union Square, NY", "Central Park, NY"))
            .await
            .unwrap();
        assert_eq!(resolved.pickup, Coordinates::new(40.7, -74.0));
        assert_eq!(resolved.dropoff, Coordinates::new(40.8, -73.9));
    }

    #[test]
    fn test_geocode_response_parsing() {
        let body = r#"{
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 40.7359, "lng": -73.9911}}}]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, "OK");
        assert_eq!(response.results[0].geometry.location, Coordinates::new(40.7359, -73.9911));
    }
}
