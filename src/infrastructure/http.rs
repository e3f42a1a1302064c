//! HTTP adapters for the ride API.

use crate::config::Config;
use crate::domain::checkout::{CheckoutRequest, CheckoutSession};
use crate::domain::estimate::Estimate;
use crate::domain::ports::{CheckoutService, EstimateService};
use crate::domain::route::RouteRequest;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

/// Answer of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub db: Option<String>,
}

/// Client for the estimate, checkout and health endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Url::parse(&config.api_url)
            .map_err(|e| BookingError::Config(format!("invalid API URL {}: {e}", config.api_url)))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let response = self
            .client
            .get(format!("{}/api/health", self.api_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl EstimateService for ApiClient {
    async fn estimate(&self, route: &RouteRequest) -> Result<Estimate> {
        let response = self
            .client
            .get(format!("{}/api/rides/estimate", self.api_url))
            .query(&[
                ("origin", route.origin.as_str()),
                ("dest", route.destination.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BookingError::EstimateUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "estimate service returned an error, using fallback estimate");
            return Ok(Estimate::fallback());
        }

        let estimate = response
            .json::<Estimate>()
            .await
            .map_err(|e| BookingError::EstimateUnavailable(e.to_string()))?;
        debug!(?estimate, "estimate received");
        Ok(estimate)
    }
}

#[async_trait]
impl CheckoutService for ApiClient {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/rides/create-checkout", self.api_url))
            .json(request)
            .send()
            .await
            .map_err(|e| BookingError::CheckoutFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BookingError::CheckoutFailed(format!("{status}: {body}")));
        }

        let session = response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| BookingError::CheckoutFailed(e.to_string()))?;
        let target = session.checkout_url.ok_or(BookingError::MissingRedirect)?;
        // Validated only; the caller navigates to the string as received.
        Url::parse(&target)
            .map_err(|e| BookingError::CheckoutFailed(format!("invalid redirect {target}: {e}")))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = Config {
            api_url: "http://localhost:8000/".to_string(),
            ..Config::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.api_url(), "http://localhost:8000");
    }

    #[test]
    fn test_invalid_api_url_is_rejected() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(ApiClient::new(&config), Err(BookingError::Config(_))));
    }
}
