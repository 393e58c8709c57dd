//! Geocoding service implementation
//!
//! Resolves free-text locations to coordinates through a Mapbox-compatible
//! places endpoint. Lookups are advisory: every failure is logged and turned
//! into `None` so event creation never blocks on it.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use crate::config::GeocodingConfig;
use crate::models::Coordinates;
use crate::utils::errors::{GeocodingError, GeocodingResult, Result};
use crate::utils::logging::log_api_error;

/// Anything that can turn a location into coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Coordinates of the best candidate, or `None` when the lookup fails
    async fn resolve(&self, location: &str) -> Option<Coordinates>;
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    /// `[lng, lat]`
    center: Vec<f64>,
}

/// Geocoder backed by the places HTTP API
#[derive(Clone, Debug)]
pub struct GeocodingService {
    client: Client,
    api_url: String,
    access_token: Option<String>,
}

impl GeocodingService {
    /// Create a new GeocodingService instance
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("EventHub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.access_token.is_some()
    }

    /// Look up a location, reporting why it failed
    pub async fn lookup(&self, location: &str) -> GeocodingResult<Coordinates> {
        let token = self.access_token.as_deref().ok_or(GeocodingError::NotConfigured)?;
        let query = location.trim();
        if query.is_empty() {
            return Err(GeocodingError::NoMatch);
        }

        let url = format!(
            "{}/geocoding/v5/mapbox.places/{}.json",
            self.api_url,
            urlencoding::encode(query)
        );
        debug!(location = %query, "Making geocoding request");

        let response = self
            .client
            .get(&url)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| GeocodingError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodingError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
        }

        let places: PlacesResponse = response
            .json()
            .await
            .map_err(|e| GeocodingError::InvalidResponse(e.to_string()))?;

        let feature = places.features.into_iter().next().ok_or(GeocodingError::NoMatch)?;
        match feature.center.as_slice() {
            [lng, lat, ..] => Ok(Coordinates { lat: *lat, lng: *lng }),
            _ => Err(GeocodingError::InvalidResponse("feature center has fewer than two values".to_string())),
        }
    }
}

#[async_trait]
impl Geocoder for GeocodingService {
    async fn resolve(&self, location: &str) -> Option<Coordinates> {
        match self.lookup(location).await {
            Ok(coordinates) => {
                debug!(location = %location, lat = coordinates.lat, lng = coordinates.lng, "Location resolved");
                Some(coordinates)
            }
            Err(GeocodingError::NotConfigured) => {
                debug!("Geocoding skipped, no access token configured");
                None
            }
            Err(GeocodingError::NoMatch) => {
                debug!(location = %location, "No geocoding candidates");
                None
            }
            Err(e) => {
                log_api_error("geocoding", &e.to_string(), Some(location));
                None
            }
        }
    }
}
