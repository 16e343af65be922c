use crate::config::GeocoderConfig;
use crate::error::GeocodeError;
use crate::models::Coordinates;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Resolves a free-text address to coordinates.
///
/// Ordinary failures (not found, HTTP errors, transport errors) come back as
/// `Err(GeocodeError)`; implementations must not panic on them.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Forward geocoding through the OpenCage HTTP API
pub struct OpenCageGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    geometry: OpenCageGeometry,
}

#[derive(Debug, Deserialize)]
struct OpenCageGeometry {
    lat: f64,
    lng: f64,
}

impl OpenCageGeocoder {
    /// Create a geocoder sharing the given HTTP client (and its connection pool)
    pub fn new(client: reqwest::Client, config: &GeocoderConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn first_match(response: OpenCageResponse) -> Result<Coordinates, GeocodeError> {
        response
            .results
            .into_iter()
            .next()
            .map(|r| Coordinates::new(r.geometry.lat, r.geometry.lng))
            .ok_or(GeocodeError::NotFound)
    }
}

#[async_trait]
impl Geocoder for OpenCageGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::MissingApiKey)?;

        let response = self
            .client
            .get(&self.url)
            .query(&[("q", address), ("key", api_key)])
            .send()
            .await
            .map_err(|e| {
                warn!("Geocoding request for '{}' failed: {}", address, e);
                GeocodeError::Request(e.to_string())
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Geocoding '{}' returned HTTP {}", address, status.as_u16());
            return Err(GeocodeError::HttpStatus(status.as_u16()));
        }

        let body: OpenCageResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        let coords = Self::first_match(body)?;
        debug!("Geocoded '{}' to ({}, {})", address, coords.lat, coords.lng);
        Ok(coords)
    }
}
