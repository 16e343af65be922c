//! RideCompare Backend Library
//!
//! This module exposes the backend components for use by tests and other consumers.

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod services;
pub mod websocket;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use services::{AggregationEngine, OpenCageGeocoder, TariffPredictor};
use std::sync::Arc;

/// Process-wide resources shared read-only by every session
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<AggregationEngine>,
}

impl AppState {
    /// Create a new AppState around an already-built engine
    pub fn new(config: AppConfig, engine: Arc<AggregationEngine>) -> Self {
        Self { config, engine }
    }

    /// Build the production collaborators (OpenCage geocoder, tariff predictor)
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("ridecompare-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let geocoder = Arc::new(OpenCageGeocoder::new(http_client, &config.geocoder));
        let predictor = Arc::new(TariffPredictor::new(config.providers.clone()));
        let engine = Arc::new(AggregationEngine::new(
            geocoder,
            predictor,
            config.providers.clone(),
        ));

        Ok(Self::new(config, engine))
    }
}
