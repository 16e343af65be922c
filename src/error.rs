use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (malformed inbound messages)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Geocoding capability errors
    #[error("Geocoding error: {0}")]
    Geocoding(#[from] GeocodeError),

    /// Price-prediction capability errors
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// WebSocket transport errors (handshake, read, write)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Socket and listener errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error ends the session it was raised in
    pub fn is_transport_fatal(&self) -> bool {
        matches!(self, AppError::WebSocket(_) | AppError::Io(_))
    }
}

/// Failure reasons returned by the geocoding capability.
///
/// The `Display` text is what clients see as a quote's `error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    /// Upstream answered with a non-200 status
    #[error("Geocoding failed: HTTP {0}")]
    HttpStatus(u16),

    /// Upstream found nothing for the query
    #[error("Invalid address")]
    NotFound,

    /// Transport or decoding failure
    #[error("Geocoding error: {0}")]
    Request(String),

    /// No API key configured
    #[error("Geocoding error: API key not configured")]
    MissingApiKey,
}

/// Failures of the price-prediction capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid distance: {0}")]
    InvalidDistance(f64),

    #[error("Prediction failed: {0}")]
    Prediction(String),
}

/// Convenience function to convert Result<T, E> to AppResult<T>
pub fn map_to_app_error<T, E: std::error::Error>(result: Result<T, E>, context: &str) -> AppResult<T> {
    result.map_err(|e| AppError::Message(format!("{}: {}", context, e)))
}
