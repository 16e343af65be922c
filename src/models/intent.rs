use crate::error::{AppError, AppResult};
use serde::Deserialize;

/// Vehicle class used when the client does not pick one
pub const DEFAULT_VEHICLE_CLASS: &str = "Economy";

/// Service category used when the client does not pick one
pub const DEFAULT_CATEGORY: &str = "ride";

/// The latest trip parameters a client asked to be priced.
///
/// Replaced wholesale by every well-formed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripIntent {
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    pub vehicle_class: String,
    pub category: String,
}

/// Inbound wire shape, e.g. `{"pickup": "...", "dropoff": "...", "cabType": "Minivan"}`
#[derive(Debug, Deserialize)]
struct IntentMessage {
    #[serde(default)]
    pickup: Option<String>,
    #[serde(default)]
    dropoff: Option<String>,
    #[serde(default, rename = "cabType")]
    cab_type: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl TripIntent {
    /// Parse an inbound client message.
    ///
    /// Only JSON objects are accepted; any other JSON value is malformed.
    pub fn parse(text: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(AppError::Validation(
                "intent message must be a JSON object".to_string(),
            ));
        }

        let message: IntentMessage = serde_json::from_value(value)?;
        Ok(Self::from(message))
    }

    /// Pickup and dropoff, when both are present
    pub fn route(&self) -> Option<(&str, &str)> {
        match (self.pickup.as_deref(), self.dropoff.as_deref()) {
            (Some(pickup), Some(dropoff)) => Some((pickup, dropoff)),
            _ => None,
        }
    }

    /// True when both addresses are present and match ignoring case and surrounding whitespace
    pub fn is_same_address(&self) -> bool {
        self.route()
            .map(|(pickup, dropoff)| {
                pickup.trim().to_lowercase() == dropoff.trim().to_lowercase()
            })
            .unwrap_or(false)
    }
}

impl From<IntentMessage> for TripIntent {
    fn from(message: IntentMessage) -> Self {
        Self {
            pickup: message.pickup.filter(|s| !s.is_empty()),
            dropoff: message.dropoff.filter(|s| !s.is_empty()),
            vehicle_class: message
                .cab_type
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_VEHICLE_CLASS.to_string()),
            category: message
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        }
    }
}

impl Default for TripIntent {
    fn default() -> Self {
        Self {
            pickup: None,
            dropoff: None,
            vehicle_class: DEFAULT_VEHICLE_CLASS.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}
