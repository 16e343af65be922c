use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Reason attached to every quote when pickup and dropoff match
pub const SAME_ADDRESS_REASON: &str = "Same address";

/// Opaque feature name -> value bundle returned by the price predictor
pub type Diagnostics = BTreeMap<String, serde_json::Value>;

/// One provider's estimate for one cycle.
///
/// `price == None` means the provider could not be priced and
/// `error_reason` says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderQuote {
    #[serde(rename = "provider")]
    pub provider_id: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub category: String,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(rename = "breakdown")]
    pub diagnostics: Diagnostics,
}

impl ProviderQuote {
    /// A successfully priced quote
    pub fn priced(
        provider_id: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            price: Some(price),
            category: category.into(),
            error_reason: None,
            diagnostics,
        }
    }

    /// A quote carrying a failure reason instead of a price
    pub fn failed(
        provider_id: impl Into<String>,
        category: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            price: None,
            category: category.into(),
            error_reason: Some(reason.into()),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn is_priced(&self) -> bool {
        self.price.is_some()
    }
}
