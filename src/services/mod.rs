pub mod aggregator;
pub mod geocoder;
pub mod pricing;

pub use aggregator::{AggregationEngine, FALLBACK_DISTANCE_KM};
pub use geocoder::{Geocoder, OpenCageGeocoder};
pub use pricing::{FixedClock, LocalClock, PriceEstimate, PricePredictor, PricingClock, TariffPredictor};
