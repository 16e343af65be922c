use crate::config::ProviderConfig;
use crate::geo::haversine_km;
use crate::models::{ComparisonSnapshot, ProviderQuote, TripIntent, SAME_ADDRESS_REASON};
use crate::services::geocoder::Geocoder;
use crate::services::pricing::PricePredictor;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Distance priced when the client gave no route
pub const FALLBACK_DISTANCE_KM: f64 = 10.0;

/// Turns one trip intent into one comparison snapshot.
///
/// Stateless across cycles: every call geocodes, measures and prices afresh.
/// Collaborator failures end up in the snapshot as failed quotes; nothing is
/// retried within a cycle.
pub struct AggregationEngine {
    geocoder: Arc<dyn Geocoder>,
    predictor: Arc<dyn PricePredictor>,
    providers: Vec<ProviderConfig>,
}

impl AggregationEngine {
    /// Create a new aggregation engine
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        predictor: Arc<dyn PricePredictor>,
        providers: Vec<ProviderConfig>,
    ) -> Self {
        Self {
            geocoder,
            predictor,
            providers,
        }
    }

    /// Configured providers, in output order
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Run one pricing cycle for the intent
    pub async fn aggregate(&self, intent: &TripIntent) -> ComparisonSnapshot {
        if intent.is_same_address() {
            debug!("Pickup and dropoff match, skipping pricing");
            return self.failed_snapshot(intent, SAME_ADDRESS_REASON);
        }

        let route = match intent.route() {
            Some((pickup, dropoff)) => {
                let (pickup_result, dropoff_result) = futures::join!(
                    self.geocoder.geocode(pickup),
                    self.geocoder.geocode(dropoff)
                );

                match (pickup_result, dropoff_result) {
                    (Ok(from), Ok(to)) => Some((from, to, haversine_km(from, to))),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Route resolution failed: {}", e);
                        return self.failed_snapshot(intent, &e.to_string());
                    }
                }
            }
            None => None,
        };

        let distance_km = route
            .map(|(_, _, distance)| distance)
            .unwrap_or(FALLBACK_DISTANCE_KM);

        let quotes = join_all(
            self.providers
                .iter()
                .map(|provider| self.quote(provider, distance_km, &intent.vehicle_class)),
        )
        .await;

        let snapshot = ComparisonSnapshot::from_quotes(intent.category.clone(), quotes);
        match route {
            Some((from, to, distance)) => snapshot.with_route(from, to, distance),
            None => snapshot,
        }
    }

    async fn quote(
        &self,
        provider: &ProviderConfig,
        distance_km: f64,
        vehicle_class: &str,
    ) -> ProviderQuote {
        match self
            .predictor
            .predict(&provider.id, distance_km, vehicle_class)
            .await
        {
            Ok(estimate) => ProviderQuote::priced(
                provider.id.clone(),
                provider.category.clone(),
                estimate.price,
                estimate.diagnostics,
            ),
            Err(e) => {
                warn!("Pricing failed for provider {}: {}", provider.id, e);
                ProviderQuote::failed(provider.id.clone(), provider.category.clone(), e.to_string())
            }
        }
    }

    fn failed_snapshot(&self, intent: &TripIntent, reason: &str) -> ComparisonSnapshot {
        let quotes = self
            .providers
            .iter()
            .map(|p| ProviderQuote::failed(p.id.clone(), p.category.clone(), reason))
            .collect();

        ComparisonSnapshot::from_quotes(intent.category.clone(), quotes)
    }
}
