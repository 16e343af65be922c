use crate::config::ProviderConfig;
use crate::error::PricingError;
use crate::models::Diagnostics;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// A predicted fare plus the features it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEstimate {
    pub price: Decimal,
    pub diagnostics: Diagnostics,
}

/// Predicts a fare for one provider, trip distance and vehicle class.
///
/// Time-of-day context is implicit (taken from the implementation's clock).
#[async_trait]
pub trait PricePredictor: Send + Sync {
    async fn predict(
        &self,
        provider_id: &str,
        distance_km: f64,
        vehicle_class: &str,
    ) -> Result<PriceEstimate, PricingError>;
}

/// Source of the wall-clock time used for peak/weekend features
pub trait PricingClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock
pub struct LocalClock;

impl PricingClock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Clock pinned to one instant
pub struct FixedClock(pub NaiveDateTime);

impl PricingClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

const PER_KM_RATE: f64 = 0.95;
const PEAK_TIME_FACTOR: f64 = 1.15;

/// Features fed into the fare formula, echoed back as the quote breakdown
#[derive(Debug, Clone, Serialize)]
pub struct FareFeatures {
    pub distance_km: f64,
    pub cab_type: String,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub provider: String,
    pub base_price: f64,
    pub is_peak_hour: u8,
    pub is_weekend: u8,
    pub trip_type: &'static str,
    pub surge_level: u8,
}

impl FareFeatures {
    fn into_diagnostics(self) -> Diagnostics {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => Diagnostics::new(),
        }
    }
}

/// Morning (07-10) or evening (17-20) rush hour, inclusive
pub fn is_peak_hour(hour: u32) -> bool {
    (7..=10).contains(&hour) || (17..=20).contains(&hour)
}

/// Distance bucket: short up to 3 km, medium up to 10 km, long beyond
pub fn trip_type(distance_km: f64) -> &'static str {
    if distance_km <= 3.0 {
        "short"
    } else if distance_km <= 10.0 {
        "medium"
    } else {
        "long"
    }
}

/// Fare multiplier per vehicle class; unknown classes price as Economy
pub fn class_factor(vehicle_class: &str) -> f64 {
    match vehicle_class {
        "Quickest" => 1.3,
        "WaitAndSave" => 0.8,
        "Minivan" => 1.6,
        "BlackSUV" => 2.0,
        _ => 1.0,
    }
}

fn surge_multiplier(surge_level: u8) -> f64 {
    match surge_level {
        3 => 1.5,
        2 => 1.25,
        _ => 1.0,
    }
}

/// Tariff-based fare predictor.
///
/// Reproduces the fare structure of the simulated provider market: a base fare
/// plus a per-km rate, scaled by vehicle class, rush hour and surge, with a
/// small real-time fluctuation on top.
pub struct TariffPredictor {
    providers: Vec<ProviderConfig>,
    clock: Box<dyn PricingClock>,
}

impl TariffPredictor {
    /// Create a predictor for the given providers using the local clock
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            clock: Box::new(LocalClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: impl PricingClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn base_price(provider_id: &str) -> f64 {
        if provider_id == "cab1" {
            5.0
        } else {
            4.5
        }
    }

    /// Build the feature set for one provider at the given instant
    pub fn features<R: Rng>(
        &self,
        provider_id: &str,
        distance_km: f64,
        vehicle_class: &str,
        at: NaiveDateTime,
        rng: &mut R,
    ) -> FareFeatures {
        let hour = at.hour();
        let peak = is_peak_hour(hour);
        let weekend = at.weekday().num_days_from_monday() >= 5;

        let surge_level = match (peak, rng.gen_bool(0.5)) {
            (true, true) => 3,
            (true, false) => 2,
            (false, _) => 1,
        };

        FareFeatures {
            distance_km,
            cab_type: vehicle_class.to_string(),
            hour_of_day: hour,
            day_of_week: at.weekday().num_days_from_monday(),
            provider: provider_id.to_string(),
            base_price: Self::base_price(provider_id),
            is_peak_hour: peak as u8,
            is_weekend: weekend as u8,
            trip_type: trip_type(distance_km),
            surge_level,
        }
    }

    /// Fare for a feature set before fluctuation
    pub fn tariff(features: &FareFeatures) -> f64 {
        let time_factor = if features.is_peak_hour == 1 {
            PEAK_TIME_FACTOR
        } else {
            1.0
        };

        (features.base_price + features.distance_km * PER_KM_RATE)
            * class_factor(&features.cab_type)
            * time_factor
            * surge_multiplier(features.surge_level)
    }

    fn estimate(
        &self,
        provider_id: &str,
        distance_km: f64,
        vehicle_class: &str,
    ) -> Result<PriceEstimate, PricingError> {
        if !self.providers.iter().any(|p| p.id == provider_id) {
            return Err(PricingError::UnknownProvider(provider_id.to_string()));
        }

        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(PricingError::InvalidDistance(distance_km));
        }

        let mut rng = rand::thread_rng();
        let features = self.features(provider_id, distance_km, vehicle_class, self.clock.now(), &mut rng);

        let fluctuation = if features.is_peak_hour == 1 {
            rng.gen_range(1.01..1.08)
        } else {
            rng.gen_range(0.97..1.01)
        };

        let fare = Self::tariff(&features) * fluctuation;
        let price = Decimal::from_f64(fare)
            .ok_or_else(|| PricingError::Prediction(format!("fare {} is not representable", fare)))?
            .round_dp(2)
            .max(Decimal::ZERO);

        Ok(PriceEstimate {
            price,
            diagnostics: features.into_diagnostics(),
        })
    }
}

#[async_trait]
impl PricePredictor for TariffPredictor {
    async fn predict(
        &self,
        provider_id: &str,
        distance_km: f64,
        vehicle_class: &str,
    ) -> Result<PriceEstimate, PricingError> {
        self.estimate(provider_id, distance_km, vehicle_class)
    }
}
