use crate::geo::round_km;
use crate::models::{Coordinates, ProviderQuote};
use rust_decimal::Decimal;
use serde::Serialize;

/// The result of one pricing cycle, pushed to the client once.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonSnapshot {
    pub category: String,
    pub quotes: Vec<ProviderQuote>,
    pub cheapest: Option<ProviderQuote>,
    pub savings: Decimal,
    pub pickup_coords: Option<Coordinates>,
    pub dropoff_coords: Option<Coordinates>,
    pub distance_km: Option<f64>,
}

impl ComparisonSnapshot {
    /// Reduce quotes into a snapshot without route geometry
    pub fn from_quotes(category: impl Into<String>, quotes: Vec<ProviderQuote>) -> Self {
        let cheapest = cheapest_quote(&quotes).cloned();
        let savings = potential_savings(&quotes);

        Self {
            category: category.into(),
            quotes,
            cheapest,
            savings,
            pickup_coords: None,
            dropoff_coords: None,
            distance_km: None,
        }
    }

    /// Attach resolved route geometry
    pub fn with_route(mut self, pickup: Coordinates, dropoff: Coordinates, distance_km: f64) -> Self {
        self.pickup_coords = Some(pickup);
        self.dropoff_coords = Some(dropoff);
        self.distance_km = Some(distance_km);
        self
    }

    /// Number of quotes carrying a price
    pub fn priced_count(&self) -> usize {
        self.quotes.iter().filter(|q| q.is_priced()).count()
    }

    /// Build the outbound wire payload
    pub fn to_payload(&self) -> PriceUpdate<'_> {
        PriceUpdate {
            category: &self.category,
            results: &self.quotes,
            cheapest: RideSlot {
                ride: self.cheapest.as_ref(),
            },
            savings: SavingsSlot {
                ride: self.savings,
            },
            pickup_coords: self.pickup_coords,
            dropoff_coords: self.dropoff_coords,
            distance_km: self.distance_km.map(round_km),
        }
    }

    /// Serialize the outbound wire payload as JSON text
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_payload())
    }
}

/// Cheapest priced quote; the first minimum in provider order wins ties
pub fn cheapest_quote(quotes: &[ProviderQuote]) -> Option<&ProviderQuote> {
    let mut best: Option<(Decimal, &ProviderQuote)> = None;

    for quote in quotes {
        let Some(price) = quote.price else { continue };
        match best {
            Some((best_price, _)) if best_price <= price => {}
            _ => best = Some((price, quote)),
        }
    }

    best.map(|(_, quote)| quote)
}

/// Spread between the most and least expensive priced quotes, rounded to cents.
///
/// Zero unless at least two quotes are priced.
pub fn potential_savings(quotes: &[ProviderQuote]) -> Decimal {
    let prices: Vec<Decimal> = quotes.iter().filter_map(|q| q.price).collect();
    if prices.len() < 2 {
        return Decimal::ZERO;
    }

    let max = prices.iter().copied().max().unwrap_or(Decimal::ZERO);
    let min = prices.iter().copied().min().unwrap_or(Decimal::ZERO);
    (max - min).round_dp(2)
}

/// Outbound message pushed after every successful cycle
#[derive(Debug, Serialize)]
pub struct PriceUpdate<'a> {
    pub category: &'a str,
    pub results: &'a [ProviderQuote],
    pub cheapest: RideSlot<'a>,
    pub savings: SavingsSlot,
    pub pickup_coords: Option<Coordinates>,
    pub dropoff_coords: Option<Coordinates>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RideSlot<'a> {
    pub ride: Option<&'a ProviderQuote>,
}

#[derive(Debug, Serialize)]
pub struct SavingsSlot {
    #[serde(with = "rust_decimal::serde::float")]
    pub ride: Decimal,
}
