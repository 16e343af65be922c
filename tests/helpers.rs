#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use ridecompare_backend::config::{default_providers, ProviderConfig, SessionConfig};
use ridecompare_backend::error::{AppResult, GeocodeError, PricingError};
use ridecompare_backend::models::{Coordinates, Diagnostics};
use ridecompare_backend::services::{AggregationEngine, Geocoder, PriceEstimate, PricePredictor};
use ridecompare_backend::websocket::PriceSession;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub fn paris() -> Coordinates {
    Coordinates::new(48.8566, 2.3522)
}

pub fn versailles() -> Coordinates {
    Coordinates::new(48.8049, 2.1204)
}

/// Geocoder answering from a fixed table; unknown addresses are not found
pub struct ScriptedGeocoder {
    answers: HashMap<String, Result<Coordinates, GeocodeError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, address: &str, answer: Result<Coordinates, GeocodeError>) -> Self {
        self.answers.insert(address.to_string(), answer);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        self.calls.lock().unwrap().push(address.to_string());
        self.answers
            .get(address)
            .cloned()
            .unwrap_or(Err(GeocodeError::NotFound))
    }
}

/// Geocoder that panics on its first lookup, then delegates
pub struct PanicOnceGeocoder {
    inner: ScriptedGeocoder,
    panicked: AtomicBool,
}

impl PanicOnceGeocoder {
    pub fn new(inner: ScriptedGeocoder) -> Self {
        Self {
            inner,
            panicked: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls()
    }
}

#[async_trait]
impl Geocoder for PanicOnceGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            self.inner.calls.lock().unwrap().push(address.to_string());
            panic!("geocoder blew up");
        }
        self.inner.geocode(address).await
    }
}

/// One recorded pricing call
#[derive(Debug, Clone, PartialEq)]
pub struct PricingCall {
    pub provider_id: String,
    pub distance_km: f64,
    pub vehicle_class: String,
}

/// Predictor answering from a fixed per-provider table, with optional delays
pub struct ScriptedPredictor {
    prices: HashMap<String, Result<Decimal, PricingError>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<PricingCall>>,
    completed: AtomicUsize,
    completion_order: Mutex<Vec<String>>,
}

impl ScriptedPredictor {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            completion_order: Mutex::new(Vec::new()),
        }
    }

    /// cab1 and cab2 priced at the given cents
    pub fn two_providers(cab1_cents: i64, cab2_cents: i64) -> Self {
        Self::new()
            .with_price("cab1", Decimal::new(cab1_cents, 2))
            .with_price("cab2", Decimal::new(cab2_cents, 2))
    }

    pub fn with_price(mut self, provider_id: &str, price: Decimal) -> Self {
        self.prices.insert(provider_id.to_string(), Ok(price));
        self
    }

    pub fn with_failure(mut self, provider_id: &str, error: PricingError) -> Self {
        self.prices.insert(provider_id.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, provider_id: &str, delay: Duration) -> Self {
        self.delays.insert(provider_id.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<PricingCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn completion_order(&self) -> Vec<String> {
        self.completion_order.lock().unwrap().clone()
    }
}

#[async_trait]
impl PricePredictor for ScriptedPredictor {
    async fn predict(
        &self,
        provider_id: &str,
        distance_km: f64,
        vehicle_class: &str,
    ) -> Result<PriceEstimate, PricingError> {
        self.calls.lock().unwrap().push(PricingCall {
            provider_id: provider_id.to_string(),
            distance_km,
            vehicle_class: vehicle_class.to_string(),
        });

        if let Some(delay) = self.delays.get(provider_id) {
            tokio::time::sleep(*delay).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        self.completion_order
            .lock()
            .unwrap()
            .push(provider_id.to_string());

        let price = self
            .prices
            .get(provider_id)
            .cloned()
            .unwrap_or_else(|| Err(PricingError::UnknownProvider(provider_id.to_string())))?;

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert("distance_km".to_string(), json!(distance_km));
        diagnostics.insert("cab_type".to_string(), json!(vehicle_class));

        Ok(PriceEstimate { price, diagnostics })
    }
}

/// Engine over the two default providers
pub fn engine(
    geocoder: Arc<dyn Geocoder>,
    predictor: Arc<dyn PricePredictor>,
) -> Arc<AggregationEngine> {
    engine_with(geocoder, predictor, default_providers())
}

pub fn engine_with(
    geocoder: Arc<dyn Geocoder>,
    predictor: Arc<dyn PricePredictor>,
    providers: Vec<ProviderConfig>,
) -> Arc<AggregationEngine> {
    Arc::new(AggregationEngine::new(geocoder, predictor, providers))
}

/// Session timing used with paused tokio time
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        receive_timeout_ms: 100,
        idle_poll_ms: 500,
        cadence_secs: 15,
    }
}

/// Run a session over an in-memory WebSocket and return the client end
pub async fn connect_session(
    engine: Arc<AggregationEngine>,
    config: SessionConfig,
) -> (WebSocketStream<DuplexStream>, JoinHandle<AppResult<()>>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

    let session = PriceSession::new(engine, config);
    let handle = tokio::spawn(session.run(server));

    (client, handle)
}

/// Read the next snapshot pushed to the client
pub async fn next_snapshot(client: &mut WebSocketStream<DuplexStream>) -> serde_json::Value {
    loop {
        match client.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("snapshot is valid JSON");
            }
            Some(Ok(_)) => continue,
            other => panic!("expected a snapshot, got {:?}", other),
        }
    }
}
