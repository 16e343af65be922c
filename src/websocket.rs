use crate::config::SessionConfig;
use crate::error::{AppError, AppResult};
use crate::models::TripIntent;
use crate::services::AggregationEngine;
use crate::AppState;
use futures::FutureExt;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use http::StatusCode;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no valid intent received yet
    AwaitingIntent,
    /// Holding an intent; pricing cycles run at the configured cadence
    Active(TripIntent),
}

/// One client connection's live pricing session.
///
/// Listens for intent updates with a bounded wait and, once an intent is
/// known, runs one aggregation cycle per cadence period. A failed cycle is
/// logged and skipped; only the transport can end the session.
pub struct PriceSession {
    id: Uuid,
    state: SessionState,
    engine: Arc<AggregationEngine>,
    config: SessionConfig,
}

impl PriceSession {
    /// Create a session in `AwaitingIntent`
    pub fn new(engine: Arc<AggregationEngine>, config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::AwaitingIntent,
            engine,
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Last accepted intent, if any
    pub fn last_intent(&self) -> Option<&TripIntent> {
        match &self.state {
            SessionState::Active(intent) => Some(intent),
            SessionState::AwaitingIntent => None,
        }
    }

    /// Apply an inbound message. Malformed messages are logged and dropped
    /// without touching the current intent.
    pub fn apply_message(&mut self, text: &str) -> bool {
        match TripIntent::parse(text) {
            Ok(intent) => {
                debug!("Session {} received intent: {:?}", self.id, intent);
                self.state = SessionState::Active(intent);
                true
            }
            Err(e) => {
                warn!("Session {} discarded malformed message: {}", self.id, e);
                false
            }
        }
    }

    /// Run one aggregation cycle and serialize the snapshot.
    ///
    /// Panics raised anywhere inside the cycle are caught and returned as errors.
    pub async fn run_cycle(&self, intent: &TripIntent) -> AppResult<String> {
        let snapshot = AssertUnwindSafe(self.engine.aggregate(intent))
            .catch_unwind()
            .await
            .map_err(|panic| {
                AppError::Message(format!("pricing cycle panicked: {}", panic_message(&*panic)))
            })?;

        debug!(
            "Session {} priced {}/{} providers",
            self.id,
            snapshot.priced_count(),
            snapshot.quotes.len()
        );

        Ok(snapshot.to_json()?)
    }

    /// Drive the session until the client disconnects or the transport fails
    pub async fn run<S>(mut self, mut ws: S) -> AppResult<()>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Unpin,
    {
        info!("Session {} started", self.id);

        loop {
            match time::timeout(self.config.receive_timeout(), ws.next()).await {
                Err(_) => {}
                Ok(None) => {
                    info!("Session {} ended: stream closed", self.id);
                    return Ok(());
                }
                Ok(Some(Err(e))) => {
                    error!("Session {} transport error: {}", self.id, e);
                    return Err(e.into());
                }
                Ok(Some(Ok(message))) => match message {
                    Message::Text(text) => {
                        self.apply_message(&text);
                    }
                    Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            self.apply_message(text);
                        }
                        Err(e) => warn!("Session {} discarded non UTF-8 binary message: {}", self.id, e),
                    },
                    Message::Close(frame) => {
                        info!("Session {} ended: client closed ({:?})", self.id, frame);
                        ws.close().await.ok();
                        return Ok(());
                    }
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                },
            }

            let intent = match &self.state {
                SessionState::AwaitingIntent => {
                    time::sleep(self.config.idle_poll()).await;
                    continue;
                }
                SessionState::Active(intent) => intent.clone(),
            };

            match self.run_cycle(&intent).await {
                Ok(payload) => {
                    ws.send(Message::Text(payload)).await.map_err(|e| {
                        error!("Session {} failed to push snapshot: {}", self.id, e);
                        AppError::WebSocket(e)
                    })?;
                    info!("Session {} pushed updated prices", self.id);
                }
                Err(e) => {
                    error!("Session {} skipped cycle: {}", self.id, e);
                }
            }

            time::sleep(self.config.cadence()).await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// WebSocket server accepting live pricing sessions
pub struct WebSocketServer {
    state: Arc<AppState>,
}

impl WebSocketServer {
    /// Create a new WebSocket server
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Accept connections forever, one session task per connection
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> AppResult<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New WebSocket connection from {}", addr);
                    let ws = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = ws.handle_connection(stream).await {
                            error!("WebSocket connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("WebSocket accept error: {}", e);
                }
            }
        }
    }

    /// Upgrade a TCP connection and run its session to completion
    pub async fn handle_connection(&self, stream: TcpStream) -> AppResult<()> {
        let expected_path = self.state.config.ws_path.clone();
        let check_path = move |request: &Request, response: Response| {
            if request.uri().path() == expected_path {
                Ok(response)
            } else {
                let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
                *rejection.status_mut() = StatusCode::NOT_FOUND;
                Err(rejection)
            }
        };

        let ws_stream = accept_hdr_async(stream, check_path).await?;

        let session = PriceSession::new(self.state.engine.clone(), self.state.config.session.clone());
        session.run(ws_stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_providers;
    use crate::services::{OpenCageGeocoder, TariffPredictor};

    fn session() -> PriceSession {
        let geocoder = Arc::new(OpenCageGeocoder::new(
            reqwest::Client::new(),
            &Default::default(),
        ));
        let predictor = Arc::new(TariffPredictor::new(default_providers()));
        let engine = Arc::new(AggregationEngine::new(geocoder, predictor, default_providers()));
        PriceSession::new(engine, SessionConfig::default())
    }

    #[test]
    fn test_session_starts_awaiting_intent() {
        let session = session();
        assert_eq!(session.state(), &SessionState::AwaitingIntent);
        assert!(session.last_intent().is_none());
    }

    #[test]
    fn test_valid_message_replaces_intent_wholesale() {
        let mut session = session();
        assert!(session.apply_message(r#"{"pickup":"Paris","dropoff":"Lyon","cabType":"Minivan"}"#));
        assert_eq!(session.last_intent().unwrap().vehicle_class, "Minivan");

        assert!(session.apply_message(r#"{"pickup":"Nice"}"#));
        let intent = session.last_intent().unwrap();
        assert_eq!(intent.pickup.as_deref(), Some("Nice"));
        assert!(intent.dropoff.is_none());
        assert_eq!(intent.vehicle_class, "Economy");
    }

    #[test]
    fn test_malformed_message_keeps_intent() {
        let mut session = session();
        assert!(!session.apply_message("{broken"));
        assert_eq!(session.state(), &SessionState::AwaitingIntent);

        session.apply_message(r#"{"pickup":"Paris","dropoff":"Lyon"}"#);
        let before = session.last_intent().cloned();
        assert!(!session.apply_message("[1, 2, 3]"));
        assert_eq!(session.last_intent().cloned(), before);
    }

    #[tokio::test]
    async fn test_cycle_without_route_uses_fallback_distance() {
        let session = session();
        let payload = session.run_cycle(&TripIntent::default()).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        for result in results {
            assert_eq!(result["breakdown"]["distance_km"], 10.0);
            assert!(result["price"].is_number());
        }
        assert!(value["distance_km"].is_null());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(&*payload), "kaboom");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
