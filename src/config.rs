use std::env;
use std::time::Duration;

/// Default OpenCage forward-geocoding endpoint
pub const DEFAULT_GEOCODER_URL: &str = "https://api.opencagedata.com/geocode/v1/json";

/// A configured pricing provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub id: String,
    pub category: String,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
        }
    }
}

/// Per-connection session timing
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub receive_timeout_ms: u64,
    pub idle_poll_ms: u64,
    pub cadence_secs: u64,
}

/// Geocoding client configuration
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub url: String,
    pub api_key: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub geocoder: GeocoderConfig,
    pub providers: Vec<ProviderConfig>,
    pub log_level: String,
    pub log_format: String,
    pub http_host: String,
    pub http_port: u16,
    pub ws_path: String,
    pub environment: String,
}

impl SessionConfig {
    /// Create session config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let receive_timeout_ms = env::var("SESSION_RECEIVE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(100);

        let idle_poll_ms = env::var("SESSION_IDLE_POLL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(500);

        let cadence_secs = env::var("SESSION_CADENCE_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(15);

        let config = Self {
            receive_timeout_ms,
            idle_poll_ms,
            cadence_secs,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.receive_timeout_ms == 0 {
            return Err("SESSION_RECEIVE_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.idle_poll_ms == 0 {
            return Err("SESSION_IDLE_POLL_MS must be greater than 0".to_string());
        }

        if self.cadence_secs == 0 {
            return Err("SESSION_CADENCE_SECS must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get bounded receive wait as Duration
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Get idle pause as Duration
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Get inter-cycle pause as Duration
    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 100,
            idle_poll_ms: 500,
            cadence_secs: 15,
        }
    }
}

impl GeocoderConfig {
    /// Create geocoder config from environment variables
    pub fn from_env() -> Self {
        let url = env::var("GEOCODER_URL").unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string());

        let api_key = env::var("OPENCAGE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Self { url, api_key }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GEOCODER_URL.to_string(),
            api_key: None,
        }
    }
}

/// Parse an ordered `id:category` provider list, e.g. `cab1:ride,cab2:ride`.
/// A bare `id` gets the `ride` category.
pub fn parse_providers(raw: &str) -> Result<Vec<ProviderConfig>, String> {
    let mut providers: Vec<ProviderConfig> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, category) = match entry.split_once(':') {
            Some((id, category)) => (id.trim(), category.trim()),
            None => (entry, "ride"),
        };

        if id.is_empty() || category.is_empty() {
            return Err(format!("Invalid provider entry: {}", entry));
        }

        if providers.iter().any(|p| p.id == id) {
            return Err(format!("Duplicate provider id: {}", id));
        }

        providers.push(ProviderConfig::new(id, category));
    }

    if providers.is_empty() {
        return Err("PRICING_PROVIDERS must name at least one provider".to_string());
    }

    Ok(providers)
}

/// The two providers compared out of the box
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new("cab1", "ride"),
        ProviderConfig::new("cab2", "ride"),
    ]
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let session = SessionConfig::from_env()?;
        let geocoder = GeocoderConfig::from_env();

        let providers = match env::var("PRICING_PROVIDERS") {
            Ok(raw) => parse_providers(&raw)?,
            Err(_) => default_providers(),
        };

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string());

        let http_host = env::var("HTTP_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8000);

        let ws_path = env::var("WS_PATH")
            .unwrap_or_else(|_| "/ws/prices".to_string());

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        if !ws_path.starts_with('/') {
            return Err(format!("Invalid WS_PATH: {}. Must start with '/'", ws_path));
        }

        Ok(Self {
            session,
            geocoder,
            providers,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            http_host,
            http_port,
            ws_path,
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Check if logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }

    /// Socket address string the WebSocket server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            geocoder: GeocoderConfig::default(),
            providers: default_providers(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8000,
            ws_path: "/ws/prices".to_string(),
            environment: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.receive_timeout(), Duration::from_millis(100));
        assert_eq!(config.idle_poll(), Duration::from_millis(500));
        assert_eq!(config.cadence(), Duration::from_secs(15));
    }

    #[test]
    fn test_session_config_rejects_zero_cadence() {
        let config = SessionConfig {
            cadence_secs: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.ws_path, "/ws/prices");
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(!config.json_logs());
        assert_eq!(config.providers.len(), 2);
    }

    #[test]
    fn test_parse_providers_keeps_order() {
        let providers = parse_providers("cab2:ride, cab1:ride,shuttle").unwrap();
        let ids: Vec<&str> = providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["cab2", "cab1", "shuttle"]);
        assert_eq!(providers[2].category, "ride");
    }

    #[test]
    fn test_parse_providers_rejects_bad_lists() {
        assert!(parse_providers("").is_err());
        assert!(parse_providers("cab1,cab1").is_err());
        assert!(parse_providers(":ride").is_err());
    }
}
