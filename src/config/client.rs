//! Client Configuration
//!
//! Endpoints and timing knobs for the overlay, live feed and replay clients.

use std::time::Duration;

/// Client configuration
///
/// ## Environment Variables
///
/// - `CHAN_API_BASE`: REST base URL (default: http://localhost:8766)
/// - `CHAN_WS_URL`: Real-time feed URL (default: ws://localhost:8766/ws/feed)
/// - `CHAN_RECONNECT_DELAY_MS`: Fixed delay before reconnecting the feed (default: 3000)
/// - `CHAN_OVERLAY_POLL_SECS`: Overlay refresh period (default: 60)
/// - `CHAN_OVERLAY_INITIAL_DELAY_MS`: Delay of the first overlay load after attach (default: 800)
/// - `CHAN_HTTP_TIMEOUT_SECS`: REST request timeout (default: 10)
/// - `CHAN_WS_CONNECT_TIMEOUT_SECS`: Feed handshake timeout (default: 10)
/// - `CHAN_SYMBOL`: Default symbol (default: BZ)
/// - `CHAN_TF`: Default display timeframe (default: 1m)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL, no trailing slash
    pub api_base: String,

    /// Real-time channel URL
    pub ws_url: String,

    /// Delay between a socket close and the next connect attempt
    pub reconnect_delay: Duration,

    /// Period of the overlay refresh poll
    pub overlay_poll_interval: Duration,

    /// Delay before the first overlay load after attaching to a surface
    pub overlay_initial_delay: Duration,

    /// REST request timeout
    pub http_timeout: Duration,

    /// Upper bound on one feed handshake; a timeout counts as a closed socket
    pub ws_connect_timeout: Duration,

    pub symbol: String,

    pub tf: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8766".to_string(),
            ws_url: "ws://localhost:8766/ws/feed".to_string(),
            reconnect_delay: Duration::from_millis(3000),
            overlay_poll_interval: Duration::from_secs(60),
            overlay_initial_delay: Duration::from_millis(800),
            http_timeout: Duration::from_secs(10),
            ws_connect_timeout: Duration::from_secs(10),
            symbol: "BZ".to_string(),
            tf: "1m".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load client configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable is set but cannot be parsed
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Self::default();

        let api_base = std::env::var("CHAN_API_BASE")
            .unwrap_or(defaults.api_base)
            .trim_end_matches('/')
            .to_string();

        let ws_url = std::env::var("CHAN_WS_URL").unwrap_or(defaults.ws_url);

        let reconnect_delay_ms: u64 = std::env::var("CHAN_RECONNECT_DELAY_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let poll_secs: u64 = std::env::var("CHAN_OVERLAY_POLL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?;

        let initial_delay_ms: u64 = std::env::var("CHAN_OVERLAY_INITIAL_DELAY_MS")
            .unwrap_or_else(|_| "800".to_string())
            .parse()?;

        let timeout_secs: u64 = std::env::var("CHAN_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        let ws_connect_timeout_secs: u64 = std::env::var("CHAN_WS_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        if poll_secs == 0 {
            return Err("CHAN_OVERLAY_POLL_SECS must be greater than zero".into());
        }

        let symbol = std::env::var("CHAN_SYMBOL")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(defaults.symbol);

        let tf = std::env::var("CHAN_TF").unwrap_or(defaults.tf);

        Ok(Self {
            api_base,
            ws_url,
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
            overlay_poll_interval: Duration::from_secs(poll_secs),
            overlay_initial_delay: Duration::from_millis(initial_delay_ms),
            http_timeout: Duration::from_secs(timeout_secs),
            ws_connect_timeout: Duration::from_secs(ws_connect_timeout_secs),
            symbol,
            tf,
        })
    }
}
