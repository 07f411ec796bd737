//! Analysis backend REST client
//!
//! Overlay query, live ingestion status, and the replay session commands.
//! Non-2xx responses become [`ClientError::Status`] with the response body kept
//! verbatim so callers can surface the backend's own message.

use std::future::Future;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::overlay::{OverlayResponse, OverlaySource};
use crate::replay::{ReplayBackend, ReplayStart};

const OVERLAY_PATH: &str = "/api/newchan/overlay";
const LIVE_STATUS_PATH: &str = "/api/live/status";

/// Overlay query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayQuery {
    pub symbol: String,
    /// Source bar interval of the cached data
    pub interval: String,
    /// Display timeframe
    pub tf: String,
    /// `min` or `full`
    pub detail: String,
    pub segment_algo: String,
    pub stroke_mode: String,
    pub min_strict_sep: u32,
    pub center_sustain_m: u32,
}

impl Default for OverlayQuery {
    fn default() -> Self {
        Self {
            symbol: "BZ".to_string(),
            interval: "1min".to_string(),
            tf: "1m".to_string(),
            detail: "full".to_string(),
            segment_algo: "v1".to_string(),
            stroke_mode: "wide".to_string(),
            min_strict_sep: 5,
            center_sustain_m: 2,
        }
    }
}

impl OverlayQuery {
    pub fn for_symbol(symbol: impl Into<String>, tf: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            tf: tf.into(),
            ..Self::default()
        }
    }
}

/// Live ingestion status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub running: bool,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub bar_count: u64,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// REST client for the analysis backend
#[derive(Debug, Clone)]
pub struct ChanApiClient {
    client: Client,
    base_url: String,
}

impl ChanApiClient {
    /// Client for `config.api_base` with the configured request timeout
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("chan-overlay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the overlay snapshot
    ///
    /// The schema version is not checked here; see [`OverlayResponse::is_supported_schema`].
    pub async fn get_overlay(&self, query: &OverlayQuery) -> Result<OverlayResponse> {
        let response = self
            .client
            .get(self.url(OVERLAY_PATH))
            .query(query)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn get_live_status(&self) -> Result<LiveStatus> {
        let response = self.client.get(self.url(LIVE_STATUS_PATH)).send().await?;
        read_json(response).await
    }

    pub async fn replay_start(&self, symbol: &str, tf: &str) -> Result<ReplayStart> {
        self.post_json("/api/replay/start", json!({ "symbol": symbol, "tf": tf }))
            .await
    }

    pub async fn replay_step(&self, session_id: &str, count: u32) -> Result<()> {
        self.post_command(
            "/api/replay/step",
            json!({ "session_id": session_id, "count": count }),
        )
        .await
    }

    pub async fn replay_seek(&self, session_id: &str, bar_idx: u64) -> Result<()> {
        self.post_command(
            "/api/replay/seek",
            json!({ "session_id": session_id, "bar_idx": bar_idx }),
        )
        .await
    }

    pub async fn replay_play(&self, session_id: &str, speed: f64) -> Result<()> {
        self.post_command(
            "/api/replay/play",
            json!({ "session_id": session_id, "speed": speed }),
        )
        .await
    }

    pub async fn replay_pause(&self, session_id: &str) -> Result<()> {
        self.post_command("/api/replay/pause", json!({ "session_id": session_id }))
            .await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        read_json(response).await
    }

    /// POST whose response body carries nothing the client needs
    async fn post_command(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let _: serde_json::Value = self.post_json(path, body).await?;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl OverlaySource for ChanApiClient {
    fn fetch_overlay(
        &self,
        query: &OverlayQuery,
    ) -> impl Future<Output = Result<OverlayResponse>> + Send {
        self.get_overlay(query)
    }
}

impl ReplayBackend for ChanApiClient {
    fn start_session(
        &self,
        symbol: &str,
        tf: &str,
    ) -> impl Future<Output = Result<ReplayStart>> + Send {
        self.replay_start(symbol, tf)
    }

    fn step(&self, session_id: &str, count: u32) -> impl Future<Output = Result<()>> + Send {
        self.replay_step(session_id, count)
    }

    fn seek(&self, session_id: &str, bar_idx: u64) -> impl Future<Output = Result<()>> + Send {
        self.replay_seek(session_id, bar_idx)
    }

    fn play(&self, session_id: &str, speed: f64) -> impl Future<Output = Result<()>> + Send {
        self.replay_play(session_id, speed)
    }

    fn pause(&self, session_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.replay_pause(session_id)
    }
}
