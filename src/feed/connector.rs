//! Real-time channel transport
//!
//! The feed controller only sees text frames in and text frames out.
//! [`Connector`] opens one connection; the WebSocket implementation sits
//! behind the `websocket` feature so tests can script connections instead.

use std::future::Future;
use std::pin::Pin;
#[cfg(feature = "websocket")]
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::Sink;

use crate::error::{ClientError, Result};

/// One open real-time connection
///
/// The inbound stream ending (or yielding an error) means the connection closed.
pub struct FeedConnection {
    pub inbound: BoxStream<'static, Result<String>>,
    pub outbound: Pin<Box<dyn Sink<String, Error = ClientError> + Send>>,
}

impl std::fmt::Debug for FeedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedConnection").finish_non_exhaustive()
    }
}

/// Opens real-time connections
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> impl Future<Output = Result<FeedConnection>> + Send;
}

/// WebSocket transport over tokio-tungstenite
///
/// A handshake that does not complete within `handshake_timeout` fails with
/// [`ClientError::Connection`], which the feed treats like any other close.
#[cfg(feature = "websocket")]
#[derive(Debug, Clone, Copy)]
pub struct WebSocketConnector {
    handshake_timeout: Duration,
}

#[cfg(feature = "websocket")]
impl WebSocketConnector {
    pub fn new(handshake_timeout: Duration) -> Self {
        Self { handshake_timeout }
    }

    pub fn from_config(config: &crate::config::ClientConfig) -> Self {
        Self::new(config.ws_connect_timeout)
    }
}

#[cfg(feature = "websocket")]
impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[cfg(feature = "websocket")]
impl Connector for WebSocketConnector {
    fn connect(&self, url: &str) -> impl Future<Output = Result<FeedConnection>> + Send {
        use futures_util::{future, SinkExt, StreamExt};
        use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

        let url = url.to_owned();
        let handshake_timeout = self.handshake_timeout;
        async move {
            tracing::info!(url = %url, "Connecting to feed WebSocket");
            let (ws_stream, _) = tokio::time::timeout(handshake_timeout, connect_async(url.as_str()))
                .await
                .map_err(|_| {
                    ClientError::Connection(format!(
                        "Feed handshake timed out after {:?}",
                        handshake_timeout
                    ))
                })??;
            let (write, read) = ws_stream.split();

            let inbound = read
                .filter_map(|msg_result| async move {
                    match msg_result {
                        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                        Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => Some(Ok(text)),
                            Err(_) => {
                                tracing::debug!(len = data.len(), "Ignoring non-UTF-8 binary frame");
                                None
                            }
                        },
                        Ok(Message::Close(frame)) => {
                            tracing::info!("Feed WebSocket closed: {:?}", frame);
                            None
                        }
                        Ok(_) => None,
                        Err(e) => Some(Err(ClientError::from(e))),
                    }
                })
                .boxed();

            let outbound = write
                .with(|text: String| {
                    future::ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(Message::text(
                        text,
                    )))
                })
                .sink_map_err(ClientError::from);

            Ok(FeedConnection {
                inbound,
                outbound: Box::pin(outbound),
            })
        }
    }
}
