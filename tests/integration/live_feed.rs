// Integration tests for the live feed controller
//
// A scripted connector stands in for the WebSocket transport. Every connect
// hands the test a server end that can push frames to the client, read the
// commands it sends, or drop the connection. Time is paused so reconnect
// timing can be checked to the millisecond.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chan_overlay::config::ClientConfig;
use chan_overlay::feed::{
    Connector, FeedConnection, FeedPhase, FeedStore, LiveFeedController, ReplayMode, WsCommand,
};
use chan_overlay::{ClientError, Result};
use futures::channel::mpsc as chan;
use futures::{future, Future, SinkExt, StreamExt};
use tokio::sync::mpsc;

/// Server side of one scripted connection
struct ServerEnd {
    to_client: chan::UnboundedSender<Result<String>>,
    from_client: chan::UnboundedReceiver<String>,
}

impl ServerEnd {
    fn push(&self, frame: impl Into<String>) {
        self.to_client.unbounded_send(Ok(frame.into())).unwrap();
    }
}

struct ScriptedConnector {
    attempts: Arc<AtomicUsize>,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

impl Connector for ScriptedConnector {
    fn connect(&self, _url: &str) -> impl Future<Output = Result<FeedConnection>> + Send {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let (to_client, inbound) = chan::unbounded::<Result<String>>();
        let (outbound, from_client) = chan::unbounded::<String>();
        let _ = self.servers.send(ServerEnd {
            to_client,
            from_client,
        });
        future::ready(Ok(FeedConnection {
            inbound: inbound.boxed(),
            outbound: Box::pin(outbound.sink_map_err(|e| ClientError::WebSocket(e.to_string()))),
        }))
    }
}

struct Harness {
    feed: LiveFeedController<ScriptedConnector>,
    store: FeedStore,
    attempts: Arc<AtomicUsize>,
    servers: mpsc::UnboundedReceiver<ServerEnd>,
}

impl Harness {
    fn new() -> Self {
        let attempts = Arc::new(AtomicUsize::new(0));
        let (tx, servers) = mpsc::unbounded_channel();
        let store = FeedStore::new();
        let config = ClientConfig {
            reconnect_delay: Duration::from_millis(3000),
            ..ClientConfig::default()
        };
        let feed = LiveFeedController::new(
            ScriptedConnector {
                attempts: Arc::clone(&attempts),
                servers: tx,
            },
            store.clone(),
            &config,
        );
        Self {
            feed,
            store,
            attempts,
            servers,
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn next_server(&mut self) -> ServerEnd {
        self.servers.try_recv().expect("no pending connection")
    }
}

/// Let spawned tasks run without moving the paused clock
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn event_frame(seq: u64) -> String {
    format!(
        r#"{{"type":"event","event_type":"stroke_settled","bar_idx":{seq},"bar_ts":{ts}.0,"seq":{seq},
            "payload":{{"stroke_id":{seq},"direction":"up","i0":0,"i1":{seq},"p0":80.0,"p1":81.0}}}}"#,
        seq = seq,
        ts = 1_700_000_000 + seq * 60
    )
}

#[cfg(test)]
mod live_feed_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_enable_connects_once() {
        let mut h = Harness::new();
        assert_eq!(h.feed.phase(), FeedPhase::Disabled);

        h.feed.enable();
        h.feed.enable();
        settle().await;

        assert_eq!(h.attempts(), 1);
        assert_eq!(h.feed.phase(), FeedPhase::Connected);
        assert!(h.store.is_connected());
        let _server = h.next_server();
        assert!(h.servers.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_reconnects_after_fixed_delay() {
        let mut h = Harness::new();
        h.feed.enable();
        settle().await;
        let server = h.next_server();

        drop(server);
        settle().await;
        assert!(!h.store.is_connected());
        assert_eq!(h.feed.phase(), FeedPhase::BackoffWait);

        tokio::time::advance(Duration::from_millis(2999)).await;
        settle().await;
        assert_eq!(h.attempts(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(h.attempts(), 2);
        assert!(h.store.is_connected());

        // a second close waits the same fixed delay, no growth
        drop(h.next_server());
        settle().await;
        tokio::time::advance(Duration::from_millis(3000)).await;
        settle().await;
        assert_eq!(h.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_during_delay_cancels_reconnect() {
        let mut h = Harness::new();
        h.feed.enable();
        settle().await;
        drop(h.next_server());
        settle().await;
        assert_eq!(h.feed.phase(), FeedPhase::BackoffWait);

        h.feed.disable();
        assert_eq!(h.feed.phase(), FeedPhase::Disabled);
        assert!(!h.feed.is_enabled());

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(h.attempts(), 1);
        assert!(!h.store.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_stops_store_mutation() {
        let mut h = Harness::new();
        h.feed.enable();
        settle().await;
        let server = h.next_server();
        server.push(event_frame(1));
        settle().await;
        assert_eq!(h.store.events().len(), 1);

        h.feed.disable();
        assert!(!h.store.is_connected());
        let _ = server.to_client.unbounded_send(Ok(event_frame(2)));
        settle().await;
        assert_eq!(h.store.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_messages_leave_state_unchanged() {
        let mut h = Harness::new();
        h.feed.enable();
        settle().await;
        let server = h.next_server();
        server.push(r#"{"type":"bar","idx":3,"ts":1700000000.0,"o":1.0,"h":2.0,"l":0.5,"c":1.5}"#);
        settle().await;
        let before = h.store.get();
        assert_eq!(before.latest_bar.as_ref().map(|b| b.idx), Some(3));

        server.push("not json at all");
        server.push(r#"{"type":"heartbeat"}"#);
        server.push(r#"{"type":"bar","idx":"four"}"#);
        settle().await;

        assert_eq!(h.store.get(), before);
        assert!(h.store.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_window_keeps_latest_200() {
        let mut h = Harness::new();
        h.feed.enable();
        settle().await;
        let server = h.next_server();

        for seq in 0..205 {
            server.push(event_frame(seq));
        }
        settle().await;

        let events = h.store.events();
        assert_eq!(events.len(), 200);
        assert_eq!(events.first().map(|e| e.meta.seq), Some(5));
        assert_eq!(events.last().map(|e| e.meta.seq), Some(204));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_status_push_overwrites() {
        let mut h = Harness::new();
        h.feed.enable();
        settle().await;
        let server = h.next_server();

        server.push(
            r#"{"type":"replay_status","mode":"playing","current_idx":12,"total_bars":500,"speed":2.0}"#,
        );
        settle().await;
        let status = h.store.replay_status();
        assert_eq!(status.mode, ReplayMode::Playing);
        assert_eq!(status.current_idx, 12);

        server.push(
            r#"{"type":"replay_status","mode":"done","current_idx":499,"total_bars":500,"speed":2.0}"#,
        );
        settle().await;
        assert_eq!(h.store.replay_status().mode, ReplayMode::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_command_only_while_open() {
        let mut h = Harness::new();
        let subscribe = WsCommand::subscribe("BZ", "1m");
        assert!(!h.feed.send_command(&subscribe));

        h.feed.enable();
        settle().await;
        let mut server = h.next_server();

        assert!(h.feed.send_command(&subscribe));
        settle().await;
        assert_eq!(
            server.from_client.next().await.as_deref(),
            Some(r#"{"action":"subscribe","symbol":"BZ","tf":"1m"}"#)
        );

        drop(server.to_client);
        settle().await;
        assert!(!h.feed.send_command(&WsCommand::replay_pause()));
    }
}
