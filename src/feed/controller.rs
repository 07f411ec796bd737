//! Live Feed Controller
//!
//! Owns the real-time connection lifecycle while the feed is enabled:
//! connect, dispatch inbound messages into the [`FeedStore`], forward
//! outbound commands, and reconnect after a fixed delay whenever the socket
//! closes. There is no backoff growth and no attempt cap.
//!
//! ## Phases
//! `Disabled → Connecting → Connected → (BackoffWait → Connecting)*`
//!
//! At most one socket and one pending reconnect timer exist at a time.
//! `disable()` cancels both; once it returns no further store mutation happens.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::connector::{Connector, FeedConnection};
use super::messages::{WsCommand, WsServerMessage};
use super::store::FeedStore;
use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Disabled,
    Connecting,
    Connected,
    BackoffWait,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the controller handle and its connection task
struct Shared {
    phase: Mutex<FeedPhase>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    attempts: AtomicU64,
    /// Held for every store mutation made by the connection task
    gate: Mutex<()>,
}

impl Shared {
    fn set_phase(&self, phase: FeedPhase) {
        let mut current = lock(&self.phase);
        if *current != phase {
            debug!(from = ?*current, to = ?phase, "Live feed phase change");
            *current = phase;
        }
    }
}

struct RunningFeed {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Real-time feed connection manager
pub struct LiveFeedController<C: Connector> {
    connector: Arc<C>,
    url: String,
    reconnect_delay: Duration,
    store: FeedStore,
    shared: Arc<Shared>,
    running: Mutex<Option<RunningFeed>>,
}

impl<C: Connector> LiveFeedController<C> {
    pub fn new(connector: C, store: FeedStore, config: &ClientConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            url: config.ws_url.clone(),
            reconnect_delay: config.reconnect_delay,
            store,
            shared: Arc::new(Shared {
                phase: Mutex::new(FeedPhase::Disabled),
                outbound: Mutex::new(None),
                attempts: AtomicU64::new(0),
                gate: Mutex::new(()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn phase(&self) -> FeedPhase {
        *lock(&self.shared.phase)
    }

    /// Connection attempts made since construction
    pub fn connect_attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        lock(&self.running).is_some()
    }

    pub fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.enable();
        } else {
            self.disable();
        }
    }

    /// Start the connection task; no-op if already enabled
    ///
    /// Must be called within a tokio runtime.
    pub fn enable(&self) {
        let mut running = lock(&self.running);
        if running.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let task = FeedTask {
            connector: Arc::clone(&self.connector),
            url: self.url.clone(),
            reconnect_delay: self.reconnect_delay,
            store: self.store.clone(),
            shared: Arc::clone(&self.shared),
            token: token.clone(),
        };
        info!(url = %self.url, "Live feed enabled");
        *running = Some(RunningFeed {
            token,
            handle: tokio::spawn(task.run()),
        });
    }

    /// Tear down the socket and any pending reconnect timer
    pub fn disable(&self) {
        let Some(feed) = lock(&self.running).take() else {
            return;
        };

        feed.token.cancel();
        // wait out a dispatch that is mid-mutation; later ones observe the cancel
        drop(lock(&self.shared.gate));
        lock(&self.shared.outbound).take();
        feed.handle.abort();

        self.shared.set_phase(FeedPhase::Disabled);
        self.store.set_connected(false);
        info!("Live feed disabled");
    }

    /// Best-effort send; dropped (not queued) when the socket is not open
    pub fn send_command(&self, command: &WsCommand) -> bool {
        let text = match command.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode feed command");
                return false;
            }
        };

        let sent = lock(&self.shared.outbound)
            .as_ref()
            .is_some_and(|tx| tx.send(text).is_ok());
        if sent {
            debug!(action = ?command.action, "Feed command sent");
        } else {
            warn!(action = ?command.action, "Live feed not open, dropping command");
        }
        sent
    }
}

impl<C: Connector> Drop for LiveFeedController<C> {
    fn drop(&mut self) {
        self.disable();
    }
}

struct FeedTask<C> {
    connector: Arc<C>,
    url: String,
    reconnect_delay: Duration,
    store: FeedStore,
    shared: Arc<Shared>,
    token: CancellationToken,
}

impl<C: Connector> FeedTask<C> {
    async fn run(self) {
        loop {
            let attempt = {
                let _gate = lock(&self.shared.gate);
                if self.token.is_cancelled() {
                    return;
                }
                self.shared.set_phase(FeedPhase::Connecting);
                self.shared.attempts.fetch_add(1, Ordering::SeqCst) + 1
            };
            info!(attempt, url = %self.url, "Connecting live feed");

            let connected = tokio::select! {
                _ = self.token.cancelled() => return,
                result = self.connector.connect(&self.url) => result,
            };
            match connected {
                Ok(connection) => self.serve(connection).await,
                Err(e) => warn!(attempt, error = %e, "Live feed connect failed"),
            }

            if !self.enter_phase(FeedPhase::BackoffWait) {
                return;
            }
            warn!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Live feed closed, reconnecting after delay"
            );
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn serve(&self, connection: FeedConnection) {
        let FeedConnection {
            mut inbound,
            mut outbound,
        } = connection;
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        {
            let _gate = lock(&self.shared.gate);
            if self.token.is_cancelled() {
                return;
            }
            *lock(&self.shared.outbound) = Some(tx);
            self.shared.set_phase(FeedPhase::Connected);
            self.store.set_connected(true);
        }
        info!(url = %self.url, "Live feed connected");

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                frame = inbound.next() => match frame {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(e)) => {
                        warn!(error = %e, "Live feed read error");
                        break;
                    }
                    None => break,
                },
                Some(text) = rx.recv() => {
                    if let Err(e) = outbound.send(text).await {
                        warn!(error = %e, "Live feed write failed");
                        break;
                    }
                }
            }
        }

        lock(&self.shared.outbound).take();
        let _gate = lock(&self.shared.gate);
        if !self.token.is_cancelled() {
            self.store.set_connected(false);
        }
    }

    /// Phase change under the gate; false once the feed has been disabled
    fn enter_phase(&self, phase: FeedPhase) -> bool {
        let _gate = lock(&self.shared.gate);
        if self.token.is_cancelled() {
            return false;
        }
        self.shared.set_phase(phase);
        true
    }

    fn dispatch(&self, text: &str) {
        let message = match serde_json::from_str::<WsServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed feed message");
                return;
            }
        };

        let _gate = lock(&self.shared.gate);
        if self.token.is_cancelled() {
            return;
        }
        apply_message(&self.store, message);
    }
}

/// Fold one server message into the store
pub fn apply_message(store: &FeedStore, message: WsServerMessage) {
    match message {
        WsServerMessage::Bar(bar) => {
            debug!(idx = bar.idx, close = bar.c, "Bar update");
            store.set_latest_bar(bar);
        }
        WsServerMessage::Event(envelope) => match envelope.to_chan_event() {
            Ok(event) => {
                debug!(event_type = event.event_type(), seq = event.meta.seq, "Domain event");
                store.push_event(event);
            }
            Err(e) => {
                debug!(event_type = %envelope.event_type, error = %e, "Skipping unrecognised event");
            }
        },
        WsServerMessage::ReplayStatus(status) => {
            debug!(mode = ?status.mode, current_idx = status.current_idx, "Replay status");
            store.set_replay_status(status);
        }
        WsServerMessage::Snapshot(snapshot) => {
            info!(
                bar_idx = snapshot.bar_idx,
                strokes = snapshot.strokes.len(),
                event_count = snapshot.event_count,
                "Feed snapshot"
            );
            store.set_snapshot(snapshot);
        }
        WsServerMessage::Error(err) => {
            error!(code = %err.code, message = %err.message, "Feed server error");
            store.set_error(err);
        }
    }
}
