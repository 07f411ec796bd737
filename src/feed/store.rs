//! Feed state container
//!
//! Shared record of connection state, latest bar, event window and replay
//! status, with change notification over a broadcast channel. Writers are the
//! live feed dispatch and the replay controller's optimistic updates; the last
//! write wins.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use super::messages::{BarMessage, ErrorMessage, ReplayStatus, SnapshotMessage};
use crate::events::{ChanEvent, EventWindow};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Everything a view of the live feed needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub connected: bool,
    pub latest_bar: Option<BarMessage>,
    pub events: EventWindow,
    pub replay_status: ReplayStatus,
    pub session_id: Option<String>,
    pub is_replaying: bool,
    /// Raw snapshot as received; not reconciled against the event window
    pub last_snapshot: Option<SnapshotMessage>,
    pub last_error: Option<ErrorMessage>,
}

/// Change notification
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    Connection(bool),
    Bar(BarMessage),
    Event(ChanEvent),
    ReplayStatus(ReplayStatus),
    SessionStarted(String),
    SessionStopped,
    EventsCleared,
    Snapshot(SnapshotMessage),
    Error(ErrorMessage),
}

/// Cloneable handle to the shared feed state
#[derive(Debug, Clone)]
pub struct FeedStore {
    state: Arc<RwLock<FeedState>>,
    updates: broadcast::Sender<StoreUpdate>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(FeedState::default())),
            updates,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates.subscribe()
    }

    /// Copy of the whole state
    pub fn get(&self) -> FeedState {
        self.read().clone()
    }

    /// Borrow the state for a read without cloning
    pub fn with<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&self.read())
    }

    /// Mutate the state and announce `update`
    pub fn set(&self, update: StoreUpdate, f: impl FnOnce(&mut FeedState)) {
        f(&mut self.write());
        self.notify(update);
    }

    /// Mutate the state; `f` returns the update to announce, if any
    ///
    /// Returns whether an update was announced.
    pub fn update(&self, f: impl FnOnce(&mut FeedState) -> Option<StoreUpdate>) -> bool {
        let update = f(&mut self.write());
        match update {
            Some(update) => {
                self.notify(update);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.read().connected
    }

    pub fn session_id(&self) -> Option<String> {
        self.read().session_id.clone()
    }

    pub fn replay_status(&self) -> ReplayStatus {
        self.read().replay_status
    }

    pub fn events(&self) -> Vec<ChanEvent> {
        self.read().events.to_vec()
    }

    pub fn set_connected(&self, connected: bool) {
        {
            let mut state = self.write();
            if state.connected == connected {
                return;
            }
            state.connected = connected;
        }
        self.notify(StoreUpdate::Connection(connected));
    }

    pub fn set_latest_bar(&self, bar: BarMessage) {
        self.write().latest_bar = Some(bar.clone());
        self.notify(StoreUpdate::Bar(bar));
    }

    pub fn push_event(&self, event: ChanEvent) {
        self.write().events.push(event.clone());
        self.notify(StoreUpdate::Event(event));
    }

    pub fn clear_events(&self) {
        self.write().events.clear();
        self.notify(StoreUpdate::EventsCleared);
    }

    /// Overwrite the replay status wholesale
    pub fn set_replay_status(&self, status: ReplayStatus) {
        self.write().replay_status = status;
        self.notify(StoreUpdate::ReplayStatus(status));
    }

    pub fn set_snapshot(&self, snapshot: SnapshotMessage) {
        self.write().last_snapshot = Some(snapshot.clone());
        self.notify(StoreUpdate::Snapshot(snapshot));
    }

    pub fn set_error(&self, error: ErrorMessage) {
        self.write().last_error = Some(error.clone());
        self.notify(StoreUpdate::Error(error));
    }

    fn read(&self) -> RwLockReadGuard<'_, FeedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, update: StoreUpdate) {
        // no receivers is fine
        let _ = self.updates.send(update);
    }
}
