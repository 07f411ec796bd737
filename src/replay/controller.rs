//! Replay Session Controller
//!
//! Drives a remote replay session and keeps the local copy of its status.
//!
//! ## Modes
//! `idle -start-> paused -play-> playing -pause-> paused`; step/seek keep the
//! mode and leave the index to the next status push; `stop` returns to idle
//! from anywhere without asking the remote.
//!
//! Remote failures propagate as [`ClientError::Status`] carrying code and body.
//! Commands issued without an active session are silent no-ops.
//!
//! Every `start` and `stop` opens a new epoch. A remote response is applied
//! only if the epoch it was issued in is still current, so nothing that
//! resolves after a `stop` can revive the session.
//!
//! [`ClientError::Status`]: crate::error::ClientError::Status

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::feed::{FeedStore, ReplayMode, ReplayStatus, StoreUpdate};

/// Response of a session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStart {
    pub session_id: String,
    pub total_bars: u64,
    /// Timeframes the session can be viewed in, when the backend reports them
    #[serde(default)]
    pub timeframes: Vec<String>,
}

/// Remote replay session API
pub trait ReplayBackend: Send + Sync {
    fn start_session(
        &self,
        symbol: &str,
        tf: &str,
    ) -> impl Future<Output = Result<ReplayStart>> + Send;

    fn step(&self, session_id: &str, count: u32) -> impl Future<Output = Result<()>> + Send;

    fn seek(&self, session_id: &str, bar_idx: u64) -> impl Future<Output = Result<()>> + Send;

    fn play(&self, session_id: &str, speed: f64) -> impl Future<Output = Result<()>> + Send;

    fn pause(&self, session_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Client side of one replay session at a time
///
/// Session id, replay flag and status live in the shared [`FeedStore`], so a
/// status pushed over the live feed overwrites whatever this controller set.
pub struct ReplaySessionController<B> {
    backend: B,
    store: FeedStore,
    epoch: Mutex<u64>,
}

impl<B: ReplayBackend> ReplaySessionController<B> {
    pub fn new(backend: B, store: FeedStore) -> Self {
        Self {
            backend,
            store,
            epoch: Mutex::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn session_id(&self) -> Option<String> {
        self.store.session_id()
    }

    pub fn is_replaying(&self) -> bool {
        self.store.with(|s| s.is_replaying)
    }

    pub fn status(&self) -> ReplayStatus {
        self.store.replay_status()
    }

    /// Create a remote session and make it current
    ///
    /// Resets the local status to paused at bar 0 and clears the event window.
    /// If `stop` or another `start` runs while the request is in flight, the
    /// response is returned but not made current.
    pub async fn start(&self, symbol: &str, tf: &str) -> Result<ReplayStart> {
        let issued = {
            let mut epoch = self.lock_epoch();
            *epoch += 1;
            *epoch
        };
        let started = self.backend.start_session(symbol, tf).await?;

        let epoch = self.lock_epoch();
        if *epoch != issued {
            debug!(
                session_id = %started.session_id,
                "Discarding session start superseded while in flight"
            );
            return Ok(started);
        }
        info!(
            session_id = %started.session_id,
            total_bars = started.total_bars,
            symbol,
            tf,
            "Replay session started"
        );

        let status = ReplayStatus {
            mode: ReplayMode::Paused,
            current_idx: 0,
            total_bars: started.total_bars,
            speed: 1.0,
        };
        let session_id = started.session_id.clone();
        self.store
            .set(StoreUpdate::SessionStarted(session_id.clone()), |s| {
                s.session_id = Some(session_id);
                s.is_replaying = true;
            });
        self.store.set_replay_status(status);
        self.store.clear_events();
        drop(epoch);
        Ok(started)
    }

    /// Advance `count` bars; the new index arrives with the next status push
    pub async fn step(&self, count: u32) -> Result<()> {
        let Some(session_id) = self.session_id() else {
            return Ok(());
        };
        debug!(session_id = %session_id, count, "Replay step");
        self.backend.step(&session_id, count).await
    }

    pub async fn seek(&self, bar_idx: u64) -> Result<()> {
        let Some(session_id) = self.session_id() else {
            return Ok(());
        };
        debug!(session_id = %session_id, bar_idx, "Replay seek");
        self.backend.seek(&session_id, bar_idx).await
    }

    pub async fn play(&self, speed: f64) -> Result<()> {
        let Some(session_id) = self.session_id() else {
            return Ok(());
        };
        let issued = self.current_epoch();
        self.backend.play(&session_id, speed).await?;
        self.apply_if_current(issued, &session_id, |status| {
            status.mode = ReplayMode::Playing;
            status.speed = speed;
        });
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let Some(session_id) = self.session_id() else {
            return Ok(());
        };
        let issued = self.current_epoch();
        self.backend.pause(&session_id).await?;
        self.apply_if_current(issued, &session_id, |status| status.mode = ReplayMode::Paused);
        Ok(())
    }

    /// Leave the session locally: idle status, no session, empty event window
    pub fn stop(&self) {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        let previous = self.store.session_id();
        self.store.set(StoreUpdate::SessionStopped, |s| {
            s.session_id = None;
            s.is_replaying = false;
        });
        self.store.set_replay_status(ReplayStatus::default());
        self.store.clear_events();
        drop(epoch);
        if let Some(session_id) = previous {
            info!(session_id = %session_id, "Replay session stopped");
        }
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    /// Optimistic status update, skipped when the session changed meanwhile
    fn apply_if_current(&self, issued: u64, session_id: &str, f: impl FnOnce(&mut ReplayStatus)) {
        let epoch = self.lock_epoch();
        let applied = *epoch == issued && self.store.update(|s| {
            if s.session_id.as_deref() != Some(session_id) {
                return None;
            }
            f(&mut s.replay_status);
            Some(StoreUpdate::ReplayStatus(s.replay_status))
        });
        drop(epoch);
        if !applied {
            debug!(session_id, "Discarding update for a session that is no longer current");
        }
    }
}
