// Integration tests for replay session control
//
// Drives the session controller against an in-memory backend and checks the
// shared feed state it leaves behind, including the race between an
// in-flight command and a local stop.

use std::future::Future;
use std::sync::{Arc, Mutex};

use chan_overlay::events::ChanEvent;
use chan_overlay::feed::{FeedStore, ReplayMode, ReplayStatus, StoreUpdate};
use chan_overlay::replay::{ReplayBackend, ReplaySessionController, ReplayStart};
use chan_overlay::{ClientError, Result};
use tokio::sync::Notify;

/// Backend that records calls; `start` and `play` can be held until released
#[derive(Default)]
struct MemoryBackend {
    calls: Mutex<Vec<String>>,
    hold_start: Option<Arc<Notify>>,
    hold_play: Option<Arc<Notify>>,
    reject_seek: bool,
}

impl MemoryBackend {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReplayBackend for MemoryBackend {
    fn start_session(
        &self,
        symbol: &str,
        tf: &str,
    ) -> impl Future<Output = Result<ReplayStart>> + Send {
        self.record(format!("start {} {}", symbol, tf));
        let hold = self.hold_start.clone();
        async move {
            if let Some(hold) = hold {
                hold.notified().await;
            }
            Ok(ReplayStart {
                session_id: "r-42".to_string(),
                total_bars: 1200,
                timeframes: vec!["1m".to_string(), "5m".to_string()],
            })
        }
    }

    fn step(&self, session_id: &str, count: u32) -> impl Future<Output = Result<()>> + Send {
        self.record(format!("step {} {}", session_id, count));
        async { Ok(()) }
    }

    fn seek(&self, session_id: &str, bar_idx: u64) -> impl Future<Output = Result<()>> + Send {
        self.record(format!("seek {} {}", session_id, bar_idx));
        let reject = self.reject_seek;
        async move {
            if reject {
                Err(ClientError::Status {
                    status: 400,
                    body: "bar_idx out of range".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn play(&self, session_id: &str, speed: f64) -> impl Future<Output = Result<()>> + Send {
        self.record(format!("play {} {}", session_id, speed));
        let hold = self.hold_play.clone();
        async move {
            if let Some(hold) = hold {
                hold.notified().await;
            }
            Ok(())
        }
    }

    fn pause(&self, session_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.record(format!("pause {}", session_id));
        async { Ok(()) }
    }
}

fn stroke_event(seq: u64) -> ChanEvent {
    serde_json::from_value(serde_json::json!({
        "event_type": "stroke_candidate",
        "bar_idx": seq, "bar_ts": 1_700_000_000.0 + seq as f64 * 60.0, "seq": seq,
        "stroke_id": seq, "direction": "down", "i0": 0, "i1": seq, "p0": 82.0, "p1": 81.0
    }))
    .unwrap()
}

#[cfg(test)]
mod replay_round_trip_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_session_round_trip() {
        let store = FeedStore::new();
        let ctl = ReplaySessionController::new(MemoryBackend::default(), store.clone());

        store.push_event(stroke_event(1));
        let started = ctl.start("BZ", "1m").await.unwrap();
        assert_eq!(started.session_id, "r-42");
        assert_eq!(started.timeframes, vec!["1m", "5m"]);
        assert!(store.events().is_empty());

        ctl.play(2.0).await.unwrap();
        assert_eq!(ctl.status().mode, ReplayMode::Playing);

        // status pushes arrive over the live feed and land in the same store
        store.push_event(stroke_event(2));
        store.set_replay_status(ReplayStatus {
            mode: ReplayMode::Playing,
            current_idx: 7,
            total_bars: 1200,
            speed: 2.0,
        });

        ctl.pause().await.unwrap();
        assert_eq!(ctl.status().mode, ReplayMode::Paused);
        assert_eq!(ctl.status().current_idx, 7);

        ctl.seek(10).await.unwrap();
        assert_eq!(ctl.status().current_idx, 7);

        ctl.stop();
        let state = store.get();
        assert_eq!(state.replay_status.mode, ReplayMode::Idle);
        assert_eq!(state.session_id, None);
        assert!(!state.is_replaying);
        assert!(state.events.is_empty());

        // commands after stop are no-ops
        ctl.step(1).await.unwrap();
        assert_eq!(
            ctl.backend().calls(),
            vec!["start BZ 1m", "play r-42 2", "pause r-42", "seek r-42 10"]
        );
    }

    #[tokio::test]
    async fn test_remote_rejection_surfaces_body() {
        let backend = MemoryBackend {
            reject_seek: true,
            ..Default::default()
        };
        let ctl = ReplaySessionController::new(backend, FeedStore::new());
        ctl.start("CL", "5m").await.unwrap();

        let err = ctl.seek(5000).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("bar_idx out of range"));
        assert_eq!(ctl.status().mode, ReplayMode::Paused);
        assert_eq!(ctl.session_id().as_deref(), Some("r-42"));
    }

    #[tokio::test]
    async fn test_play_resolving_after_stop_is_discarded() {
        let hold = Arc::new(Notify::new());
        let backend = MemoryBackend {
            hold_play: Some(Arc::clone(&hold)),
            ..Default::default()
        };
        let store = FeedStore::new();
        let ctl = Arc::new(ReplaySessionController::new(backend, store.clone()));
        ctl.start("BZ", "1m").await.unwrap();

        let pending = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.play(3.0).await })
        };
        tokio::task::yield_now().await;

        ctl.stop();
        let mut updates = store.subscribe();
        hold.notify_one();
        pending.await.unwrap().unwrap();

        assert_eq!(store.replay_status(), ReplayStatus::default());
        assert_eq!(store.session_id(), None);
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_resolving_after_stop_does_not_revive_session() {
        let hold = Arc::new(Notify::new());
        let backend = MemoryBackend {
            hold_start: Some(Arc::clone(&hold)),
            ..Default::default()
        };
        let store = FeedStore::new();
        let ctl = Arc::new(ReplaySessionController::new(backend, store.clone()));

        let pending = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.start("BZ", "1m").await })
        };
        tokio::task::yield_now().await;

        ctl.stop();
        let mut updates = store.subscribe();
        hold.notify_one();
        let started = pending.await.unwrap().unwrap();
        assert_eq!(started.session_id, "r-42");

        assert_eq!(ctl.session_id(), None);
        assert!(!ctl.is_replaying());
        assert_eq!(ctl.status(), ReplayStatus::default());
        assert!(updates.try_recv().is_err());

        // the discarded session cannot be driven either
        ctl.play(2.0).await.unwrap();
        assert_eq!(ctl.backend().calls(), vec!["start BZ 1m"]);
    }

    #[tokio::test]
    async fn test_start_announces_session() {
        let store = FeedStore::new();
        let mut updates = store.subscribe();
        let ctl = ReplaySessionController::new(MemoryBackend::default(), store);
        ctl.start("BZ", "1m").await.unwrap();

        assert_eq!(
            updates.try_recv().unwrap(),
            StoreUpdate::SessionStarted("r-42".to_string())
        );
        match updates.try_recv().unwrap() {
            StoreUpdate::ReplayStatus(status) => {
                assert_eq!(status.mode, ReplayMode::Paused);
                assert_eq!(status.total_bars, 1200);
            }
            other => panic!("unexpected update {:?}", other),
        }
        assert_eq!(updates.try_recv().unwrap(), StoreUpdate::EventsCleared);
    }
}
