// Feed envelopes turned into chart markers

use std::cell::RefCell;
use std::rc::Rc;

use chan_overlay::events::{ChanEvent, MarkerManager, MarkerPosition, MarkerSpec, MarkerSurface};
use chan_overlay::feed::WsServerMessage;

/// Series double recording every full marker list it receives
#[derive(Clone, Default)]
struct RecordingSeries {
    pushes: Rc<RefCell<Vec<Vec<i64>>>>,
}

impl MarkerSurface for RecordingSeries {
    fn set_markers(&mut self, markers: &[MarkerSpec]) {
        self.pushes
            .borrow_mut()
            .push(markers.iter().map(|m| m.time).collect());
    }
}

fn envelope(event_type: &str, bar_ts: f64, payload: serde_json::Value) -> ChanEvent {
    let frame = serde_json::json!({
        "type": "event",
        "event_type": event_type,
        "bar_idx": 1, "bar_ts": bar_ts, "seq": 1,
        "payload": payload,
    });
    match serde_json::from_value::<WsServerMessage>(frame).unwrap() {
        WsServerMessage::Event(message) => message.to_chan_event().unwrap(),
        other => panic!("unexpected message {:?}", other),
    }
}

fn settled_stroke(bar_ts: f64, direction: &str) -> ChanEvent {
    envelope(
        "stroke_settled",
        bar_ts,
        serde_json::json!({"stroke_id": 1, "direction": direction, "i0": 0, "i1": 4, "p0": 1.0, "p1": 2.0}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_arrivals_are_sorted() {
        let series = RecordingSeries::default();
        let mut manager = MarkerManager::new();
        manager.attach(series.clone());

        assert!(manager.add_event(&settled_stroke(100.0, "up")));
        assert!(manager.add_event(&settled_stroke(50.0, "down")));

        let times: Vec<i64> = manager.markers().iter().map(|m| m.time).collect();
        assert_eq!(times, vec![50, 100]);
        assert_eq!(*series.pushes.borrow(), vec![vec![100], vec![50, 100]]);
        assert_eq!(manager.markers()[0].position, MarkerPosition::AboveBar);
        assert_eq!(manager.markers()[1].position, MarkerPosition::BelowBar);
    }

    #[test]
    fn test_fractional_bar_time_truncates() {
        let mut manager = MarkerManager::new();
        manager.attach(RecordingSeries::default());
        manager.add_event(&settled_stroke(1_700_000_059.9, "up"));
        assert_eq!(manager.markers()[0].time, 1_700_000_059);
    }

    #[test]
    fn test_undrawn_kinds_do_not_touch_series() {
        let series = RecordingSeries::default();
        let mut manager = MarkerManager::new();
        manager.attach(series.clone());

        let extended = envelope(
            "stroke_extended",
            60.0,
            serde_json::json!({"stroke_id": 1, "direction": "up", "old_i1": 3, "new_i1": 4, "old_p1": 2.0, "new_p1": 2.5}),
        );
        let invalidated = envelope(
            "segment_invalidate",
            60.0,
            serde_json::json!({"segment_id": 0, "direction": "down", "s0": 0, "s1": 2}),
        );
        assert!(!manager.add_event(&extended));
        assert!(!manager.add_event(&invalidated));
        assert!(series.pushes.borrow().is_empty());
    }

    #[test]
    fn test_pivot_and_move_markers() {
        let mut manager = MarkerManager::new();
        manager.attach(RecordingSeries::default());

        let pivot = envelope(
            "zhongshu_candidate",
            120.0,
            serde_json::json!({"zhongshu_id": 0, "zd": 1.0, "zg": 2.0, "seg_start": 0, "seg_end": 2}),
        );
        let consolidation = envelope(
            "move_candidate",
            180.0,
            serde_json::json!({"move_id": 0, "kind": "consolidation", "direction": "up",
                               "seg_start": 0, "seg_end": 2, "zs_start": 0, "zs_end": 0}),
        );
        assert!(manager.add_event(&pivot));
        assert!(manager.add_event(&consolidation));

        let texts: Vec<&str> = manager.markers().iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["ZS?", "M?"]);
    }

    #[test]
    fn test_clear_pushes_empty_list() {
        let series = RecordingSeries::default();
        let mut manager = MarkerManager::new();
        manager.attach(series.clone());
        manager.add_event(&settled_stroke(60.0, "up"));

        manager.clear();
        assert!(manager.markers().is_empty());
        assert_eq!(series.pushes.borrow().last(), Some(&vec![]));
    }
}
