use std::collections::VecDeque;

use super::types::ChanEvent;

/// Number of events the client retains
pub const EVENT_WINDOW_CAPACITY: usize = 200;

/// Bounded, append-only window over the most recent events
///
/// Pushing past capacity drops the oldest event first.
#[derive(Debug, Clone, PartialEq)]
pub struct EventWindow {
    events: VecDeque<ChanEvent>,
    capacity: usize,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::with_capacity(EVENT_WINDOW_CAPACITY)
    }
}

impl EventWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window holding at most `capacity` events (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: ChanEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ChanEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&ChanEvent> {
        self.events.back()
    }

    pub fn to_vec(&self) -> Vec<ChanEvent> {
        self.events.iter().cloned().collect()
    }
}

impl Extend<ChanEvent> for EventWindow {
    fn extend<I: IntoIterator<Item = ChanEvent>>(&mut self, iter: I) {
        for event in iter {
            self.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{EventKind, EventMeta, StrokeEvent};
    use crate::overlay::types::Direction;

    fn event(seq: u64) -> ChanEvent {
        ChanEvent {
            meta: EventMeta {
                bar_idx: seq,
                bar_ts: seq as f64 * 60.0,
                seq,
                event_id: format!("e{}", seq),
                schema_version: 1,
                tf: None,
                stream_id: None,
            },
            kind: EventKind::StrokeCandidate(StrokeEvent {
                stroke_id: seq as i64,
                direction: Direction::Up,
                i0: 0,
                i1: 1,
                p0: 1.0,
                p1: 2.0,
            }),
        }
    }

    #[test]
    fn test_keeps_most_recent_events() {
        let mut window = EventWindow::new();
        window.extend((0..205).map(event));

        assert_eq!(window.len(), EVENT_WINDOW_CAPACITY);
        assert_eq!(window.iter().next().map(|e| e.meta.seq), Some(5));
        assert_eq!(window.latest().map(|e| e.meta.seq), Some(204));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = EventWindow::with_capacity(0);
        window.push(event(1));
        window.push(event(2));
        assert_eq!(window.to_vec().len(), 1);
        assert_eq!(window.latest().map(|e| e.meta.seq), Some(2));
    }
}
