//! Marker Manager
//!
//! Component-scoped owner of the event marker list for one host series.
//! The list stays sorted by time; every change pushes the full list to the
//! attached surface. Nothing is recorded while detached.

use tracing::debug;

use super::classifier::{classify, MarkerSpec};
use super::types::ChanEvent;

/// Host series that displays point markers
pub trait MarkerSurface {
    /// Replace all markers on the series
    fn set_markers(&mut self, markers: &[MarkerSpec]);
}

/// Owns the marker list and, while attached, the host series handle
///
/// Detaching, or dropping the manager, clears the markers it drew.
pub struct MarkerManager<S: MarkerSurface> {
    markers: Vec<MarkerSpec>,
    surface: Option<S>,
}

impl<S: MarkerSurface> Default for MarkerManager<S> {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            surface: None,
        }
    }
}

impl<S: MarkerSurface> MarkerManager<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a series; a previously bound series is released and returned
    pub fn attach(&mut self, surface: S) -> Option<S> {
        let previous = self.detach();
        self.surface = Some(surface);
        previous
    }

    /// Clear the series and hand it back
    pub fn detach(&mut self) -> Option<S> {
        self.markers.clear();
        let mut surface = self.surface.take()?;
        surface.set_markers(&[]);
        Some(surface)
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Classify `event` and add its marker
    ///
    /// Returns `false` when the event has no marker or no series is attached.
    pub fn add_event(&mut self, event: &ChanEvent) -> bool {
        match classify(event) {
            Some(marker) => self.add(marker),
            None => {
                debug!(event_type = event.event_type(), seq = event.meta.seq, "No marker for event");
                false
            }
        }
    }

    /// Insert a marker, keep the list time-ordered and push it
    ///
    /// Arrivals can be out of order; markers with equal times keep insertion order.
    pub fn add(&mut self, marker: MarkerSpec) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        self.markers.push(marker);
        self.markers.sort_by_key(|m| m.time);
        surface.set_markers(&self.markers);
        true
    }

    /// Drop every marker; called when live or replay mode is switched off
    pub fn clear(&mut self) {
        self.markers.clear();
        if let Some(surface) = self.surface.as_mut() {
            surface.set_markers(&[]);
        }
    }

    pub fn markers(&self) -> &[MarkerSpec] {
        &self.markers
    }
}

impl<S: MarkerSurface> Drop for MarkerManager<S> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.set_markers(&[]);
        }
    }
}
