//! Overlay Controller
//!
//! Owns the overlay pipeline for one host chart surface: fetches snapshots,
//! gates them on schema version, rebuilds geometry and repaints.
//!
//! ## Lifecycle
//! - `attach(surface)`: takes ownership of the surface and starts the refresh poll
//!   (first load after the initial delay, then every poll interval)
//! - `detach()`: stops the poll and hands the surface back
//! - dropping the controller stops the poll as well

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::geometry::{GeometryBuilder, GeometryDiagnostics, OverlayGeometry};
use super::renderer::{render, ChanDrawingSettings, PaintOp, SettingsPatch};
use super::types::{OverlayLStar, OverlayResponse};
use super::viewport::CoordinateMapper;
use crate::api::OverlayQuery;
use crate::config::ClientConfig;
use crate::error::Result;

/// Source of overlay snapshots
pub trait OverlaySource: Send + Sync + 'static {
    fn fetch_overlay(
        &self,
        query: &OverlayQuery,
    ) -> impl Future<Output = Result<OverlayResponse>> + Send;
}

/// Host chart surface: coordinate mapping plus a paint sink
pub trait ChartSurface: CoordinateMapper + Send + 'static {
    /// Replace everything the overlay previously drew with `ops`
    fn paint(&mut self, ops: &[PaintOp]);
}

struct OverlayState<C> {
    surface: Option<C>,
    overlay: Option<OverlayResponse>,
    geometry: OverlayGeometry,
    settings: ChanDrawingSettings,
}

struct Inner<S, C> {
    source: S,
    query: OverlayQuery,
    builder: GeometryBuilder,
    state: Mutex<OverlayState<C>>,
}

impl<S: OverlaySource, C: ChartSurface> Inner<S, C> {
    fn lock(&self) -> MutexGuard<'_, OverlayState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh(&self) -> Result<bool> {
        let overlay = self.source.fetch_overlay(&self.query).await?;

        if !overlay.is_supported_schema() {
            debug!(
                schema_version = %overlay.schema_version,
                "Ignoring overlay with unsupported schema"
            );
            return Ok(false);
        }

        let mut state = self.lock();
        state.overlay = Some(overlay);
        self.rebuild(&mut state);
        Ok(true)
    }

    fn rebuild(&self, state: &mut OverlayState<C>) {
        let OverlayState {
            surface,
            overlay,
            geometry,
            settings,
        } = state;
        let (Some(surface), Some(overlay)) = (surface.as_mut(), overlay.as_ref()) else {
            return;
        };
        *geometry = self.builder.build(overlay, &*surface);
        surface.paint(&render(geometry, settings));
    }

    fn repaint(&self, state: &mut OverlayState<C>) {
        let OverlayState {
            surface,
            geometry,
            settings,
            ..
        } = state;
        if let Some(surface) = surface.as_mut() {
            surface.paint(&render(geometry, settings));
        }
    }
}

/// Overlay pipeline bound to at most one host surface
pub struct OverlayController<S, C> {
    inner: Arc<Inner<S, C>>,
    initial_delay: Duration,
    poll_interval: Duration,
    poll: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<S: OverlaySource, C: ChartSurface> OverlayController<S, C> {
    pub fn new(source: S, query: OverlayQuery, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                query,
                builder: GeometryBuilder::new(),
                state: Mutex::new(OverlayState {
                    surface: None,
                    overlay: None,
                    geometry: OverlayGeometry::default(),
                    settings: ChanDrawingSettings::default(),
                }),
            }),
            initial_delay: config.overlay_initial_delay,
            poll_interval: config.overlay_poll_interval,
            poll: None,
        }
    }

    /// Bind to `surface` and start polling
    ///
    /// Must be called within a tokio runtime. A previously attached surface is
    /// released and returned.
    pub fn attach(&mut self, surface: C) -> Option<C> {
        let previous = self.detach();

        {
            let mut state = self.inner.lock();
            state.surface = Some(surface);
            // paint whatever we already have; the poll brings fresh data
            self.inner.rebuild(&mut state);
        }

        // first load is due `initial_delay` after attach
        let first_load = Instant::now() + self.initial_delay;
        let token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.inner),
            token.clone(),
            first_load,
            self.poll_interval,
        ));
        self.poll = Some((token, handle));
        info!(
            symbol = %self.inner.query.symbol,
            poll_secs = self.poll_interval.as_secs(),
            "Overlay attached"
        );
        previous
    }

    /// Stop polling and release the surface
    pub fn detach(&mut self) -> Option<C> {
        self.stop_polling();
        let surface = self.inner.lock().surface.take();
        if surface.is_some() {
            info!("Overlay detached");
        }
        surface
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().surface.is_some()
    }

    /// Fetch once and repaint
    ///
    /// Returns `Ok(false)` when the response carried a foreign schema and was ignored.
    pub async fn refresh(&self) -> Result<bool> {
        self.inner.refresh().await
    }

    /// Rebuild geometry from the current snapshot without refetching
    pub fn on_visible_range_changed(&self) {
        let mut state = self.inner.lock();
        self.inner.rebuild(&mut state);
    }

    /// Run `f` against the attached surface, e.g. to move its visible range
    pub fn with_surface<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.inner.lock().surface.as_mut().map(f)
    }

    pub fn update_settings(&self, patch: SettingsPatch) {
        let mut state = self.inner.lock();
        state.settings.apply(patch);
        self.inner.repaint(&mut state);
    }

    pub fn settings(&self) -> ChanDrawingSettings {
        self.inner.lock().settings.clone()
    }

    /// Decisive anchor of the latest accepted snapshot
    pub fn lstar(&self) -> Option<OverlayLStar> {
        self.inner
            .lock()
            .overlay
            .as_ref()
            .and_then(|o| o.lstar.clone())
    }

    pub fn overlay(&self) -> Option<OverlayResponse> {
        self.inner.lock().overlay.clone()
    }

    pub fn geometry(&self) -> OverlayGeometry {
        self.inner.lock().geometry.clone()
    }

    pub fn diagnostics(&self) -> GeometryDiagnostics {
        self.inner.lock().geometry.diagnostics.clone()
    }

    fn stop_polling(&mut self) {
        if let Some((token, handle)) = self.poll.take() {
            token.cancel();
            handle.abort();
        }
    }
}

impl<S, C> Drop for OverlayController<S, C> {
    fn drop(&mut self) {
        if let Some((token, handle)) = self.poll.take() {
            token.cancel();
            handle.abort();
        }
    }
}

async fn poll_loop<S: OverlaySource, C: ChartSurface>(
    inner: Arc<Inner<S, C>>,
    token: CancellationToken,
    first_load: Instant,
    poll_interval: Duration,
) {
    let mut due = first_load;
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep_until(due) => {}
        }

        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = inner.refresh() => result,
        };
        if let Err(e) = result {
            warn!(error = %e, error_type = e.error_type(), "Overlay refresh failed");
        }
        due = Instant::now() + poll_interval;
    }
}
