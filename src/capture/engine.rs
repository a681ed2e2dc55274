//! Capture engine facade
//!
//! `CaptureEngine` wires the topology, the region capturer and the
//! composited window capturer together and picks the strategy per request:
//!
//! - fullscreen: region capture of the virtual screen bounds
//! - region: region capture of the caller's rectangle
//! - window: composited capture, falling back to a region capture of the
//!   window's screen rectangle when the compositor declines
//!
//! Sync entry points run the native sequence inline on the calling thread.
//! The async wrappers move the whole sequence onto one blocking thread via
//! `spawn_blocking`, since every native resource involved (device contexts,
//! the thumbnail host window) is thread-affine.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::capture::composited::CompositedWindowCapturer;
use crate::capture::region::RegionCapturer;
use crate::capture::topology::{virtual_bounds, DisplayTopology};
use crate::capture::{DesktopSurface, ThumbnailHostFactory};
use crate::error::{CaptureAttempt, CaptureError, CaptureResult};
use crate::model::{Capture, CaptureBounds, CaptureConfig, CaptureTarget};

/// The strategy-selecting capture facade.
///
/// Holds its components behind `Arc` so the async entry points can ship a
/// clone of the whole engine to a blocking thread.
pub struct CaptureEngine<T, S, F> {
    topology: Arc<T>,
    surface:  Arc<S>,
    factory:  Arc<F>,
    config:   CaptureConfig,
    cancel:   CancellationToken,
}

impl<T, S, F> CaptureEngine<T, S, F>
where
    T: DisplayTopology,
    S: DesktopSurface,
    F: ThumbnailHostFactory,
{
    pub fn new(topology: T, surface: S, factory: F, config: CaptureConfig) -> Self {
        Self {
            topology: Arc::new(topology),
            surface:  Arc::new(surface),
            factory:  Arc::new(factory),
            config,
            cancel:   CancellationToken::new(),
        }
    }

    /// Uses the given token to cancel composited captures between steps.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn region_capturer(&self) -> RegionCapturer<Arc<S>, Arc<T>> {
        RegionCapturer::new(self.surface.clone(), self.topology.clone(), &self.config)
    }

    fn composited_capturer(&self) -> CompositedWindowCapturer<Arc<S>, Arc<F>, Arc<T>> {
        CompositedWindowCapturer::new(
            self.surface.clone(),
            self.factory.clone(),
            self.topology.clone(),
            self.config.clone(),
        )
        .with_cancellation(self.cancel.clone())
    }

    /// Captures the whole virtual screen.
    ///
    /// With disjoint displays the virtual screen includes uncovered gaps;
    /// those come back fully transparent.
    #[instrument(skip(self))]
    pub fn capture_fullscreen(&self) -> CaptureResult<Capture> {
        let displays = self.topology.displays();
        let bounds = CaptureBounds::from_rect(virtual_bounds(&displays));
        info!(
            displays = displays.len(),
            width = bounds.width(),
            height = bounds.height(),
            "capturing full virtual screen"
        );
        self.finish_region(self.region_capturer().capture(&bounds))
    }

    /// Captures an arbitrary desktop rectangle.
    #[instrument(skip(self))]
    pub fn capture_region(&self, bounds: CaptureBounds) -> CaptureResult<Capture> {
        self.finish_region(self.region_capturer().capture(&bounds))
    }

    /// Captures a single window, composited when possible.
    ///
    /// Falls back to a plain region capture of the window's screen
    /// rectangle when composition is unavailable or the compositor
    /// declines the window.
    #[instrument(skip(self, target), fields(handle = target.handle, title = %target.title))]
    pub fn capture_window(&self, target: &CaptureTarget) -> CaptureResult<Capture> {
        match self.composited_capturer().capture(target) {
            CaptureAttempt::Success(capture) => Ok(capture),
            CaptureAttempt::Fatal(err) => Err(err),
            CaptureAttempt::Unsupported => {
                debug!("composited capture declined, falling back to region capture");
                let bounds = CaptureBounds::from_rect(target.window_rect);
                self.finish_region(self.region_capturer().capture(&bounds))
            }
        }
    }

    fn finish_region(&self, attempt: CaptureAttempt<Capture>) -> CaptureResult<Capture> {
        match attempt {
            CaptureAttempt::Success(capture) => Ok(capture),
            CaptureAttempt::Unsupported => Err(CaptureError::EmptyBounds),
            CaptureAttempt::Fatal(err) => Err(err),
        }
    }
}

impl<T, S, F> CaptureEngine<T, S, F>
where
    T: DisplayTopology + Send + Sync + 'static,
    S: DesktopSurface + Send + Sync + 'static,
    F: ThumbnailHostFactory + Send + Sync + 'static,
    F::Host: Send + 'static,
{
    /// Async [`capture_fullscreen`](Self::capture_fullscreen) on a blocking
    /// thread.
    pub async fn capture_fullscreen_async(self: &Arc<Self>) -> CaptureResult<Capture> {
        let engine = Arc::clone(self);
        run_blocking(move || engine.capture_fullscreen()).await
    }

    /// Async [`capture_region`](Self::capture_region) on a blocking thread.
    pub async fn capture_region_async(self: &Arc<Self>, bounds: CaptureBounds) -> CaptureResult<Capture> {
        let engine = Arc::clone(self);
        run_blocking(move || engine.capture_region(bounds)).await
    }

    /// Async [`capture_window`](Self::capture_window) on a blocking thread.
    pub async fn capture_window_async(self: &Arc<Self>, target: CaptureTarget) -> CaptureResult<Capture> {
        let engine = Arc::clone(self);
        run_blocking(move || engine.capture_window(&target)).await
    }
}

async fn run_blocking<R: Send + 'static>(
    op: impl FnOnce() -> CaptureResult<R> + Send + 'static,
) -> CaptureResult<R> {
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| CaptureError::Worker(err.to_string()))?
}
