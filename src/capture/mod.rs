//! Capture components and the native seams they sit on
//!
//! This module contains the capture engine proper:
//!
//! - [`topology`]: display enumeration and virtual-screen geometry
//! - [`offscreen`]: masking of capture areas no display covers
//! - [`retry`]: bounded retry of transiently failing native calls
//! - [`region`]: device-context block-copy capture of a desktop rectangle
//! - [`composited`]: compositor-thumbnail capture of a single window
//! - [`engine`]: the strategy-selecting facade callers use
//! - [`mock`]: in-memory implementations of the native seams for tests
//!
//! Native OS capabilities are consumed through two traits defined here,
//! [`DesktopSurface`] and [`ThumbnailHost`], so every algorithmic part of
//! the engine (bounds validation, retry, offscreen masking, the composited
//! protocol and its cleanup guarantees) runs identically against the real
//! Windows implementations and the mocks.

use std::sync::Arc;

use crate::error::CaptureResult;
use crate::model::{CaptureBounds, CaptureTarget, Color, CursorOverlay, PixelFormat, Rect, Size};

pub mod composited;
pub mod engine;
pub mod mock;
pub mod offscreen;
pub mod region;
pub mod retry;
pub mod topology;

#[cfg(target_os = "windows")]
pub mod dwm;
#[cfg(target_os = "windows")]
pub mod gdi;

pub use composited::CompositedWindowCapturer;
pub use engine::CaptureEngine;
pub use region::RegionCapturer;
pub use retry::RetryPolicy;
pub use topology::DisplayTopology;

#[cfg(target_os = "windows")]
pub use dwm::{DwmHostFactory, WinDisplayTopology};
#[cfg(target_os = "windows")]
pub use gdi::GdiDesktopSurface;

/// Native seam: block-copy access to the desktop's pixels.
///
/// The real implementation acquires the desktop device context, creates a
/// compatible DIB section and performs a layered-content-aware block copy.
/// Every failure is reported as a [`CaptureError::NativeCall`] carrying the
/// failing call's name and the requested dimensions, with the transient
/// graphics-subsystem class marked retryable.
///
/// [`CaptureError::NativeCall`]: crate::error::CaptureError::NativeCall
pub trait DesktopSurface: Send + Sync {
    /// Copies `bounds` from the desktop into a fresh, tightly packed
    /// buffer of the given pixel format.
    ///
    /// This is one unit of work for the retry policy: it must acquire and
    /// release all native resources itself, on every exit path.
    fn copy_from_screen(&self, bounds: &CaptureBounds, format: PixelFormat)
    -> CaptureResult<Vec<u8>>;

    /// Snapshots the cursor image and position, if a cursor is showing.
    fn cursor(&self) -> Option<CursorOverlay> {
        None
    }
}

impl<S: DesktopSurface + ?Sized> DesktopSurface for Arc<S> {
    fn copy_from_screen(
        &self,
        bounds: &CaptureBounds,
        format: PixelFormat,
    ) -> CaptureResult<Vec<u8>> {
        (**self).copy_from_screen(bounds, format)
    }

    fn cursor(&self) -> Option<CursorOverlay> {
        (**self).cursor()
    }
}

/// Native seam: a transient host window with a compositor thumbnail bound
/// into it.
///
/// One host serves exactly one capture; two captures never share a host.
/// Implementations own both the window and the thumbnail handle and must
/// release them in [`teardown`](ThumbnailHost::teardown) — thumbnail first,
/// window second — which the capturer guarantees to call on every exit
/// path, including failure and cancellation. `teardown` is idempotent.
pub trait ThumbnailHost: Send {
    /// Creates the invisible, topmost, borderless host window and binds a
    /// compositor thumbnail of `target` into it.
    fn register(&mut self, target: &CaptureTarget) -> CaptureResult<()>;

    /// The thumbnail source's natural pixel size. A zero dimension means
    /// the compositor declined the window.
    fn source_size(&self) -> CaptureResult<Size>;

    /// Moves the host window to the given screen rectangle.
    fn position(&mut self, rect: &Rect) -> CaptureResult<()>;

    /// Sets the thumbnail destination rectangle (host-local), full
    /// opacity and visibility, and shows the host window.
    fn preview(&mut self, dest: &Rect) -> CaptureResult<()>;

    /// Swaps the host window's background color and forces a repaint.
    fn set_background(&mut self, color: Color) -> CaptureResult<()>;

    /// Unregisters the thumbnail, then destroys the host window.
    fn teardown(&mut self);
}

/// Creates one fresh [`ThumbnailHost`] per composited capture.
pub trait ThumbnailHostFactory: Send + Sync {
    type Host: ThumbnailHost;

    fn create_host(&self) -> CaptureResult<Self::Host>;
}

impl<F: ThumbnailHostFactory + ?Sized> ThumbnailHostFactory for Arc<F> {
    type Host = F::Host;

    fn create_host(&self) -> CaptureResult<Self::Host> {
        (**self).create_host()
    }
}
