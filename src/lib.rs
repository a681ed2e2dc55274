//! Desktop and composited-window capture engine for Windows
//!
//! This crate captures desktop pixels three ways:
//!
//! - **Fullscreen**: the whole virtual screen, with areas no display
//!   covers (gaps in disjoint monitor layouts) masked fully transparent
//! - **Region**: an arbitrary desktop rectangle, normalized from drag
//!   selections, via a GDI block copy
//! - **Window**: a single window rendered by the compositor through a DWM
//!   thumbnail, with optional per-pixel alpha recovery via a two-pass
//!   white/black background probe and optional rounded-corner masking
//!
//! The native Windows calls sit behind the [`capture::DesktopSurface`] and
//! [`capture::ThumbnailHost`] seams, with in-memory implementations in
//! [`capture::mock`], so the engine's behavior is fully testable off
//! Windows. Transient native failures are retried back-to-back under a
//! small budget; everything else surfaces as a [`CaptureError`] carrying
//! the failing call's name and the requested dimensions.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(target_os = "windows")]
//! # fn main() -> desktop_capture::CaptureResult<()> {
//! use desktop_capture::capture::{CaptureEngine, DwmHostFactory, GdiDesktopSurface, WinDisplayTopology};
//! use desktop_capture::model::CaptureConfig;
//!
//! let engine = CaptureEngine::new(
//!     WinDisplayTopology::new(),
//!     GdiDesktopSurface::new(),
//!     DwmHostFactory::new(),
//!     CaptureConfig::default(),
//! );
//! let capture = engine.capture_fullscreen()?;
//! let image = capture.to_rgba_image();
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "windows"))]
//! # fn main() {}
//! ```

pub mod capture;
pub mod error;
pub mod model;

pub use capture::{CaptureEngine, CompositedWindowCapturer, RegionCapturer, RetryPolicy};
pub use error::{CaptureAttempt, CaptureError, CaptureResult};
pub use model::{Capture, CaptureBounds, CaptureConfig, CaptureTarget, DisplayInfo, PixelFormat};
