//! Region capture via a desktop block copy
//!
//! Captures an arbitrary rectangle of the desktop, including areas spanning
//! multiple displays. The native copy itself lives behind the
//! [`DesktopSurface`] seam; this module owns everything around it: bounds
//! validation, pixel format selection, the retry wrapper, offscreen
//! masking and the cursor overlay.

use tracing::{debug, instrument};

use crate::capture::offscreen::compute_offscreen_region;
use crate::capture::retry::RetryPolicy;
use crate::capture::topology::DisplayTopology;
use crate::capture::DesktopSurface;
use crate::error::CaptureAttempt;
use crate::model::{Capture, CaptureBounds, CaptureConfig, PixelFormat};

/// Captures desktop rectangles through a [`DesktopSurface`].
pub struct RegionCapturer<S, T> {
    surface:        S,
    topology:       T,
    retry:          RetryPolicy,
    include_cursor: bool,
}

impl<S: DesktopSurface, T: DisplayTopology> RegionCapturer<S, T> {
    pub fn new(surface: S, topology: T, config: &CaptureConfig) -> Self {
        Self {
            surface,
            topology,
            retry: RetryPolicy::new(config.max_retries),
            include_cursor: config.include_cursor,
        }
    }

    /// Captures the given desktop rectangle.
    ///
    /// Degenerate bounds (zero-area after normalization) decline with
    /// `Unsupported` before any native call. The buffer is 24-bit unless
    /// part of the rectangle lies outside every display, in which case it
    /// is captured with an alpha channel and the uncovered areas are
    /// blanked to fully transparent.
    ///
    /// The native copy runs under the retry policy; only the recognized
    /// transient failure class is retried and a fatal error carries the
    /// failing call's name and the requested dimensions.
    #[instrument(skip(self), fields(
        x = bounds.origin().x,
        y = bounds.origin().y,
        width = bounds.width(),
        height = bounds.height(),
    ))]
    pub fn capture(&self, bounds: &CaptureBounds) -> CaptureAttempt<Capture> {
        if bounds.is_degenerate() {
            debug!("declining zero-area capture request");
            return CaptureAttempt::Unsupported;
        }

        let displays = self.topology.displays();
        let offscreen = compute_offscreen_region(bounds, &displays);
        let format = if offscreen.has_offscreen_content() {
            PixelFormat::Bgra32
        } else {
            PixelFormat::Bgr24
        };

        let pixels = match self
            .retry
            .attempt(|| self.surface.copy_from_screen(bounds, format))
        {
            Ok(pixels) => pixels,
            Err(err) => return CaptureAttempt::Fatal(err),
        };

        let mut capture = Capture::from_pixels(
            pixels,
            bounds.width() as u32,
            bounds.height() as u32,
            format,
            bounds.origin(),
        );
        offscreen.apply(&mut capture);

        if self.include_cursor {
            capture.cursor = self.surface.cursor();
        }

        debug!(format = ?capture.format(), "region capture complete");
        CaptureAttempt::Success(capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::{MockSurface, MockTopology};
    use crate::error::CaptureError;
    use crate::model::{Color, Point, Rect};

    fn capturer(
        surface: MockSurface,
        topology: MockTopology,
        config: &CaptureConfig,
    ) -> RegionCapturer<MockSurface, MockTopology> {
        RegionCapturer::new(surface, topology, config)
    }

    #[test]
    fn test_degenerate_bounds_decline_without_native_calls() {
        let surface = MockSurface::solid(Color::WHITE);
        let calls = surface.call_log();
        let cap = capturer(
            surface,
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &CaptureConfig::default(),
        );

        let attempt = cap.capture(&CaptureBounds::new(10, 10, 0, 50));
        assert!(attempt.is_unsupported());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_covered_capture_is_opaque_24_bit() {
        let cap = capturer(
            MockSurface::solid(Color::new(200, 100, 50)),
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &CaptureConfig::default(),
        );

        let capture = cap
            .capture(&CaptureBounds::new(10, 20, 30, 40))
            .ok()
            .unwrap();
        assert_eq!(capture.format(), PixelFormat::Bgr24);
        assert_eq!(capture.dimensions(), (30, 40));
        assert_eq!(capture.origin, Point::new(10, 20));
        assert_eq!(capture.pixel(0, 0), (50, 100, 200, 255));
    }

    #[test]
    fn test_offscreen_gap_is_transparent() {
        let topology = MockTopology::new(vec![
            Rect::new(0, 0, 1920, 1080),
            Rect::new(2000, 0, 1920, 1080),
        ]);
        let cap = capturer(
            MockSurface::solid(Color::WHITE),
            topology,
            &CaptureConfig::default(),
        );

        let capture = cap
            .capture(&CaptureBounds::new(1900, 0, 200, 10))
            .ok()
            .unwrap();
        assert_eq!(capture.format(), PixelFormat::Bgra32);
        // Desktop x 1920..2000 is the gap; local x 20..100
        assert_eq!(capture.pixel(19, 5).3, 255);
        assert_eq!(capture.pixel(20, 5).3, 0);
        assert_eq!(capture.pixel(99, 5).3, 0);
        assert_eq!(capture.pixel(100, 5).3, 255);
    }

    #[test]
    fn test_transient_failures_are_retried_to_success() {
        let surface = MockSurface::solid(Color::WHITE).fail_next_copies(2, true);
        let calls = surface.call_log();
        let cap = capturer(
            surface,
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &CaptureConfig::default(),
        );

        let attempt = cap.capture(&CaptureBounds::new(0, 0, 8, 8));
        assert!(attempt.is_success());
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_exhausted_retries_surface_fatal_diagnostics() {
        let surface = MockSurface::solid(Color::WHITE).fail_next_copies(10, true);
        let cap = capturer(
            surface,
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &CaptureConfig::default(),
        );

        match cap.capture(&CaptureBounds::new(0, 0, 640, 480)) {
            CaptureAttempt::Fatal(err) => {
                assert!(matches!(err, CaptureError::RetriesExhausted { attempts: 3, .. }));
                assert_eq!(err.requested_size(), Some((640, 480)));
            }
            other => panic!("expected fatal attempt, got {other:?}"),
        }
    }

    #[test]
    fn test_fatal_surface_error_skips_retries() {
        let surface = MockSurface::solid(Color::WHITE).fail_next_copies(1, false);
        let calls = surface.call_log();
        let cap = capturer(
            surface,
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &CaptureConfig::default(),
        );

        let attempt = cap.capture(&CaptureBounds::new(0, 0, 8, 8));
        assert!(matches!(attempt, CaptureAttempt::Fatal(_)));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cursor_recorded_when_configured() {
        let config = CaptureConfig {
            include_cursor: true,
            ..CaptureConfig::default()
        };
        let cap = capturer(
            MockSurface::solid(Color::WHITE).with_cursor(Point::new(40, 40)),
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &config,
        );

        let capture = cap.capture(&CaptureBounds::new(0, 0, 100, 100)).ok().unwrap();
        assert_eq!(
            capture.cursor.map(|c| c.position),
            Some(Point::new(40, 40))
        );
    }

    #[test]
    fn test_normalized_drag_bounds_capture() {
        let cap = capturer(
            MockSurface::solid(Color::WHITE),
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            &CaptureConfig::default(),
        );

        // Inverted drag from (100,100) to (10,10)
        let bounds = CaptureBounds::from_corners(Point::new(100, 100), Point::new(10, 10));
        let capture = cap.capture(&bounds).ok().unwrap();
        assert_eq!(capture.origin, Point::new(10, 10));
        assert_eq!(capture.dimensions(), (90, 90));
    }
}
