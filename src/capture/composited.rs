//! Composited window capture through a compositor thumbnail
//!
//! Captures a single window the way the compositor renders it, by binding a
//! live thumbnail of the target into a transient borderless host window,
//! positioning the host over a known background, and block-copying the host
//! area from the screen. Compared to copying the window's own surface this
//! picks up compositor output (correct for layered and cloaked windows) and
//! enables per-pixel alpha recovery via a two-pass background probe.
//!
//! The protocol is a straight-line state machine:
//!
//! ```text
//! Idle -> ThumbnailRegistered -> Previewing -> (TransparencyProbe?)
//!      -> Captured -> Unregistered
//! ```
//!
//! Unregistered is terminal and is reached on *every* exit path: success,
//! native failure, a declined window and cancellation all tear the host
//! down before returning. The teardown itself is a [`ThumbnailHost`]
//! obligation; this module guarantees it gets called.
//!
//! # Transparency probe
//!
//! With a transparent background requested, the host is captured twice,
//! once over white and once over black. For a pixel with straight alpha
//! `a` and color `c`, the two composites differ by `255 - a` per channel,
//! so alpha is recovered as `255 - (white - black)` and the color follows
//! from the black pass as `black * 255 / a`. A failed probe degrades to the
//! single-pass capture over the configured background; it never fails the
//! capture.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::capture::offscreen::compute_offscreen_region;
use crate::capture::retry::RetryPolicy;
use crate::capture::topology::DisplayTopology;
use crate::capture::{DesktopSurface, ThumbnailHost, ThumbnailHostFactory};
use crate::error::{CaptureAttempt, CaptureError, CaptureResult};
use crate::model::{Capture, CaptureBounds, CaptureConfig, CaptureTarget, Color, PixelFormat, Rect};

/// Granularity of the cancellable inter-frame wait.
const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Captures windows through a compositor thumbnail host.
pub struct CompositedWindowCapturer<S, F, T> {
    surface:  S,
    factory:  F,
    topology: T,
    config:   CaptureConfig,
    retry:    RetryPolicy,
    cancel:   CancellationToken,
}

impl<S, F, T> CompositedWindowCapturer<S, F, T>
where
    S: DesktopSurface,
    F: ThumbnailHostFactory,
    T: DisplayTopology,
{
    pub fn new(surface: S, factory: F, topology: T, config: CaptureConfig) -> Self {
        let retry = RetryPolicy::new(config.max_retries);
        Self {
            surface,
            factory,
            topology,
            config,
            retry,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses the given token to cancel waits between protocol steps.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Captures `target` through the compositor.
    ///
    /// Declines with `Unsupported` when composition is unavailable or the
    /// compositor reports a zero-sized thumbnail source for this window;
    /// the caller is expected to fall back to a plain region capture.
    ///
    /// Whatever happens mid-protocol, the thumbnail is unregistered and
    /// the host window destroyed before this returns.
    #[instrument(skip(self, target), fields(handle = target.handle, title = %target.title))]
    pub fn capture(&self, target: &CaptureTarget) -> CaptureAttempt<Capture> {
        let host = match self.factory.create_host() {
            Ok(host) => host,
            Err(CaptureError::CompositionUnavailable) => {
                debug!("composition unavailable, declining composited capture");
                return CaptureAttempt::Unsupported;
            }
            Err(err) => return CaptureAttempt::Fatal(err),
        };

        // Teardown runs when the guard drops, on every path out of the
        // protocol below.
        let mut guard = TeardownGuard { host };
        self.run_protocol(&mut guard.host, target)
    }

    fn run_protocol(&self, host: &mut F::Host, target: &CaptureTarget) -> CaptureAttempt<Capture> {
        match self.protocol_steps(host, target) {
            Ok(Some(capture)) => CaptureAttempt::Success(capture),
            Ok(None) => CaptureAttempt::Unsupported,
            Err(err) => CaptureAttempt::Fatal(err),
        }
    }

    /// The protocol proper. `Ok(None)` means the capturer declined and the
    /// caller should fall back to a plain region capture: the compositor
    /// reported a zero source size, or a native call failed before the
    /// host reached the previewing state.
    fn protocol_steps(
        &self,
        host: &mut F::Host,
        target: &CaptureTarget,
    ) -> CaptureResult<Option<Capture>> {
        self.check_cancelled()?;

        let host_rect = match self.bind_and_preview(host, target) {
            Ok(Some(host_rect)) => host_rect,
            Ok(None) => return Ok(None),
            Err(CaptureError::Cancelled) => return Err(CaptureError::Cancelled),
            Err(err) => {
                debug!(error = %err, "compositor declined before previewing, falling back");
                return Ok(None);
            }
        };

        self.wait_frame()?;

        let bounds = CaptureBounds::from_rect(host_rect);
        let mut capture = self.snap(&bounds)?;

        if self.config.transparent_background {
            capture = self.probe_transparency(host, &bounds, capture)?;
        }

        if self.config.mask_corners && !target.maximized && !target.tool_window {
            apply_corner_mask(&mut capture, &self.config.corner_mask);
        }

        if self.config.include_cursor {
            capture.cursor = self.surface.cursor();
        }

        debug!("composited capture complete");
        Ok(Some(capture))
    }

    /// Everything up to the previewing state: register the thumbnail,
    /// validate the source size, position the host, set the first
    /// background and show the preview. Returns the host rectangle, or
    /// `None` when the compositor reports a zero source size.
    fn bind_and_preview(
        &self,
        host: &mut F::Host,
        target: &CaptureTarget,
    ) -> CaptureResult<Option<Rect>> {
        host.register(target)?;
        debug!("thumbnail registered");

        let source = host.source_size()?;
        if source.is_empty() {
            debug!("compositor reported zero thumbnail source size, declining");
            return Ok(None);
        }

        let host_rect = target.host_rect();
        host.position(&host_rect)?;

        let first_background = if self.config.transparent_background {
            Color::WHITE
        } else {
            self.config.background
        };
        host.set_background(first_background)?;
        host.preview(&Rect::new(0, 0, host_rect.width, host_rect.height))?;
        debug!("host previewing");
        Ok(Some(host_rect))
    }

    /// Second probe pass over black, recovering per-pixel alpha from the
    /// white pass already in hand.
    ///
    /// A failed probe degrades instead of propagating: the half-built
    /// result is discarded and the window is recaptured opaquely over the
    /// configured background (the white pass doubles as that capture when
    /// the configured background is white).
    fn probe_transparency(
        &self,
        host: &mut F::Host,
        bounds: &CaptureBounds,
        white: Capture,
    ) -> CaptureResult<Capture> {
        self.check_cancelled()?;

        let black_pass = host
            .set_background(Color::BLACK)
            .and_then(|()| self.wait_frame())
            .and_then(|()| self.snap(bounds));

        let probe_error = match black_pass {
            Ok(black) => match recover_transparency(&white, &black) {
                Some(recovered) => return Ok(recovered),
                None => None,
            },
            Err(CaptureError::Cancelled) => return Err(CaptureError::Cancelled),
            Err(err) => Some(err),
        };
        match probe_error {
            Some(err) => warn!(error = %err, "transparency probe failed, degrading to opaque capture"),
            None => warn!("probe passes disagree on dimensions, degrading to opaque capture"),
        }

        if self.config.background != Color::WHITE {
            let retake = host
                .set_background(self.config.background)
                .and_then(|()| self.wait_frame())
                .and_then(|()| self.snap(bounds));
            if let Ok(capture) = retake {
                return Ok(capture);
            }
        }
        self.check_cancelled()?;
        Ok(white)
    }

    /// One retry-wrapped screen copy of the host rectangle. Host areas no
    /// display covers (a window straddling a monitor gap, or a maximized
    /// host inflated past the screen edge) are blanked fully transparent,
    /// same as the region path.
    fn snap(&self, bounds: &CaptureBounds) -> CaptureResult<Capture> {
        let pixels = self
            .retry
            .attempt(|| self.surface.copy_from_screen(bounds, PixelFormat::Bgr24))?;
        let mut capture = Capture::from_pixels(
            pixels,
            bounds.width() as u32,
            bounds.height() as u32,
            PixelFormat::Bgr24,
            bounds.origin(),
        );
        let offscreen = compute_offscreen_region(bounds, &self.topology.displays());
        offscreen.apply(&mut capture);
        Ok(capture)
    }

    /// Waits one compositor frame delay in small cancellable slices.
    fn wait_frame(&self) -> CaptureResult<()> {
        let mut remaining = Duration::from_millis(self.config.probe_frame_delay_ms);
        while !remaining.is_zero() {
            self.check_cancelled()?;
            let slice = remaining.min(WAIT_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
        self.check_cancelled()
    }

    fn check_cancelled(&self) -> CaptureResult<()> {
        if self.cancel.is_cancelled() {
            Err(CaptureError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Calls [`ThumbnailHost::teardown`] when dropped, covering every exit path
/// of the capture protocol. Teardown is idempotent, so an early explicit
/// call is harmless.
struct TeardownGuard<H: ThumbnailHost> {
    host: H,
}

impl<H: ThumbnailHost> Drop for TeardownGuard<H> {
    fn drop(&mut self) {
        self.host.teardown();
    }
}

/// Reconstructs per-pixel straight alpha from captures of the same content
/// over white and over black.
///
/// For each channel, `alpha = 255 - (white - black)`; the three estimates
/// are averaged and clamped. The true color comes from the black pass:
/// `c = black * 255 / alpha`. Fully transparent pixels come out as clear
/// black, fully opaque pixels as the black pass verbatim. Pixels already
/// transparent in either pass (offscreen-masked areas) stay transparent.
///
/// Returns `None` when the passes disagree on dimensions.
pub fn recover_transparency(white: &Capture, black: &Capture) -> Option<Capture> {
    if white.dimensions() != black.dimensions() {
        return None;
    }

    let (width, height) = white.dimensions();
    let mut out = Capture::solid(width, height, PixelFormat::Bgra32, Color::BLACK);
    out.origin = white.origin;

    for y in 0..height {
        for x in 0..width {
            let (wb, wg, wr, wa) = white.pixel(x, y);
            let (bb, bg, br, ba) = black.pixel(x, y);

            let alpha_sum = alpha_estimate(wb, bb) + alpha_estimate(wg, bg) + alpha_estimate(wr, br);
            let alpha = (alpha_sum / 3).clamp(0, 255);

            let pixel = if alpha == 0 || wa == 0 || ba == 0 {
                (0, 0, 0, 0)
            } else {
                (
                    unblend(bb, alpha),
                    unblend(bg, alpha),
                    unblend(br, alpha),
                    alpha as u8,
                )
            };
            out.set_pixel(x, y, pixel);
        }
    }

    Some(out)
}

fn alpha_estimate(white: u8, black: u8) -> i32 {
    255 - (white as i32 - black as i32)
}

fn unblend(black: u8, alpha: i32) -> u8 {
    ((black as i32 * 255 + alpha / 2) / alpha).clamp(0, 255) as u8
}

/// Clears compositor-drawn rounded corners from a capture.
///
/// `mask` gives per-row pixel counts, outermost row first; row `i` clears
/// `mask[i]` pixels from each side. Applied to all four corners, promoting
/// the buffer to an alpha format first.
pub fn apply_corner_mask(capture: &mut Capture, mask: &[u32]) {
    if mask.is_empty() {
        return;
    }

    capture.promote_to_alpha();
    let (width, height) = capture.dimensions();

    for (row, &count) in mask.iter().enumerate() {
        let row = row as u32;
        if row >= height {
            break;
        }
        let count = count.min(width);
        let bottom = height - 1 - row;
        for i in 0..count {
            let right = width - 1 - i;
            capture.set_pixel(i, row, (0, 0, 0, 0));
            capture.set_pixel(right, row, (0, 0, 0, 0));
            capture.set_pixel(i, bottom, (0, 0, 0, 0));
            capture.set_pixel(right, bottom, (0, 0, 0, 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::mock::{HostEvent, MockHostFactory, MockSurface, MockTopology};
    use crate::model::{Point, Size};

    fn target() -> CaptureTarget {
        let mut t = CaptureTarget::new(42, Rect::new(100, 100, 8, 6));
        t.title = String::from("test window");
        t
    }

    fn capturer(
        surface: MockSurface,
        factory: MockHostFactory,
        config: CaptureConfig,
    ) -> CompositedWindowCapturer<MockSurface, MockHostFactory, MockTopology> {
        CompositedWindowCapturer::new(
            surface,
            factory,
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            config,
        )
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            probe_frame_delay_ms: 0,
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_opaque_capture_over_configured_background() {
        let factory = MockHostFactory::new();
        factory.scene().lock().unwrap().overlay_alpha = 0;
        let events = factory.events();
        let config = CaptureConfig {
            background: Color::new(10, 20, 30),
            ..fast_config()
        };
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, config);

        let capture = cap.capture(&target()).ok().unwrap();
        assert_eq!(capture.dimensions(), (8, 6));
        assert_eq!(capture.origin, Point::new(100, 100));
        // Fully transparent overlay: the configured background shows through
        assert_eq!(capture.pixel(0, 0), (30, 20, 10, 255));

        let events = events.lock().unwrap();
        assert!(events.contains(&HostEvent::Background(Color::new(10, 20, 30))));
        assert_eq!(
            &events[events.len() - 2..],
            &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow]
        );
    }

    #[test]
    fn test_probe_recovers_alpha_within_tolerance() {
        let factory = MockHostFactory::new();
        {
            let scene = factory.scene();
            let mut scene = scene.lock().unwrap();
            scene.overlay = Color::new(200, 100, 50);
            scene.overlay_alpha = 128;
        }
        let config = CaptureConfig {
            transparent_background: true,
            ..fast_config()
        };
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, config);

        let capture = cap.capture(&target()).ok().unwrap();
        assert_eq!(capture.format(), PixelFormat::Bgra32);

        let (b, g, r, a) = capture.pixel(3, 3);
        assert!((a as i32 - 128).abs() <= 2, "alpha {a} not near 128");
        assert!((r as i32 - 200).abs() <= 2, "red {r} not near 200");
        assert!((g as i32 - 100).abs() <= 2, "green {g} not near 100");
        assert!((b as i32 - 50).abs() <= 2, "blue {b} not near 50");
    }

    #[test]
    fn test_probe_uses_white_then_black_backgrounds() {
        let factory = MockHostFactory::new();
        let events = factory.events();
        let config = CaptureConfig {
            transparent_background: true,
            ..fast_config()
        };
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, config);
        cap.capture(&target()).ok().unwrap();

        let backgrounds: Vec<Color> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Background(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(backgrounds, vec![Color::WHITE, Color::BLACK]);
    }

    #[test]
    fn test_probe_failure_degrades_to_opaque_capture() {
        let factory = MockHostFactory::new();
        {
            let scene = factory.scene();
            let mut scene = scene.lock().unwrap();
            scene.overlay = Color::new(200, 100, 50);
            scene.overlay_alpha = 255;
        }
        let surface = MockSurface::over_scene(factory.scene());
        // First snap succeeds; every later copy fails fatally
        let surface = surface.fail_copies_after(1, 10, false);
        let config = CaptureConfig {
            transparent_background: true,
            ..fast_config()
        };
        let cap = capturer(surface, factory, config);

        let capture = cap.capture(&target()).ok().unwrap();
        // Degraded: the white-pass capture, still opaque 24-bit
        assert_eq!(capture.format(), PixelFormat::Bgr24);
        assert_eq!(capture.pixel(0, 0), (50, 100, 200, 255));
    }

    #[test]
    fn test_zero_source_size_declines_and_tears_down() {
        let factory = MockHostFactory::new().with_source_size(Size::new(0, 0));
        let events = factory.events();
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, fast_config());

        assert!(cap.capture(&target()).is_unsupported());

        let events = events.lock().unwrap();
        assert_eq!(
            &events[events.len() - 2..],
            &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow]
        );
    }

    #[test]
    fn test_composition_unavailable_declines_without_host() {
        let factory = MockHostFactory::new().composition_unavailable();
        let events = factory.events();
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, fast_config());

        assert!(cap.capture(&target()).is_unsupported());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_register_failure_declines_and_tears_down() {
        let factory = MockHostFactory::new().fail_register();
        let events = factory.events();
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, fast_config());

        // Failures before the previewing state decline so the caller can
        // fall back to a plain region capture
        assert!(cap.capture(&target()).is_unsupported());

        let events = events.lock().unwrap();
        assert_eq!(
            &events[events.len() - 2..],
            &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow]
        );
    }

    #[test]
    fn test_snap_failure_after_preview_is_fatal() {
        let factory = MockHostFactory::new();
        let surface = MockSurface::over_scene(factory.scene()).fail_next_copies(10, true);
        let cap = capturer(surface, factory, fast_config());

        match cap.capture(&target()) {
            CaptureAttempt::Fatal(err) => {
                assert!(matches!(err, CaptureError::RetriesExhausted { .. }));
            }
            other => panic!("expected fatal attempt, got {other:?}"),
        }
    }

    #[test]
    fn test_host_rect_spanning_monitor_gap_masks_transparent() {
        let factory = MockHostFactory::new();
        let topology = MockTopology::new(vec![
            Rect::new(0, 0, 1920, 1080),
            Rect::new(2000, 0, 1920, 1080),
        ]);
        let cap = CompositedWindowCapturer::new(
            MockSurface::over_scene(factory.scene()),
            factory,
            topology,
            fast_config(),
        );

        let mut target = target();
        target.window_rect = Rect::new(1800, 0, 300, 10);
        let capture = cap.capture(&target).ok().unwrap();
        assert_eq!(capture.format(), PixelFormat::Bgra32);
        // Desktop x 1920..2000 is the gap; local x 120..200
        assert_eq!(capture.pixel(119, 5).3, 255);
        assert_eq!(capture.pixel(120, 5).3, 0);
        assert_eq!(capture.pixel(150, 5).3, 0);
        assert_eq!(capture.pixel(199, 5).3, 0);
        assert_eq!(capture.pixel(200, 5).3, 255);
    }

    #[test]
    fn test_probe_keeps_gap_pixels_transparent() {
        let factory = MockHostFactory::new();
        {
            let scene = factory.scene();
            let mut scene = scene.lock().unwrap();
            scene.overlay = Color::new(200, 100, 50);
            scene.overlay_alpha = 255;
        }
        let topology = MockTopology::new(vec![
            Rect::new(0, 0, 1920, 1080),
            Rect::new(2000, 0, 1920, 1080),
        ]);
        let config = CaptureConfig {
            transparent_background: true,
            ..fast_config()
        };
        let cap = CompositedWindowCapturer::new(
            MockSurface::over_scene(factory.scene()),
            factory,
            topology,
            config,
        );

        let mut target = target();
        target.window_rect = Rect::new(1800, 0, 300, 10);
        let capture = cap.capture(&target).ok().unwrap();
        // Covered pixels survive alpha recovery, gap pixels stay clear
        assert_eq!(capture.pixel(50, 5), (50, 100, 200, 255));
        assert_eq!(capture.pixel(150, 5), (0, 0, 0, 0));
    }

    #[test]
    fn test_probe_failure_recaptures_over_configured_background() {
        let factory = MockHostFactory::new();
        {
            let scene = factory.scene();
            let mut scene = scene.lock().unwrap();
            scene.overlay_alpha = 0;
        }
        let surface = MockSurface::over_scene(factory.scene());
        // White pass succeeds, black pass fails, recapture succeeds
        let surface = surface.fail_copies_after(1, 1, false);
        let config = CaptureConfig {
            transparent_background: true,
            background: Color::new(10, 20, 30),
            ..fast_config()
        };
        let cap = capturer(surface, factory, config);

        let capture = cap.capture(&target()).ok().unwrap();
        assert_eq!(capture.format(), PixelFormat::Bgr24);
        // The degraded result was retaken over the configured background
        assert_eq!(capture.pixel(0, 0), (30, 20, 10, 255));
    }

    #[test]
    fn test_cancellation_still_tears_down_host() {
        let factory = MockHostFactory::new();
        let events = factory.events();
        let token = CancellationToken::new();
        token.cancel();
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, fast_config())
            .with_cancellation(token);

        assert!(matches!(
            cap.capture(&target()),
            CaptureAttempt::Fatal(CaptureError::Cancelled)
        ));

        // Host was created, so it must still be torn down
        let events = events.lock().unwrap();
        assert_eq!(
            &events[..],
            &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow]
        );
    }

    #[test]
    fn test_corner_mask_applied_to_normal_windows() {
        let factory = MockHostFactory::new();
        let config = CaptureConfig {
            mask_corners: true,
            ..fast_config()
        };
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, config);

        let mut target = target();
        target.window_rect = Rect::new(100, 100, 16, 12);
        let capture = cap.capture(&target).ok().unwrap();
        assert_eq!(capture.format(), PixelFormat::Bgra32);
        // Default mask clears 5 pixels from each side on the outermost row
        assert_eq!(capture.pixel(0, 0).3, 0);
        assert_eq!(capture.pixel(4, 0).3, 0);
        assert_eq!(capture.pixel(5, 0).3, 255);
        assert_eq!(capture.pixel(10, 0).3, 255);
        assert_eq!(capture.pixel(11, 0).3, 0);
        // Fifth row clears one pixel; the corners below are untouched
        assert_eq!(capture.pixel(0, 4).3, 0);
        assert_eq!(capture.pixel(0, 5).3, 255);
        // Bottom corners mirror the top
        assert_eq!(capture.pixel(15, 11).3, 0);
        assert_eq!(capture.pixel(5, 11).3, 255);
    }

    #[test]
    fn test_corner_mask_skipped_for_maximized_and_tool_windows() {
        for setup in [
            |t: &mut CaptureTarget| t.maximized = true,
            |t: &mut CaptureTarget| t.tool_window = true,
        ] {
            let factory = MockHostFactory::new();
            let config = CaptureConfig {
                mask_corners: true,
                ..fast_config()
            };
            let cap = capturer(MockSurface::over_scene(factory.scene()), factory, config);

            let mut target = target();
            setup(&mut target);
            let capture = cap.capture(&target).ok().unwrap();
            assert_eq!(capture.format(), PixelFormat::Bgr24);
        }
    }

    #[test]
    fn test_maximized_border_compensation_positions_host() {
        let factory = MockHostFactory::new();
        let events = factory.events();
        let cap = capturer(MockSurface::over_scene(factory.scene()), factory, fast_config());

        let mut target = target();
        target.window_rect = Rect::new(0, 0, 100, 80);
        target.maximized = true;
        target.border = Size::new(8, 8);
        let capture = cap.capture(&target).ok().unwrap();

        assert_eq!(capture.dimensions(), (116, 96));
        assert!(events
            .lock()
            .unwrap()
            .contains(&HostEvent::Position(Rect::new(-8, -8, 116, 96))));
    }

    #[test]
    fn test_recover_transparency_opaque_pixels_pass_through() {
        let white = Capture::solid(2, 2, PixelFormat::Bgr24, Color::new(9, 8, 7));
        let black = Capture::solid(2, 2, PixelFormat::Bgr24, Color::new(9, 8, 7));
        let out = recover_transparency(&white, &black).unwrap();
        assert_eq!(out.pixel(0, 0), (7, 8, 9, 255));
    }

    #[test]
    fn test_recover_transparency_clear_pixels() {
        let white = Capture::solid(1, 1, PixelFormat::Bgr24, Color::WHITE);
        let black = Capture::solid(1, 1, PixelFormat::Bgr24, Color::BLACK);
        let out = recover_transparency(&white, &black).unwrap();
        assert_eq!(out.pixel(0, 0), (0, 0, 0, 0));
    }

    #[test]
    fn test_recover_transparency_dimension_mismatch() {
        let white = Capture::solid(2, 2, PixelFormat::Bgr24, Color::WHITE);
        let black = Capture::solid(3, 2, PixelFormat::Bgr24, Color::BLACK);
        assert!(recover_transparency(&white, &black).is_none());
    }

    #[test]
    fn test_corner_mask_clamps_to_small_buffers() {
        let mut cap = Capture::solid(2, 2, PixelFormat::Bgr24, Color::WHITE);
        apply_corner_mask(&mut cap, &[5, 3, 2, 1, 1]);
        // Entire buffer cleared, no panic
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(cap.pixel(x, y).3, 0);
            }
        }
    }
}
