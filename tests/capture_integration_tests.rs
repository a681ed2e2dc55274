//! Engine integration tests against the mock seams
//!
//! These run on every platform: the mock desktop surface and thumbnail
//! host stand in for the native layer, so the full capture flows (strategy
//! selection, retry, offscreen masking, the composited protocol and its
//! cleanup guarantees, the transparency probe) are exercised end to end
//! without a desktop session.

use std::sync::Arc;

use desktop_capture::capture::mock::{
    FailPoint, HostEvent, MockHostFactory, MockSurface, MockTopology,
};
use desktop_capture::capture::CaptureEngine;
use desktop_capture::model::{CaptureConfig, CaptureTarget, Color, Point, Rect, Size};
use desktop_capture::{CaptureBounds, CaptureError, PixelFormat};
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn fast_config() -> CaptureConfig {
    CaptureConfig {
        probe_frame_delay_ms: 0,
        ..CaptureConfig::default()
    }
}

fn target() -> CaptureTarget {
    let mut t = CaptureTarget::new(99, Rect::new(200, 150, 12, 10));
    t.title = String::from("integration target");
    t
}

#[test]
fn test_fullscreen_masks_monitor_gap_transparent() {
    init_tracing();
    let engine = CaptureEngine::new(
        MockTopology::new(vec![
            Rect::new(0, 0, 1920, 1080),
            Rect::new(2000, 0, 1920, 1080),
        ]),
        MockSurface::solid(Color::WHITE),
        MockHostFactory::new(),
        fast_config(),
    );

    let capture = engine.capture_fullscreen().unwrap();
    assert_eq!(capture.origin, Point::new(0, 0));
    assert_eq!(capture.dimensions(), (3920, 1080));
    assert_eq!(capture.format(), PixelFormat::Bgra32);

    // Covered pixels opaque, the 80px gap transparent
    assert_eq!(capture.pixel(1919, 500).3, 255);
    assert_eq!(capture.pixel(1920, 500).3, 0);
    assert_eq!(capture.pixel(1999, 500).3, 0);
    assert_eq!(capture.pixel(2000, 500).3, 255);
}

#[test]
fn test_window_probe_recovers_alpha_end_to_end() {
    let factory = MockHostFactory::new();
    {
        let scene = factory.scene();
        let mut scene = scene.lock().unwrap();
        scene.overlay = Color::new(200, 100, 50);
        scene.overlay_alpha = 128;
    }
    let surface = MockSurface::over_scene(factory.scene());
    let config = CaptureConfig {
        transparent_background: true,
        ..fast_config()
    };
    let engine = CaptureEngine::new(
        MockTopology::single(Rect::new(0, 0, 1920, 1080)),
        surface,
        factory,
        config,
    );

    let capture = engine.capture_window(&target()).unwrap();
    let (b, g, r, a) = capture.pixel(5, 5);
    assert!((a as i32 - 128).abs() <= 2);
    assert!((r as i32 - 200).abs() <= 2);
    assert!((g as i32 - 100).abs() <= 2);
    assert!((b as i32 - 50).abs() <= 2);
}

#[test]
fn test_host_always_torn_down_under_injected_failures() {
    init_tracing();
    let fail_points = [
        FailPoint::Register,
        FailPoint::SourceSize,
        FailPoint::Position,
        FailPoint::Preview,
        FailPoint::Background,
    ];

    for point in fail_points {
        let factory = MockHostFactory::new().with_failure(point);
        let events = factory.events();
        let surface = MockSurface::over_scene(factory.scene());
        let engine = CaptureEngine::new(
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            surface,
            factory,
            fast_config(),
        );

        // Setup failures decline composited capture; the engine falls
        // back to a region capture of the window rectangle
        let capture = engine.capture_window(&target());
        assert!(capture.is_ok(), "fallback failed for {point:?}");
        assert_eq!(capture.unwrap().dimensions(), (12, 10));

        let events = events.lock().unwrap();
        assert_eq!(
            &events[events.len() - 2..],
            &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow],
            "host not torn down after failure at {point:?}"
        );
    }
}

#[test]
fn test_declined_window_falls_back_to_region_capture() {
    let factory = MockHostFactory::new().with_source_size(Size::new(0, 0));
    let events = factory.events();
    let engine = CaptureEngine::new(
        MockTopology::single(Rect::new(0, 0, 1920, 1080)),
        MockSurface::solid(Color::new(9, 9, 9)),
        factory,
        fast_config(),
    );

    let capture = engine.capture_window(&target()).unwrap();
    assert_eq!(capture.origin, Point::new(200, 150));
    assert_eq!(capture.dimensions(), (12, 10));

    // The declined host was still cleaned up before the fallback ran
    let events = events.lock().unwrap();
    assert_eq!(
        &events[events.len() - 2..],
        &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow]
    );
}

#[test]
fn test_transient_copy_failures_recovered_by_retry() {
    let surface = MockSurface::solid(Color::WHITE).fail_next_copies(2, true);
    let copies = surface.call_log();
    let engine = CaptureEngine::new(
        MockTopology::single(Rect::new(0, 0, 1920, 1080)),
        surface,
        MockHostFactory::new(),
        fast_config(),
    );

    let capture = engine
        .capture_region(CaptureBounds::new(0, 0, 16, 16))
        .unwrap();
    assert_eq!(capture.dimensions(), (16, 16));
    assert_eq!(copies.lock().unwrap().len(), 3);
}

#[test]
fn test_retry_budget_exhaustion_reports_last_failure() {
    init_tracing();
    let surface = MockSurface::solid(Color::WHITE).fail_next_copies(100, true);
    let engine = CaptureEngine::new(
        MockTopology::single(Rect::new(0, 0, 1920, 1080)),
        surface,
        MockHostFactory::new(),
        fast_config(),
    );

    let err = engine
        .capture_region(CaptureBounds::new(0, 0, 320, 200))
        .unwrap_err();
    assert!(matches!(
        err,
        CaptureError::RetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(err.failing_call(), Some("BitBlt"));
    assert_eq!(err.requested_size(), Some((320, 200)));
}

#[tokio::test]
async fn test_async_window_capture_end_to_end() {
    let factory = MockHostFactory::new();
    let surface = MockSurface::over_scene(factory.scene());
    let engine = Arc::new(CaptureEngine::new(
        MockTopology::single(Rect::new(0, 0, 1920, 1080)),
        surface,
        factory,
        fast_config(),
    ));

    let capture = engine.capture_window_async(target()).await.unwrap();
    assert_eq!(capture.dimensions(), (12, 10));
}

#[tokio::test]
async fn test_cancelled_window_capture_still_tears_down() {
    let factory = MockHostFactory::new();
    let events = factory.events();
    let surface = MockSurface::over_scene(factory.scene());
    let token = CancellationToken::new();
    token.cancel();
    let engine = Arc::new(
        CaptureEngine::new(
            MockTopology::single(Rect::new(0, 0, 1920, 1080)),
            surface,
            factory,
            fast_config(),
        )
        .with_cancellation(token),
    );

    let result = engine.capture_window_async(target()).await;
    assert!(matches!(result, Err(CaptureError::Cancelled)));

    let events = events.lock().unwrap();
    assert_eq!(
        &events[..],
        &[HostEvent::UnregisterThumbnail, HostEvent::DestroyWindow]
    );
}

#[test]
fn test_drag_selection_normalized_before_capture() {
    let engine = CaptureEngine::new(
        MockTopology::single(Rect::new(0, 0, 1920, 1080)),
        MockSurface::solid(Color::WHITE),
        MockHostFactory::new(),
        fast_config(),
    );

    let bounds = CaptureBounds::from_corners(Point::new(300, 300), Point::new(100, 200));
    let capture = engine.capture_region(bounds).unwrap();
    assert_eq!(capture.origin, Point::new(100, 200));
    assert_eq!(capture.dimensions(), (200, 100));
}
