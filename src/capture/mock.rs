//! In-memory implementations of the native capture seams
//!
//! These mocks let every algorithmic part of the engine run without a
//! desktop session: the retry policy, offscreen masking, the composited
//! protocol, its cleanup guarantees and the transparency probe are all
//! exercised against them in unit and integration tests.
//!
//! The key piece is the shared [`Scene`]: the mock surface renders what the
//! mock thumbnail host is showing (an overlay color with an alpha value,
//! composited over the host's current background), so swapping the host
//! background genuinely changes what the next screen copy sees. The
//! two-pass transparency probe therefore reconstructs real alpha values in
//! tests, not canned ones.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::capture::topology::DisplayTopology;
use crate::capture::{DesktopSurface, ThumbnailHost, ThumbnailHostFactory};
use crate::error::{CaptureError, CaptureResult};
use crate::model::{
    CaptureBounds, CaptureTarget, Color, CursorOverlay, DisplayInfo, PixelFormat, Point, Rect, Size,
};

/// What the mock desktop is showing: an overlay composited over a host
/// background.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    /// Host window background, swapped by [`MockThumbnailHost::set_background`].
    pub background:    Color,
    /// Uniform color of the thumbnail content.
    pub overlay:       Color,
    /// Straight alpha of the thumbnail content.
    pub overlay_alpha: u8,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background:    Color::WHITE,
            overlay:       Color::WHITE,
            overlay_alpha: 255,
        }
    }
}

impl Scene {
    /// The color a screen copy observes: overlay over background with
    /// straight alpha, rounded to nearest.
    pub fn rendered(&self) -> Color {
        let a = self.overlay_alpha as u32;
        let blend = |o: u8, b: u8| -> u8 {
            ((o as u32 * a + b as u32 * (255 - a) + 127) / 255) as u8
        };
        Color::new(
            blend(self.overlay.r, self.background.r),
            blend(self.overlay.g, self.background.g),
            blend(self.overlay.b, self.background.b),
        )
    }
}

/// One recorded [`DesktopSurface::copy_from_screen`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCall {
    pub bounds: CaptureBounds,
    pub format: PixelFormat,
}

#[derive(Debug)]
enum SurfaceContent {
    Solid(Color),
    Scene(Arc<Mutex<Scene>>),
}

#[derive(Debug, Default)]
struct FailurePlan {
    /// Copies to let through before failing.
    skip:      u32,
    /// Copies to fail after the skips are used up.
    remaining: u32,
    transient: bool,
}

/// Mock desktop surface with failure injection and call recording.
pub struct MockSurface {
    content: SurfaceContent,
    calls:   Arc<Mutex<Vec<CopyCall>>>,
    plan:    Mutex<FailurePlan>,
    cursor:  Option<Point>,
}

impl MockSurface {
    /// A desktop showing one solid color everywhere.
    pub fn solid(color: Color) -> Self {
        Self {
            content: SurfaceContent::Solid(color),
            calls:   Arc::new(Mutex::new(Vec::new())),
            plan:    Mutex::new(FailurePlan::default()),
            cursor:  None,
        }
    }

    /// A desktop rendering the given shared scene.
    pub fn over_scene(scene: Arc<Mutex<Scene>>) -> Self {
        Self {
            content: SurfaceContent::Scene(scene),
            calls:   Arc::new(Mutex::new(Vec::new())),
            plan:    Mutex::new(FailurePlan::default()),
            cursor:  None,
        }
    }

    /// Fails the next `count` copies with a native block-copy error.
    pub fn fail_next_copies(self, count: u32, transient: bool) -> Self {
        self.fail_copies_after(0, count, transient)
    }

    /// Lets `skip` copies succeed, then fails the following `count`.
    pub fn fail_copies_after(self, skip: u32, count: u32, transient: bool) -> Self {
        *self.plan.lock().unwrap() = FailurePlan {
            skip,
            remaining: count,
            transient,
        };
        self
    }

    /// Reports a visible cursor at the given desktop position.
    pub fn with_cursor(mut self, position: Point) -> Self {
        self.cursor = Some(position);
        self
    }

    /// Shared handle to the recorded copy calls.
    pub fn call_log(&self) -> Arc<Mutex<Vec<CopyCall>>> {
        Arc::clone(&self.calls)
    }
}

impl DesktopSurface for MockSurface {
    fn copy_from_screen(
        &self,
        bounds: &CaptureBounds,
        format: PixelFormat,
    ) -> CaptureResult<Vec<u8>> {
        self.calls.lock().unwrap().push(CopyCall {
            bounds: *bounds,
            format,
        });

        {
            let mut plan = self.plan.lock().unwrap();
            if plan.skip > 0 {
                plan.skip -= 1;
            } else if plan.remaining > 0 {
                plan.remaining -= 1;
                let err = if plan.transient {
                    CaptureError::transient("BitBlt", bounds.width(), bounds.height())
                } else {
                    CaptureError::fatal("GetDC", bounds.width(), bounds.height())
                };
                return Err(err);
            }
        }

        let color = match &self.content {
            SurfaceContent::Solid(color) => *color,
            SurfaceContent::Scene(scene) => scene.lock().unwrap().rendered(),
        };

        let pixel_count = bounds.width() as usize * bounds.height() as usize;
        let mut pixels = Vec::with_capacity(pixel_count * format.bytes_per_pixel());
        for _ in 0..pixel_count {
            pixels.push(color.b);
            pixels.push(color.g);
            pixels.push(color.r);
            if format.has_alpha() {
                pixels.push(255);
            }
        }
        Ok(pixels)
    }

    fn cursor(&self) -> Option<CursorOverlay> {
        self.cursor.map(|position| CursorOverlay {
            pixels: vec![0; 16 * 16 * 4],
            width: 16,
            height: 16,
            hotspot: Point::new(0, 0),
            position,
        })
    }
}

/// Mock display topology returning a fixed monitor layout.
pub struct MockTopology {
    displays: Vec<DisplayInfo>,
}

impl MockTopology {
    pub fn new(bounds: Vec<Rect>) -> Self {
        let displays = bounds
            .into_iter()
            .enumerate()
            .map(|(index, bounds)| DisplayInfo {
                id: index as u64 + 1,
                index,
                bounds,
                primary: index == 0,
            })
            .collect();
        Self { displays }
    }

    pub fn single(bounds: Rect) -> Self {
        Self::new(vec![bounds])
    }
}

impl DisplayTopology for MockTopology {
    fn displays(&self) -> Vec<DisplayInfo> {
        self.displays.clone()
    }
}

/// Observable host lifecycle events, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Register,
    Position(Rect),
    Preview(Rect),
    Background(Color),
    UnregisterThumbnail,
    DestroyWindow,
}

/// Protocol step to fail with a fatal native error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateHost,
    Register,
    SourceSize,
    Position,
    Preview,
    Background,
}

/// Factory for [`MockThumbnailHost`]s sharing one scene and event log.
pub struct MockHostFactory {
    scene:       Arc<Mutex<Scene>>,
    events:      Arc<Mutex<Vec<HostEvent>>>,
    source_size: Size,
    fail:        Option<FailPoint>,
    no_composition: bool,
    hosts:       Arc<Mutex<VecDeque<u32>>>,
}

impl Default for MockHostFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHostFactory {
    pub fn new() -> Self {
        Self {
            scene:       Arc::new(Mutex::new(Scene::default())),
            events:      Arc::new(Mutex::new(Vec::new())),
            source_size: Size::new(800, 600),
            fail:        None,
            no_composition: false,
            hosts:       Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Shared scene handle; give it to [`MockSurface::over_scene`] so the
    /// surface sees background swaps.
    pub fn scene(&self) -> Arc<Mutex<Scene>> {
        Arc::clone(&self.scene)
    }

    /// Shared handle to the recorded host events.
    pub fn events(&self) -> Arc<Mutex<Vec<HostEvent>>> {
        Arc::clone(&self.events)
    }

    /// Reports the given thumbnail source size instead of the default.
    pub fn with_source_size(mut self, size: Size) -> Self {
        self.source_size = size;
        self
    }

    /// Fails the given protocol step with a fatal native error.
    pub fn with_failure(mut self, point: FailPoint) -> Self {
        self.fail = Some(point);
        self
    }

    pub fn fail_register(self) -> Self {
        self.with_failure(FailPoint::Register)
    }

    /// Declines host creation as composition-unavailable.
    pub fn composition_unavailable(mut self) -> Self {
        self.no_composition = true;
        self
    }

    /// Number of hosts created so far.
    pub fn hosts_created(&self) -> usize {
        self.hosts.lock().unwrap().len()
    }
}

impl ThumbnailHostFactory for MockHostFactory {
    type Host = MockThumbnailHost;

    fn create_host(&self) -> CaptureResult<MockThumbnailHost> {
        if self.no_composition {
            return Err(CaptureError::CompositionUnavailable);
        }
        if self.fail == Some(FailPoint::CreateHost) {
            return Err(CaptureError::fatal("CreateWindowExW", 0, 0));
        }

        let mut hosts = self.hosts.lock().unwrap();
        let next = hosts.len() as u32;
        hosts.push_back(next);

        Ok(MockThumbnailHost {
            scene:       Arc::clone(&self.scene),
            events:      Arc::clone(&self.events),
            source_size: self.source_size,
            fail:        self.fail,
            torn_down:   false,
        })
    }
}

/// Mock thumbnail host recording its lifecycle into a shared event log.
pub struct MockThumbnailHost {
    scene:       Arc<Mutex<Scene>>,
    events:      Arc<Mutex<Vec<HostEvent>>>,
    source_size: Size,
    fail:        Option<FailPoint>,
    torn_down:   bool,
}

impl MockThumbnailHost {
    fn push(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn check(&self, point: FailPoint, call: &'static str) -> CaptureResult<()> {
        if self.fail == Some(point) {
            Err(CaptureError::fatal(call, 0, 0))
        } else {
            Ok(())
        }
    }
}

impl ThumbnailHost for MockThumbnailHost {
    fn register(&mut self, _target: &CaptureTarget) -> CaptureResult<()> {
        self.push(HostEvent::Register);
        self.check(FailPoint::Register, "DwmRegisterThumbnail")
    }

    fn source_size(&self) -> CaptureResult<Size> {
        self.check(FailPoint::SourceSize, "DwmQueryThumbnailSourceSize")?;
        Ok(self.source_size)
    }

    fn position(&mut self, rect: &Rect) -> CaptureResult<()> {
        self.push(HostEvent::Position(*rect));
        self.check(FailPoint::Position, "SetWindowPos")
    }

    fn preview(&mut self, dest: &Rect) -> CaptureResult<()> {
        self.push(HostEvent::Preview(*dest));
        self.check(FailPoint::Preview, "DwmUpdateThumbnailProperties")
    }

    fn set_background(&mut self, color: Color) -> CaptureResult<()> {
        self.push(HostEvent::Background(color));
        self.check(FailPoint::Background, "CreateSolidBrush")?;
        self.scene.lock().unwrap().background = color;
        Ok(())
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.push(HostEvent::UnregisterThumbnail);
        self.push(HostEvent::DestroyWindow);
    }
}
