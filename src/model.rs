//! Data models for the capture engine
//!
//! This module defines the value types shared by all capture components:
//!
//! - Geometry primitives (`Point`, `Size`, `Rect`) in desktop coordinates
//! - `CaptureBounds`: a normalized capture rectangle request
//! - `DisplayInfo`: an immutable description of one physical display
//! - `Capture`: an owned pixel buffer produced by a capturer
//! - `CaptureTarget`: a window handle plus the cached geometry and
//!   classification flags capturers need, passed explicitly instead of
//!   re-queried deep inside capture code
//! - `CaptureConfig`: injected capture behavior (background color,
//!   transparency probing, corner masking, retry budget)

use serde::{Deserialize, Serialize};

/// A point in desktop (virtual screen) coordinates.
///
/// Desktop coordinates can be negative: secondary monitors placed left of
/// or above the primary monitor have negative origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width:  i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// An axis-aligned rectangle in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x:      i32,
    pub y:      i32,
    pub width:  i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Returns the overlapping rectangle, or `None` when the rectangles are
    /// disjoint or either is empty.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Smallest rectangle containing both inputs.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Grows the rectangle outward by the given border on every side.
    pub fn inflate(&self, border: Size) -> Rect {
        Rect::new(
            self.x - border.width,
            self.y - border.height,
            self.width + 2 * border.width,
            self.height + 2 * border.height,
        )
    }
}

/// A normalized capture rectangle request.
///
/// Some callers pass "drag" rectangles with inverted corners (the user
/// dragged up/left), producing negative widths or heights. `CaptureBounds`
/// normalizes on construction by flipping the origin, so capturers can
/// assume non-negative extents.
///
/// Note that a zero-area request is still representable; capturers treat it
/// as a declined no-op rather than an error.
///
/// # Examples
///
/// ```
/// use desktop_capture::model::{CaptureBounds, Point};
///
/// // Inverted drag from (100,100) to (10,10)
/// let bounds = CaptureBounds::from_corners(Point::new(100, 100), Point::new(10, 10));
/// assert_eq!(bounds.origin(), Point::new(10, 10));
/// assert_eq!((bounds.width(), bounds.height()), (90, 90));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureBounds {
    rect: Rect,
}

impl CaptureBounds {
    /// Creates bounds from an origin and (possibly negative) extents,
    /// flipping the origin to normalize.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        let (x, width) = if width < 0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0 { (y + height, -height) } else { (y, height) };
        Self {
            rect: Rect::new(x, y, width, height),
        }
    }

    /// Creates bounds from two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x, a.y, b.x - a.x, b.y - a.y)
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn origin(&self) -> Point {
        self.rect.origin()
    }

    pub fn width(&self) -> i32 {
        self.rect.width
    }

    pub fn height(&self) -> i32 {
        self.rect.height
    }

    /// True when the request covers no pixels and should be declined.
    pub fn is_degenerate(&self) -> bool {
        self.rect.is_empty()
    }
}

/// Immutable description of one physical display.
///
/// `id` is the platform monitor handle (or a synthetic id in tests) and
/// `index` the ordinal position in the enumeration that produced it. The
/// display set can change between captures, so `DisplayInfo` values are
/// re-queried per capture and never cached across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Platform monitor handle value.
    pub id:      u64,
    /// Ordinal index within the enumeration.
    pub index:   usize,
    /// Monitor bounds in desktop coordinates.
    pub bounds:  Rect,
    /// Whether this is the primary display.
    pub primary: bool,
}

/// Pixel layout of a [`Capture`] buffer.
///
/// Rows are tightly packed (stride = width * bytes per pixel); any native
/// DIB row padding is stripped when the buffer is copied out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 24-bit BGR, no alpha channel.
    Bgr24,
    /// 32-bit BGRA with straight (non-premultiplied) alpha.
    Bgra32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgr24 => 3,
            PixelFormat::Bgra32 => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::Bgra32)
    }
}

/// An RGB color, used for host window backgrounds and probe passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Cursor overlay data captured alongside the pixels.
///
/// The cursor is not composited into the capture buffer; it is carried
/// separately so later pipeline stages can draw or discard it.
#[derive(Debug, Clone)]
pub struct CursorOverlay {
    /// BGRA cursor image.
    pub pixels:   Vec<u8>,
    pub width:    u32,
    pub height:   u32,
    /// Hotspot offset within the cursor image.
    pub hotspot:  Point,
    /// Cursor position in desktop coordinates at capture time.
    pub position: Point,
}

/// An owned in-memory pixel buffer produced by a capturer.
///
/// Exactly one owner at a time; `Capture` is `Send` but deliberately not
/// shared between threads without external synchronization. Later pipeline
/// stages (cursor compositing, effects) mutate it in place.
#[derive(Debug, Clone)]
pub struct Capture {
    pixels: Vec<u8>,
    width:  u32,
    height: u32,
    format: PixelFormat,
    /// Top-left corner in desktop coordinates.
    pub origin: Point,
    /// Optional cursor overlay recorded at capture time.
    pub cursor: Option<CursorOverlay>,
}

impl Capture {
    /// Wraps a tightly packed pixel buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer length does not match `width * height * bpp`;
    /// capturers construct buffers of exactly that size.
    pub fn from_pixels(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        origin: Point,
    ) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
            "pixel buffer length mismatch"
        );
        Self {
            pixels,
            width,
            height,
            format,
            origin,
            cursor: None,
        }
    }

    /// Creates a capture filled with a solid opaque color.
    pub fn solid(width: u32, height: u32, format: PixelFormat, color: Color) -> Self {
        let bpp = format.bytes_per_pixel();
        let mut pixels = Vec::with_capacity(width as usize * height as usize * bpp);
        for _ in 0..(width as usize * height as usize) {
            pixels.push(color.b);
            pixels.push(color.g);
            pixels.push(color.r);
            if format.has_alpha() {
                pixels.push(255);
            }
        }
        Self::from_pixels(pixels, width, height, format, Point::default())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row (rows are tightly packed).
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consumes the capture, returning the raw buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel()
    }

    /// Reads one pixel as (b, g, r, a); alpha reads 255 for `Bgr24`.
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let i = self.offset(x, y);
        let p = &self.pixels[i..i + self.format.bytes_per_pixel()];
        let a = if self.format.has_alpha() { p[3] } else { 255 };
        (p[0], p[1], p[2], a)
    }

    /// Writes one pixel from (b, g, r, a); alpha is ignored for `Bgr24`.
    pub fn set_pixel(&mut self, x: u32, y: u32, bgra: (u8, u8, u8, u8)) {
        let i = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel();
        let p = &mut self.pixels[i..i + bpp];
        p[0] = bgra.0;
        p[1] = bgra.1;
        p[2] = bgra.2;
        if bpp == 4 {
            p[3] = bgra.3;
        }
    }

    /// Converts the buffer to `Bgra32` in place, setting full alpha.
    ///
    /// No-op when the capture already carries an alpha channel. Corner
    /// masking and offscreen padding call this before clearing pixels.
    pub fn promote_to_alpha(&mut self) {
        if self.format.has_alpha() {
            return;
        }

        let mut promoted = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for chunk in self.pixels.chunks_exact(3) {
            promoted.extend_from_slice(chunk);
            promoted.push(255);
        }
        self.pixels = promoted;
        self.format = PixelFormat::Bgra32;
    }

    /// Fills a rectangle (in buffer-local coordinates) with fully
    /// transparent pixels. The rectangle is clamped to the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer has no alpha channel; callers promote first.
    pub fn fill_transparent(&mut self, rect: Rect) {
        assert!(
            self.format.has_alpha(),
            "fill_transparent requires an alpha-capable buffer"
        );

        let x0 = rect.x.max(0) as u32;
        let y0 = rect.y.max(0) as u32;
        let x1 = (rect.right().max(0) as u32).min(self.width);
        let y1 = (rect.bottom().max(0) as u32).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                self.set_pixel(x, y, (0, 0, 0, 0));
            }
        }
    }

    /// Converts to an `image::RgbaImage` for downstream pipelines.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let (b, g, r, a) = self.pixel(x, y);
                out.put_pixel(x, y, image::Rgba([r, g, b, a]));
            }
        }
        out
    }
}

/// The window a composited capture is aimed at.
///
/// A capture target is built once by the platform layer (handle plus cached
/// geometry and classification flags) and passed explicitly into capturers,
/// so capture code never re-queries window state mid-protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    /// Platform window handle value.
    pub handle:      isize,
    /// Window title at build time, for diagnostics only.
    pub title:       String,
    /// Screen rectangle of the window (extended frame bounds).
    pub window_rect: Rect,
    /// Whether the window is maximized.
    pub maximized:   bool,
    /// Whether the window is a tool window (skips corner masking).
    pub tool_window: bool,
    /// Whether the window belongs to the platform shell / a metro-style
    /// app, where foreground activation is unsafe.
    pub shell_app:   bool,
    /// Non-client border size to compensate for when the window is
    /// maximized on systems that report client-area coordinates. Zero on
    /// systems that need no compensation.
    pub border:      Size,
}

impl CaptureTarget {
    pub fn new(handle: isize, window_rect: Rect) -> Self {
        Self {
            handle,
            title: String::new(),
            window_rect,
            maximized: false,
            tool_window: false,
            shell_app: false,
            border: Size::default(),
        }
    }

    /// The screen rectangle the host window should occupy: the window's
    /// true location, expanded by the non-client border when a maximized
    /// window reports client coordinates.
    pub fn host_rect(&self) -> Rect {
        if self.maximized && !self.border.is_empty() {
            self.window_rect.inflate(self.border)
        } else {
            self.window_rect
        }
    }
}

/// Default per-row corner mask, outermost row first: row 0 clears 5 pixels
/// from each side, row 1 clears 3, and so on. Applied symmetrically to all
/// four corners.
pub const DEFAULT_CORNER_MASK: [u32; 5] = [5, 3, 2, 1, 1];

fn default_corner_mask() -> Vec<u32> {
    DEFAULT_CORNER_MASK.to_vec()
}

fn default_probe_delay() -> u64 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_background() -> Color {
    Color::WHITE
}

/// Injected capture behavior.
///
/// Passed into capturers at construction instead of read from global
/// configuration, so tests can inject exact settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Background color for the non-transparent composited pass.
    #[serde(default = "default_background")]
    pub background: Color,
    /// Recover true per-pixel alpha with the two-pass white/black probe.
    #[serde(default)]
    pub transparent_background: bool,
    /// Clear compositor-drawn rounded corners from composited captures.
    #[serde(default)]
    pub mask_corners: bool,
    /// Per-row pixel counts for the corner mask, outermost row first.
    #[serde(default = "default_corner_mask")]
    pub corner_mask: Vec<u32>,
    /// Delay waited after a background swap for the compositor to redraw,
    /// in milliseconds.
    #[serde(default = "default_probe_delay")]
    pub probe_frame_delay_ms: u64,
    /// Attempt budget for transient native graphics failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Record the cursor overlay alongside captures.
    #[serde(default)]
    pub include_cursor: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            transparent_background: false,
            mask_corners: false,
            corner_mask: default_corner_mask(),
            probe_frame_delay_ms: default_probe_delay(),
            max_retries: default_max_retries(),
            include_cursor: false,
        }
    }
}
