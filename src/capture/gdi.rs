//! GDI implementation of the desktop surface seam
//!
//! One capture is one native sequence: acquire the desktop device context,
//! create a compatible memory DC and a DIB section sized to the request,
//! block-copy with `SRCCOPY | CAPTUREBLT` (the latter picks up layered
//! windows), then copy the DIB rows out into a tightly packed buffer.
//! Every handle is held in an RAII wrapper so the sequence releases its
//! resources on all exit paths, which is what lets the retry policy treat
//! each attempt as independent.

use std::ffi::c_void;
use std::ptr;

use tracing::trace;
use windows_sys::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GdiFlush, GetDC,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, CAPTUREBLT, DIB_RGB_COLORS,
    HBITMAP, HDC, HGDIOBJ, SRCCOPY,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CopyIcon, DestroyIcon, DrawIconEx, GetCursorInfo, GetIconInfo, GetSystemMetrics, CURSORINFO,
    CURSOR_SHOWING, DI_NORMAL, ICONINFO, SM_CXCURSOR, SM_CYCURSOR,
};

use crate::capture::DesktopSurface;
use crate::error::{CaptureError, CaptureResult};
use crate::model::{CaptureBounds, CursorOverlay, PixelFormat, Point};

/// Desktop device context, released on drop.
struct ScreenDc(HDC);

impl ScreenDc {
    fn acquire(width: i32, height: i32) -> CaptureResult<Self> {
        let dc = unsafe { GetDC(ptr::null_mut()) };
        if dc.is_null() {
            return Err(CaptureError::fatal("GetDC", width, height));
        }
        Ok(Self(dc))
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        unsafe { ReleaseDC(ptr::null_mut(), self.0) };
    }
}

/// Memory device context, deleted on drop.
struct MemoryDc(HDC);

impl MemoryDc {
    fn compatible_with(screen: &ScreenDc, width: i32, height: i32) -> CaptureResult<Self> {
        let dc = unsafe { CreateCompatibleDC(screen.0) };
        if dc.is_null() {
            return Err(CaptureError::fatal("CreateCompatibleDC", width, height));
        }
        Ok(Self(dc))
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe { DeleteDC(self.0) };
    }
}

/// Top-down DIB section plus the pointer to its pixel bits.
///
/// The bits stay valid for the bitmap's lifetime; the wrapper ties the two
/// together.
struct DibSection {
    bitmap: HBITMAP,
    bits:   *mut u8,
}

impl DibSection {
    fn create(dc: &MemoryDc, width: i32, height: i32, format: PixelFormat) -> CaptureResult<Self> {
        let mut info: BITMAPINFO = unsafe { std::mem::zeroed() };
        info.bmiHeader = BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            // Negative height selects a top-down DIB, matching buffer order
            biHeight: -height,
            biPlanes: 1,
            biBitCount: (format.bytes_per_pixel() * 8) as u16,
            biCompression: BI_RGB as u32,
            biSizeImage: 0,
            biXPelsPerMeter: 0,
            biYPelsPerMeter: 0,
            biClrUsed: 0,
            biClrImportant: 0,
        };

        let mut bits: *mut c_void = ptr::null_mut();
        let bitmap = unsafe {
            CreateDIBSection(
                dc.0,
                &info,
                DIB_RGB_COLORS,
                &mut bits,
                ptr::null_mut(),
                0,
            )
        };
        if bitmap.is_null() || bits.is_null() {
            return Err(CaptureError::fatal("CreateDIBSection", width, height));
        }
        Ok(Self {
            bitmap,
            bits: bits as *mut u8,
        })
    }
}

impl Drop for DibSection {
    fn drop(&mut self) {
        unsafe { DeleteObject(self.bitmap as HGDIOBJ) };
    }
}

/// Restores the previously selected object on drop.
struct SelectGuard {
    dc:  HDC,
    old: HGDIOBJ,
}

impl SelectGuard {
    fn select(dc: &MemoryDc, object: HGDIOBJ) -> Self {
        let old = unsafe { SelectObject(dc.0, object) };
        Self { dc: dc.0, old }
    }
}

impl Drop for SelectGuard {
    fn drop(&mut self) {
        unsafe { SelectObject(self.dc, self.old) };
    }
}

/// DIB rows are padded to 4-byte boundaries.
fn dib_stride(width: i32, format: PixelFormat) -> usize {
    (width as usize * format.bytes_per_pixel() + 3) & !3
}

/// `BitBlt` leaves the high byte of a 32bpp destination undefined; callers
/// of the surface rely on copied pixels reading as opaque.
fn force_opaque_alpha(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        pixel[3] = 255;
    }
}

/// [`DesktopSurface`] backed by a GDI block copy.
pub struct GdiDesktopSurface;

impl GdiDesktopSurface {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GdiDesktopSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopSurface for GdiDesktopSurface {
    fn copy_from_screen(
        &self,
        bounds: &CaptureBounds,
        format: PixelFormat,
    ) -> CaptureResult<Vec<u8>> {
        let width = bounds.width();
        let height = bounds.height();
        let origin = bounds.origin();
        trace!(width, height, ?format, "gdi block copy");

        let screen = ScreenDc::acquire(width, height)?;
        let memory = MemoryDc::compatible_with(&screen, width, height)?;
        let dib = DibSection::create(&memory, width, height, format)?;
        let _selected = SelectGuard::select(&memory, dib.bitmap as HGDIOBJ);

        let copied = unsafe {
            BitBlt(
                memory.0,
                0,
                0,
                width,
                height,
                screen.0,
                origin.x,
                origin.y,
                SRCCOPY | CAPTUREBLT,
            )
        };
        if copied == 0 {
            // Block copies fail transiently during driver resets and
            // topology changes; the retry policy handles them.
            return Err(CaptureError::transient("BitBlt", width, height));
        }
        unsafe { GdiFlush() };

        let stride = dib_stride(width, format);
        let row_bytes = width as usize * format.bytes_per_pixel();
        let raw = unsafe { std::slice::from_raw_parts(dib.bits, stride * height as usize) };

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in raw.chunks_exact(stride) {
            pixels.extend_from_slice(&row[..row_bytes]);
        }
        if format.has_alpha() {
            force_opaque_alpha(&mut pixels);
        }
        Ok(pixels)
    }

    fn cursor(&self) -> Option<CursorOverlay> {
        unsafe { snapshot_cursor() }
    }
}

/// Draws the current cursor into a private DIB and reads it back.
///
/// Best-effort: any native failure yields `None`, never an error.
unsafe fn snapshot_cursor() -> Option<CursorOverlay> {
    let mut info: CURSORINFO = unsafe { std::mem::zeroed() };
    info.cbSize = std::mem::size_of::<CURSORINFO>() as u32;
    if unsafe { GetCursorInfo(&mut info) } == 0 || info.flags & CURSOR_SHOWING == 0 {
        return None;
    }

    let icon = unsafe { CopyIcon(info.hCursor) };
    if icon.is_null() {
        return None;
    }

    let mut icon_info: ICONINFO = unsafe { std::mem::zeroed() };
    if unsafe { GetIconInfo(icon, &mut icon_info) } == 0 {
        unsafe { DestroyIcon(icon) };
        return None;
    }
    let hotspot = Point::new(icon_info.xHotspot as i32, icon_info.yHotspot as i32);

    let width = unsafe { GetSystemMetrics(SM_CXCURSOR) };
    let height = unsafe { GetSystemMetrics(SM_CYCURSOR) };

    let pixels = (|| -> CaptureResult<Vec<u8>> {
        let screen = ScreenDc::acquire(width, height)?;
        let memory = MemoryDc::compatible_with(&screen, width, height)?;
        let dib = DibSection::create(&memory, width, height, PixelFormat::Bgra32)?;
        let _selected = SelectGuard::select(&memory, dib.bitmap as HGDIOBJ);

        let drawn =
            unsafe { DrawIconEx(memory.0, 0, 0, icon, width, height, 0, ptr::null_mut(), DI_NORMAL) };
        if drawn == 0 {
            return Err(CaptureError::fatal("DrawIconEx", width, height));
        }
        unsafe { GdiFlush() };

        let len = width as usize * height as usize * 4;
        let raw = unsafe { std::slice::from_raw_parts(dib.bits, len) };
        Ok(raw.to_vec())
    })();

    unsafe {
        DeleteObject(icon_info.hbmMask as HGDIOBJ);
        if !icon_info.hbmColor.is_null() {
            DeleteObject(icon_info.hbmColor as HGDIOBJ);
        }
        DestroyIcon(icon);
    }

    pixels.ok().map(|pixels| CursorOverlay {
        pixels,
        width: width as u32,
        height: height as u32,
        hotspot,
        position: Point::new(info.ptScreenPos.x, info.ptScreenPos.y),
    })
}
