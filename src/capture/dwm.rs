//! Windows implementations of the platform seams
//!
//! Three pieces live here:
//!
//! - [`WinDisplayTopology`]: monitor enumeration via `EnumDisplayMonitors`
//! - [`build_capture_target`]: snapshots a window's geometry and
//!   classification flags into a [`CaptureTarget`]
//! - [`DwmThumbnailHost`] / [`DwmHostFactory`]: the DWM thumbnail host
//!   used by the composited capturer
//!
//! The host window is a bare `WS_POPUP` with `WS_EX_TOOLWINDOW`,
//! `WS_EX_TOPMOST` and `WS_EX_NOACTIVATE`: invisible in the taskbar and
//! alt-tab, always above the desktop, and never stealing focus from the
//! window being captured. Each host carries its own background brush as a
//! window property, painted by the shared class wndproc on
//! `WM_ERASEBKGND`, so concurrent captures of different targets never
//! swap each other's backgrounds mid-probe.
//!
//! Raw handles are stored as `isize` so the host stays `Send`; they are
//! cast back at each call site.

use std::ffi::c_void;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::ptr;
use std::sync::OnceLock;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, SIZE, WPARAM};
use windows_sys::Win32::Graphics::Dwm::{
    DwmGetWindowAttribute, DwmIsCompositionEnabled, DwmQueryThumbnailSourceSize,
    DwmRegisterThumbnail, DwmUnregisterThumbnail, DwmUpdateThumbnailProperties,
    DWMWA_EXTENDED_FRAME_BOUNDS, DWM_THUMBNAIL_PROPERTIES, DWM_TNP_OPACITY,
    DWM_TNP_RECTDESTINATION, DWM_TNP_VISIBLE,
};
use windows_sys::Win32::Graphics::Gdi::{
    CreateSolidBrush, DeleteObject, EnumDisplayMonitors, FillRect, GetMonitorInfoW,
    InvalidateRect, UpdateWindow, HBRUSH, HDC, HGDIOBJ, HMONITOR, MONITORINFO,
    MONITORINFOF_PRIMARY,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY_LOCAL_MACHINE,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetClassNameW, GetClientRect, GetPropW,
    GetSystemMetrics, GetWindowLongPtrW, GetWindowRect, GetWindowTextW, IsZoomed,
    RegisterClassExW, RemovePropW, SetPropW, SetWindowPos, ShowWindow, GWL_EXSTYLE,
    HWND_TOPMOST, SM_CXSIZEFRAME, SM_CYSIZEFRAME, SWP_NOACTIVATE, SW_SHOWNOACTIVATE,
    WM_ERASEBKGND, WNDCLASSEXW, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};

use crate::capture::{ThumbnailHost, ThumbnailHostFactory};
use crate::error::{CaptureError, CaptureResult};
use crate::model::{CaptureTarget, Color, DisplayInfo, Rect, Size};

/// First Windows 8 build. Earlier systems report maximized windows in
/// client-area coordinates and need the size-frame border compensated.
const WIN8_BUILD: u32 = 9200;

/// Window classes whose windows belong to the shell or to metro-style
/// apps, where foreground activation during capture is unsafe.
const SHELL_CLASSES: &[&str] = &[
    "Windows.UI.Core.CoreWindow",
    "ApplicationFrameWindow",
    "Shell_TrayWnd",
    "Progman",
];

/// Reads the Windows build number from
/// `HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\CurrentBuildNumber`.
///
/// Returns 0 if it cannot be read.
pub fn get_windows_build() -> u32 {
    unsafe {
        let mut key_handle = ptr::null_mut();
        let key_name = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\0"
            .encode_utf16()
            .collect::<Vec<_>>();

        let open_result = RegOpenKeyExW(
            HKEY_LOCAL_MACHINE as *mut _,
            key_name.as_ptr(),
            0,
            0x20001, // KEY_READ
            &mut key_handle,
        );
        if open_result != 0 {
            debug!("failed to open registry key for Windows version");
            return 0;
        }

        let value_name = "CurrentBuildNumber\0".encode_utf16().collect::<Vec<_>>();
        let mut buffer: Vec<u16> = vec![0; 260];
        let mut buffer_size = (buffer.len() as u32) * 2; // size in bytes

        let query_result = RegQueryValueExW(
            key_handle,
            value_name.as_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            buffer.as_mut_ptr() as *mut u8,
            &mut buffer_size,
        );
        RegCloseKey(key_handle);

        if query_result != 0 {
            debug!("failed to query CurrentBuildNumber registry value");
            return 0;
        }

        let actual_len = (buffer_size as usize / 2).saturating_sub(1);
        let build_str = OsString::from_wide(&buffer[..actual_len])
            .to_string_lossy()
            .to_string();
        build_str.trim().parse::<u32>().unwrap_or(0)
    }
}

/// Monitor enumeration through `EnumDisplayMonitors`.
pub struct WinDisplayTopology;

impl WinDisplayTopology {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WinDisplayTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::capture::topology::DisplayTopology for WinDisplayTopology {
    fn displays(&self) -> Vec<DisplayInfo> {
        unsafe extern "system" fn enum_callback(
            monitor: HMONITOR,
            _dc: HDC,
            _rect: *mut RECT,
            lparam: LPARAM,
        ) -> i32 {
            let displays = unsafe { &mut *(lparam as *mut Vec<DisplayInfo>) };

            let mut info: MONITORINFO = unsafe { std::mem::zeroed() };
            info.cbSize = std::mem::size_of::<MONITORINFO>() as u32;
            if unsafe { GetMonitorInfoW(monitor, &mut info) } != 0 {
                displays.push(DisplayInfo {
                    id:      monitor as u64,
                    index:   displays.len(),
                    bounds:  rect_from_native(&info.rcMonitor),
                    primary: info.dwFlags & MONITORINFOF_PRIMARY != 0,
                });
            }
            1 // continue enumeration
        }

        let mut displays: Vec<DisplayInfo> = Vec::new();
        unsafe {
            EnumDisplayMonitors(
                ptr::null_mut(),
                ptr::null(),
                Some(enum_callback),
                &mut displays as *mut Vec<DisplayInfo> as LPARAM,
            );
        }
        debug!(count = displays.len(), "enumerated displays");
        displays
    }
}

fn rect_from_native(rect: &RECT) -> Rect {
    Rect::new(
        rect.left,
        rect.top,
        rect.right - rect.left,
        rect.bottom - rect.top,
    )
}

fn rect_to_native(rect: &Rect) -> RECT {
    RECT {
        left:   rect.x,
        top:    rect.y,
        right:  rect.right(),
        bottom: rect.bottom(),
    }
}

/// Snapshots a window's geometry and classification into a
/// [`CaptureTarget`].
///
/// Geometry comes from the DWM extended frame bounds (the visible frame,
/// without the invisible resize borders), falling back to `GetWindowRect`
/// when the attribute query fails. The border compensation size is filled
/// in only for maximized windows on pre-Windows 8 builds.
pub fn build_capture_target(handle: isize) -> CaptureResult<CaptureTarget> {
    let hwnd = handle as HWND;
    unsafe {
        let mut native: RECT = std::mem::zeroed();
        let hr = DwmGetWindowAttribute(
            hwnd,
            DWMWA_EXTENDED_FRAME_BOUNDS as u32,
            &mut native as *mut RECT as *mut c_void,
            std::mem::size_of::<RECT>() as u32,
        );
        if hr != 0 && GetWindowRect(hwnd, &mut native) == 0 {
            return Err(CaptureError::fatal("GetWindowRect", 0, 0));
        }
        let window_rect = rect_from_native(&native);

        let mut title_buf = [0u16; 512];
        let title_len = GetWindowTextW(hwnd, title_buf.as_mut_ptr(), title_buf.len() as i32);
        let title = String::from_utf16_lossy(&title_buf[..title_len.max(0) as usize]);

        let mut class_buf = [0u16; 256];
        let class_len = GetClassNameW(hwnd, class_buf.as_mut_ptr(), class_buf.len() as i32);
        let class = String::from_utf16_lossy(&class_buf[..class_len.max(0) as usize]);

        let maximized = IsZoomed(hwnd) != 0;
        let exstyle = GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32;

        let border = if maximized && get_windows_build() < WIN8_BUILD {
            Size::new(
                GetSystemMetrics(SM_CXSIZEFRAME),
                GetSystemMetrics(SM_CYSIZEFRAME),
            )
        } else {
            Size::default()
        };

        Ok(CaptureTarget {
            handle,
            title,
            window_rect,
            maximized,
            tool_window: exstyle & WS_EX_TOOLWINDOW != 0,
            shell_app: SHELL_CLASSES.contains(&class.as_str()),
            border,
        })
    }
}

/// Name of the window property holding a host's background brush.
fn brush_prop_name() -> *const u16 {
    static NAME: OnceLock<Vec<u16>> = OnceLock::new();
    NAME.get_or_init(|| "DesktopCaptureHostBrush\0".encode_utf16().collect())
        .as_ptr()
}

/// Class wndproc for thumbnail host windows.
///
/// Erases the background with the brush stored on the window itself, not
/// on the class, keeping concurrent hosts independent.
unsafe extern "system" fn host_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_ERASEBKGND {
        let brush = unsafe { GetPropW(hwnd, brush_prop_name()) };
        if !brush.is_null() {
            let mut client: RECT = unsafe { std::mem::zeroed() };
            unsafe {
                GetClientRect(hwnd, &mut client);
                FillRect(wparam as HDC, &client, brush as HBRUSH);
            }
            return 1;
        }
    }
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

fn host_class_atom() -> u16 {
    static ATOM: OnceLock<u16> = OnceLock::new();
    *ATOM.get_or_init(|| unsafe {
        let class_name = "DesktopCaptureThumbnailHost\0"
            .encode_utf16()
            .collect::<Vec<_>>();
        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: 0,
            lpfnWndProc: Some(host_window_proc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: GetModuleHandleW(ptr::null()),
            hIcon: ptr::null_mut(),
            hCursor: ptr::null_mut(),
            // Backgrounds are per-window properties, not a class brush
            hbrBackground: ptr::null_mut(),
            lpszMenuName: ptr::null(),
            lpszClassName: class_name.as_ptr(),
            hIconSm: ptr::null_mut(),
        };
        RegisterClassExW(&class)
    })
}

fn colorref(color: Color) -> u32 {
    color.r as u32 | (color.g as u32) << 8 | (color.b as u32) << 16
}

/// DWM thumbnail host: one borderless window plus one thumbnail binding.
///
/// Handles are `isize` copies of the raw values; `0`/`None` mean
/// not-yet-created. [`teardown`](ThumbnailHost::teardown) releases the
/// thumbnail before the window and is idempotent; `Drop` is a backstop for
/// paths that never reach the capturer's guard.
pub struct DwmThumbnailHost {
    hwnd:      isize,
    thumbnail: Option<isize>,
    brush:     isize,
}

impl DwmThumbnailHost {
    fn new() -> Self {
        Self {
            hwnd:      0,
            thumbnail: None,
            brush:     0,
        }
    }

    fn create_window(&mut self) -> CaptureResult<()> {
        let atom = host_class_atom();
        if atom == 0 {
            return Err(CaptureError::fatal("RegisterClassExW", 0, 0));
        }

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW | WS_EX_TOPMOST | WS_EX_NOACTIVATE,
                atom as usize as *const u16,
                ptr::null(),
                WS_POPUP,
                0,
                0,
                0,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                GetModuleHandleW(ptr::null()),
                ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(CaptureError::fatal("CreateWindowExW", 0, 0));
        }
        self.hwnd = hwnd as isize;
        Ok(())
    }
}

impl ThumbnailHost for DwmThumbnailHost {
    fn register(&mut self, target: &CaptureTarget) -> CaptureResult<()> {
        self.create_window()?;

        let mut thumbnail: isize = 0;
        let hr = unsafe {
            DwmRegisterThumbnail(
                self.hwnd as HWND,
                target.handle as HWND,
                &mut thumbnail as *mut isize as *mut _,
            )
        };
        if hr != 0 {
            return Err(CaptureError::fatal("DwmRegisterThumbnail", 0, 0));
        }
        self.thumbnail = Some(thumbnail);
        Ok(())
    }

    fn source_size(&self) -> CaptureResult<Size> {
        let thumbnail = self
            .thumbnail
            .ok_or(CaptureError::fatal("DwmQueryThumbnailSourceSize", 0, 0))?;

        let mut size = SIZE { cx: 0, cy: 0 };
        let hr = unsafe { DwmQueryThumbnailSourceSize(thumbnail as _, &mut size) };
        if hr != 0 {
            return Err(CaptureError::fatal("DwmQueryThumbnailSourceSize", 0, 0));
        }
        Ok(Size::new(size.cx, size.cy))
    }

    fn position(&mut self, rect: &Rect) -> CaptureResult<()> {
        let moved = unsafe {
            SetWindowPos(
                self.hwnd as HWND,
                HWND_TOPMOST,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                SWP_NOACTIVATE,
            )
        };
        if moved == 0 {
            return Err(CaptureError::fatal("SetWindowPos", rect.width, rect.height));
        }
        Ok(())
    }

    fn preview(&mut self, dest: &Rect) -> CaptureResult<()> {
        let thumbnail = self
            .thumbnail
            .ok_or(CaptureError::fatal("DwmUpdateThumbnailProperties", 0, 0))?;

        let mut properties: DWM_THUMBNAIL_PROPERTIES = unsafe { std::mem::zeroed() };
        properties.dwFlags = DWM_TNP_RECTDESTINATION | DWM_TNP_VISIBLE | DWM_TNP_OPACITY;
        properties.rcDestination = rect_to_native(dest);
        properties.opacity = 255;
        properties.fVisible = 1;

        let hr = unsafe { DwmUpdateThumbnailProperties(thumbnail as _, &properties) };
        if hr != 0 {
            return Err(CaptureError::fatal(
                "DwmUpdateThumbnailProperties",
                dest.width,
                dest.height,
            ));
        }

        unsafe {
            ShowWindow(self.hwnd as HWND, SW_SHOWNOACTIVATE);
            UpdateWindow(self.hwnd as HWND);
        }
        Ok(())
    }

    fn set_background(&mut self, color: Color) -> CaptureResult<()> {
        let brush = unsafe { CreateSolidBrush(colorref(color)) };
        if brush.is_null() {
            return Err(CaptureError::fatal("CreateSolidBrush", 0, 0));
        }

        unsafe {
            SetPropW(self.hwnd as HWND, brush_prop_name(), brush as _);
            if self.brush != 0 {
                DeleteObject(self.brush as HGDIOBJ);
            }
            InvalidateRect(self.hwnd as HWND, ptr::null(), 1);
            UpdateWindow(self.hwnd as HWND);
        }
        self.brush = brush as isize;
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(thumbnail) = self.thumbnail.take() {
            let hr = unsafe { DwmUnregisterThumbnail(thumbnail as _) };
            if hr != 0 {
                warn!("failed to unregister DWM thumbnail");
            }
        }
        if self.hwnd != 0 {
            unsafe {
                RemovePropW(self.hwnd as HWND, brush_prop_name());
                DestroyWindow(self.hwnd as HWND);
            }
            self.hwnd = 0;
        }
        if self.brush != 0 {
            unsafe { DeleteObject(self.brush as HGDIOBJ) };
            self.brush = 0;
        }
    }
}

impl Drop for DwmThumbnailHost {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Creates [`DwmThumbnailHost`]s, declining when desktop composition is
/// off.
pub struct DwmHostFactory;

impl DwmHostFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DwmHostFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailHostFactory for DwmHostFactory {
    type Host = DwmThumbnailHost;

    fn create_host(&self) -> CaptureResult<DwmThumbnailHost> {
        let mut enabled: i32 = 0;
        let hr = unsafe { DwmIsCompositionEnabled(&mut enabled) };
        if hr != 0 || enabled == 0 {
            return Err(CaptureError::CompositionUnavailable);
        }
        Ok(DwmThumbnailHost::new())
    }
}
