// src/server/connection.rs

//! `XServer` implementation over Xlib.
//!
//! All FFI lives in this file. Every reply is copied into the plain-data
//! records from `crate::server` and the Xlib allocation is freed before the
//! method returns, so nothing here hands raw pointers to callers.

use anyhow::{anyhow, Result};
use libc::{c_int, c_long, c_uchar, c_ulong};
use log::{debug, info, trace, warn};
use std::ffi::{c_void, CString};
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};

use x11::{xf86vmode, xinerama, xlib, xrandr};

use super::{
    ExtensionName, ExtensionVersion, OutputConnection, PixmapFormat, PropertyReply,
    RandrCrtcInfo, RandrModeInfo, RandrOutputInfo, RandrResources, ScreenGeometry, VidModeLine,
    VisualInfo, XServer, XineramaScreen, Xid,
};

/// RandR version this client speaks. Sent to the server on version queries.
const RANDR_CLIENT_VERSION: (c_int, c_int) = (1, 3);

const RR_CONNECTED: u16 = 0;
const RR_DISCONNECTED: u16 = 1;

/// Set by `trap_error` while an `ErrorGuard` is active.
static ERROR_TRAPPED: AtomicBool = AtomicBool::new(false);

unsafe extern "C" fn trap_error(_display: *mut xlib::Display, event: *mut xlib::XErrorEvent) -> c_int {
    if !event.is_null() {
        // SAFETY: Xlib passes a valid event for the duration of the callback.
        let event = &*event;
        debug!(
            "Trapped X error: code {}, request {}.{}",
            event.error_code, event.request_code, event.minor_code
        );
    }
    ERROR_TRAPPED.store(true, Ordering::SeqCst);
    0
}

/// Owns the `*mut xlib::Display` and closes it on drop.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    /// Calls `XOpenDisplay`. `None` uses the `DISPLAY` environment variable.
    fn open(name: Option<&str>) -> Result<Self> {
        let name = name.map(CString::new).transpose()?;
        let name_ptr = name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
        // SAFETY: `name_ptr` is either null or a NUL-terminated string that
        // outlives the call.
        let display_ptr = unsafe { xlib::XOpenDisplay(name_ptr) };
        if display_ptr.is_null() {
            Err(anyhow!(
                "Failed to open X display. Check DISPLAY environment variable or X server status."
            ))
        } else {
            debug!("X display opened: {:p}", display_ptr);
            Ok(Self { ptr: display_ptr })
        }
    }

    #[inline]
    fn raw(&self) -> *mut xlib::Display {
        self.ptr
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            info!("Closing X11 display connection: {:p}", self.ptr);
            // SAFETY: the pointer came from XOpenDisplay and is closed once.
            let status = unsafe { xlib::XCloseDisplay(self.ptr) };
            if status != 0 {
                warn!("XCloseDisplay returned non-zero status: {}", status);
            }
        }
    }
}

/// A live connection to an X server, speaking Xlib.
///
/// The connection is closed when this value is dropped. It is neither `Send`
/// nor `Sync`; Xlib calls are issued from the thread that opened it.
#[derive(Debug)]
pub struct XlibConnection {
    display: ManagedDisplay,
}

impl XlibConnection {
    /// Connects to the server named by `DISPLAY`.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` if the display is opened.
    /// * `Err(anyhow::Error)` if `XOpenDisplay` returns null.
    pub fn new() -> Result<Self> {
        Self::open(None)
    }

    /// Connects to a named display such as `":1"`. `None` falls back to the
    /// `DISPLAY` environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` if the display is opened.
    /// * `Err(anyhow::Error)` if the name contains a NUL byte or
    ///   `XOpenDisplay` returns null.
    pub fn open(name: Option<&str>) -> Result<Self> {
        info!("Establishing X11 server connection.");
        let display = ManagedDisplay::open(name)?;
        Ok(Self { display })
    }

    #[inline]
    fn dpy(&self) -> *mut xlib::Display {
        self.display.raw()
    }

    /// A resources record carrying only the config timestamp, which is all
    /// `XRRGetOutputInfo`, `XRRGetCrtcInfo` and `XRRSetCrtcConfig` read.
    fn resources_stub(config_timestamp: u64) -> xrandr::XRRScreenResources {
        xrandr::XRRScreenResources {
            timestamp: 0,
            configTimestamp: config_timestamp as xlib::Time,
            ncrtc: 0,
            crtcs: ptr::null_mut(),
            noutput: 0,
            outputs: ptr::null_mut(),
            nmode: 0,
            modes: ptr::null_mut(),
        }
    }

    /// Copies `len` items out of an Xlib array. Null or empty yields `[]`.
    unsafe fn copy_array<T: Copy, U>(data: *const T, len: c_int, map: impl Fn(T) -> U) -> Vec<U> {
        if data.is_null() || len <= 0 {
            return Vec::new();
        }
        slice::from_raw_parts(data, len as usize)
            .iter()
            .map(|&v| map(v))
            .collect()
    }

    unsafe fn lossy_string(data: *const libc::c_char, len: usize) -> String {
        if data.is_null() || len == 0 {
            return String::new();
        }
        String::from_utf8_lossy(slice::from_raw_parts(data as *const u8, len)).into_owned()
    }

    /// Converts and frees the out-parameters of a property fetch.
    unsafe fn property_reply(
        type_atom: xlib::Atom,
        format: c_int,
        nitems: c_ulong,
        data: *mut c_uchar,
    ) -> Option<PropertyReply> {
        if data.is_null() {
            return None;
        }
        let len = nitems as usize;
        let mut reply = PropertyReply {
            type_atom: type_atom as Xid,
            format: format as i32,
            bytes: Vec::new(),
            longs: Vec::new(),
        };
        match format {
            8 => reply.bytes = slice::from_raw_parts(data, len).to_vec(),
            // Xlib widens 32-bit property items to C longs.
            32 => {
                reply.longs = slice::from_raw_parts(data as *const c_long, len)
                    .iter()
                    .map(|&v| v as i64)
                    .collect()
            }
            _ => {}
        }
        xlib::XFree(data as *mut c_void);
        Some(reply)
    }

    fn vidmode_line(info: &xf86vmode::XF86VidModeModeInfo) -> VidModeLine {
        VidModeLine {
            dot_clock: info.dotclock as u32,
            h_display: info.hdisplay as u16,
            h_sync_start: info.hsyncstart as u16,
            h_sync_end: info.hsyncend as u16,
            h_total: info.htotal as u16,
            h_skew: info.hskew as u16,
            v_display: info.vdisplay as u16,
            v_sync_start: info.vsyncstart as u16,
            v_sync_end: info.vsyncend as u16,
            v_total: info.vtotal as u16,
            flags: info.flags as u32,
        }
    }
}

impl XServer for XlibConnection {
    type ErrorHandler = Option<unsafe extern "C" fn(*mut xlib::Display, *mut xlib::XErrorEvent) -> std::os::raw::c_int>;

    fn screen_count(&self) -> i32 {
        // SAFETY: valid display for the lifetime of `self`.
        unsafe { xlib::XScreenCount(self.dpy()) }
    }

    fn default_screen(&self) -> i32 {
        unsafe { xlib::XDefaultScreen(self.dpy()) }
    }

    fn root_window(&self, screen: i32) -> Xid {
        unsafe { xlib::XRootWindow(self.dpy(), screen) as Xid }
    }

    fn screen_geometry(&self, screen: i32) -> ScreenGeometry {
        let dpy = self.dpy();
        // SAFETY: `screen` comes from `0..screen_count()`.
        unsafe {
            ScreenGeometry {
                width_px: xlib::XDisplayWidth(dpy, screen),
                height_px: xlib::XDisplayHeight(dpy, screen),
                width_mm: xlib::XDisplayWidthMM(dpy, screen),
                height_mm: xlib::XDisplayHeightMM(dpy, screen),
            }
        }
    }

    fn default_visual(&self, screen: i32) -> Option<VisualInfo> {
        let dpy = self.dpy();
        // SAFETY: the visual is owned by the display and only read here.
        unsafe {
            let visual = xlib::XDefaultVisual(dpy, screen);
            if visual.is_null() {
                return None;
            }
            let visual = &*visual;
            Some(VisualInfo {
                visual_id: visual.visualid as Xid,
                depth: xlib::XDefaultDepth(dpy, screen),
                red_mask: visual.red_mask as u64,
                green_mask: visual.green_mask as u64,
                blue_mask: visual.blue_mask as u64,
            })
        }
    }

    fn pixmap_formats(&self) -> Vec<PixmapFormat> {
        let mut count: c_int = 0;
        // SAFETY: the returned array holds `count` entries and is freed below.
        unsafe {
            let formats = xlib::XListPixmapFormats(self.dpy(), &mut count);
            let list = Self::copy_array(formats, count, |f| PixmapFormat {
                depth: f.depth,
                bits_per_pixel: f.bits_per_pixel,
                scanline_pad: f.scanline_pad,
            });
            if !formats.is_null() {
                xlib::XFree(formats as *mut c_void);
            }
            list
        }
    }

    fn intern_atom(&self, name: &str, only_if_exists: bool) -> Xid {
        let Ok(name) = CString::new(name) else {
            warn!("Atom name {:?} contains a NUL byte", name);
            return 0;
        };
        // SAFETY: `name` is NUL-terminated and outlives the call.
        unsafe {
            xlib::XInternAtom(
                self.dpy(),
                name.as_ptr(),
                if only_if_exists { xlib::True } else { xlib::False },
            ) as Xid
        }
    }

    fn sync(&self) {
        unsafe {
            xlib::XSync(self.dpy(), xlib::False);
        }
    }

    fn window_property(&self, window: Xid, property: Xid, max_words: i64) -> Option<PropertyReply> {
        let mut type_atom: xlib::Atom = 0;
        let mut format: c_int = 0;
        let mut nitems: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();
        // SAFETY: all out-parameters point at locals; `data` is freed in
        // `property_reply`.
        unsafe {
            let status = xlib::XGetWindowProperty(
                self.dpy(),
                window as xlib::Window,
                property as xlib::Atom,
                0,
                max_words as c_long,
                xlib::False,
                xlib::AnyPropertyType as xlib::Atom,
                &mut type_atom,
                &mut format,
                &mut nitems,
                &mut bytes_after,
                &mut data,
            );
            if status != xlib::Success as c_int {
                trace!("XGetWindowProperty failed with status {}", status);
                if !data.is_null() {
                    xlib::XFree(data as *mut c_void);
                }
                return None;
            }
            Self::property_reply(type_atom, format, nitems, data)
        }
    }

    fn install_error_trap(&self) -> Self::ErrorHandler {
        ERROR_TRAPPED.store(false, Ordering::SeqCst);
        // SAFETY: `trap_error` matches the Xlib handler signature and never
        // calls back into Xlib.
        unsafe { xlib::XSetErrorHandler(Some(trap_error)) }
    }

    fn restore_error_handler(&self, previous: Self::ErrorHandler) {
        unsafe {
            xlib::XSetErrorHandler(previous);
        }
    }

    fn trapped_error(&self) -> bool {
        ERROR_TRAPPED.load(Ordering::SeqCst)
    }

    fn query_extension(&self, extension: ExtensionName) -> Option<ExtensionVersion> {
        let dpy = self.dpy();
        let mut event_base: c_int = 0;
        let mut error_base: c_int = 0;
        let mut major: c_int = 0;
        let mut minor: c_int = 0;
        // SAFETY: plain out-parameter queries against a valid display.
        let ok = unsafe {
            match extension {
                ExtensionName::RandR => {
                    (major, minor) = RANDR_CLIENT_VERSION;
                    xrandr::XRRQueryExtension(dpy, &mut event_base, &mut error_base) != 0
                        && xrandr::XRRQueryVersion(dpy, &mut major, &mut minor) != 0
                }
                ExtensionName::Xinerama => {
                    xinerama::XineramaQueryExtension(dpy, &mut event_base, &mut error_base) != 0
                        && xinerama::XineramaQueryVersion(dpy, &mut major, &mut minor) != 0
                }
                ExtensionName::VidMode => {
                    xf86vmode::XF86VidModeQueryExtension(dpy, &mut event_base, &mut error_base) != 0
                        && xf86vmode::XF86VidModeQueryVersion(dpy, &mut major, &mut minor) != 0
                }
            }
        };
        if ok {
            Some(ExtensionVersion::new(major, minor))
        } else {
            None
        }
    }

    fn randr_screen_resources(&self, screen: i32, current: bool) -> Option<RandrResources> {
        let dpy = self.dpy();
        // SAFETY: the resources pointer is checked for null, read, then freed.
        unsafe {
            let root = xlib::XRootWindow(dpy, screen);
            let res = if current {
                xrandr::XRRGetScreenResourcesCurrent(dpy, root)
            } else {
                xrandr::XRRGetScreenResources(dpy, root)
            };
            if res.is_null() {
                return None;
            }
            let r = &*res;
            let resources = RandrResources {
                timestamp: r.timestamp as u64,
                config_timestamp: r.configTimestamp as u64,
                crtcs: Self::copy_array(r.crtcs, r.ncrtc, |c| c as Xid),
                outputs: Self::copy_array(r.outputs, r.noutput, |o| o as Xid),
                modes: Self::copy_array(r.modes, r.nmode, |m| RandrModeInfo {
                    id: m.id as Xid,
                    width: m.width as u32,
                    height: m.height as u32,
                    dot_clock: m.dotClock as u64,
                    h_total: m.hTotal as u32,
                    v_total: m.vTotal as u32,
                    name: Self::lossy_string(m.name, m.nameLength as usize),
                }),
            };
            xrandr::XRRFreeScreenResources(res);
            Some(resources)
        }
    }

    fn randr_output_primary(&self, root: Xid) -> Xid {
        unsafe { xrandr::XRRGetOutputPrimary(self.dpy(), root as xlib::Window) as Xid }
    }

    fn randr_output_info(&self, config_timestamp: u64, output: Xid) -> Option<RandrOutputInfo> {
        let mut stub = Self::resources_stub(config_timestamp);
        // SAFETY: `stub` lives across the call; the reply is freed below.
        unsafe {
            let info = xrandr::XRRGetOutputInfo(self.dpy(), &mut stub, output as xrandr::RROutput);
            if info.is_null() {
                return None;
            }
            let o = &*info;
            let connection = match o.connection as u16 {
                RR_CONNECTED => OutputConnection::Connected,
                RR_DISCONNECTED => OutputConnection::Disconnected,
                _ => OutputConnection::Unknown,
            };
            let output_info = RandrOutputInfo {
                name: Self::lossy_string(o.name, o.nameLen.max(0) as usize),
                crtc: o.crtc as Xid,
                mm_width: o.mm_width as u64,
                mm_height: o.mm_height as u64,
                connection,
                modes: Self::copy_array(o.modes, o.nmode, |m| m as Xid),
            };
            xrandr::XRRFreeOutputInfo(info);
            Some(output_info)
        }
    }

    fn randr_crtc_info(&self, config_timestamp: u64, crtc: Xid) -> Option<RandrCrtcInfo> {
        let mut stub = Self::resources_stub(config_timestamp);
        // SAFETY: as for `randr_output_info`.
        unsafe {
            let info = xrandr::XRRGetCrtcInfo(self.dpy(), &mut stub, crtc as xrandr::RRCrtc);
            if info.is_null() {
                return None;
            }
            let c = &*info;
            let crtc_info = RandrCrtcInfo {
                x: c.x as i32,
                y: c.y as i32,
                width: c.width as u32,
                height: c.height as u32,
                mode: c.mode as Xid,
                rotation: c.rotation as u16,
                outputs: Self::copy_array(c.outputs, c.noutput, |o| o as Xid),
            };
            xrandr::XRRFreeCrtcInfo(info);
            Some(crtc_info)
        }
    }

    fn randr_output_properties(&self, output: Xid) -> Vec<Xid> {
        let mut count: c_int = 0;
        // SAFETY: the atom array holds `count` entries and is freed below.
        unsafe {
            let props = xrandr::XRRListOutputProperties(self.dpy(), output as xrandr::RROutput, &mut count);
            let atoms = Self::copy_array(props, count, |a| a as Xid);
            if !props.is_null() {
                xlib::XFree(props as *mut c_void);
            }
            atoms
        }
    }

    fn randr_output_property(&self, output: Xid, property: Xid, max_words: i64) -> Option<PropertyReply> {
        let mut type_atom: xlib::Atom = 0;
        let mut format: c_int = 0;
        let mut nitems: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();
        // SAFETY: out-parameters point at locals; `data` is freed in
        // `property_reply`.
        unsafe {
            let status = xrandr::XRRGetOutputProperty(
                self.dpy(),
                output as xrandr::RROutput,
                property as xlib::Atom,
                0,
                max_words as c_long,
                xlib::False,
                xlib::False,
                xlib::AnyPropertyType as xlib::Atom,
                &mut type_atom,
                &mut format,
                &mut nitems,
                &mut bytes_after,
                &mut data,
            );
            if status != xlib::Success as c_int {
                if !data.is_null() {
                    xlib::XFree(data as *mut c_void);
                }
                return None;
            }
            Self::property_reply(type_atom, format, nitems, data)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn randr_set_crtc_config(
        &self,
        config_timestamp: u64,
        crtc: Xid,
        x: i32,
        y: i32,
        mode: Xid,
        rotation: u16,
        outputs: &[Xid],
    ) -> bool {
        let mut stub = Self::resources_stub(config_timestamp);
        let mut outputs: Vec<xrandr::RROutput> = outputs.iter().map(|&o| o as xrandr::RROutput).collect();
        // SAFETY: `stub` and `outputs` outlive the call.
        let status = unsafe {
            xrandr::XRRSetCrtcConfig(
                self.dpy(),
                &mut stub,
                crtc as xrandr::RRCrtc,
                xlib::CurrentTime,
                x,
                y,
                mode as xrandr::RRMode,
                rotation as xrandr::Rotation,
                outputs.as_mut_ptr(),
                outputs.len() as c_int,
            )
        };
        status == xlib::Success as c_int
    }

    fn xinerama_is_active(&self) -> bool {
        unsafe { xinerama::XineramaIsActive(self.dpy()) != 0 }
    }

    fn xinerama_screens(&self) -> Option<Vec<XineramaScreen>> {
        let mut count: c_int = 0;
        // SAFETY: the screen array holds `count` entries and is freed below.
        unsafe {
            let screens = xinerama::XineramaQueryScreens(self.dpy(), &mut count);
            if screens.is_null() {
                return None;
            }
            let list = Self::copy_array(screens, count, |s| XineramaScreen {
                screen_number: s.screen_number as i32,
                x: s.x_org as i32,
                y: s.y_org as i32,
                width: s.width as i32,
                height: s.height as i32,
            });
            xlib::XFree(screens as *mut c_void);
            Some(list)
        }
    }

    fn vidmode_modelines(&self, screen: i32) -> Option<Vec<VidModeLine>> {
        let mut count: c_int = 0;
        let mut modes: *mut *mut xf86vmode::XF86VidModeModeInfo = ptr::null_mut();
        // SAFETY: `modes` holds `count` pointers into one Xlib allocation
        // which is released with a single XFree.
        unsafe {
            if xf86vmode::XF86VidModeGetAllModeLines(self.dpy(), screen, &mut count, &mut modes) == 0 || modes.is_null() {
                return None;
            }
            let list = Self::copy_array(modes as *const *mut xf86vmode::XF86VidModeModeInfo, count, |m| {
                Self::vidmode_line(&*m)
            });
            xlib::XFree(modes as *mut c_void);
            Some(list)
        }
    }

    fn vidmode_current_modeline(&self, screen: i32) -> Option<VidModeLine> {
        let mut dot_clock: c_int = 0;
        // SAFETY: XF86VidModeModeLine is plain data; zeroed is a valid
        // initial value for an out-parameter.
        unsafe {
            let mut line: xf86vmode::XF86VidModeModeLine = std::mem::zeroed();
            if xf86vmode::XF86VidModeGetModeLine(self.dpy(), screen, &mut dot_clock, &mut line) == 0 {
                return None;
            }
            Some(VidModeLine {
                dot_clock: dot_clock as u32,
                h_display: line.hdisplay as u16,
                h_sync_start: line.hsyncstart as u16,
                h_sync_end: line.hsyncend as u16,
                h_total: line.htotal as u16,
                h_skew: line.hskew as u16,
                v_display: line.vdisplay as u16,
                v_sync_start: line.vsyncstart as u16,
                v_sync_end: line.vsyncend as u16,
                v_total: line.vtotal as u16,
                flags: line.flags as u32,
            })
        }
    }

    fn vidmode_switch_to_mode(&self, screen: i32, modeline: &VidModeLine) -> bool {
        let dpy = self.dpy();
        let mut count: c_int = 0;
        let mut modes: *mut *mut xf86vmode::XF86VidModeModeInfo = ptr::null_mut();
        // The server wants one of its own modeline records back, so look the
        // stored timing up again instead of fabricating a record.
        // SAFETY: see `vidmode_modelines`.
        unsafe {
            if xf86vmode::XF86VidModeGetAllModeLines(dpy, screen, &mut count, &mut modes) == 0 || modes.is_null() {
                return false;
            }
            let entries = slice::from_raw_parts(modes, count.max(0) as usize);
            let switched = match entries.iter().find(|&&m| Self::vidmode_line(&*m) == *modeline) {
                Some(&m) => xf86vmode::XF86VidModeSwitchToMode(dpy, screen, m) != 0,
                None => {
                    warn!("Modeline {:?} is no longer offered by screen {}", modeline, screen);
                    false
                }
            };
            xlib::XFree(modes as *mut c_void);
            switched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_stub_carries_only_the_config_timestamp() {
        let stub = XlibConnection::resources_stub(42);
        assert_eq!(stub.configTimestamp, 42);
        assert_eq!(stub.noutput, 0);
        assert!(stub.outputs.is_null());
        assert!(stub.modes.is_null());
    }

    #[test]
    fn copy_array_handles_null_and_empty() {
        let empty: Vec<u64> = unsafe { XlibConnection::copy_array(ptr::null::<u64>(), 3, |v| v) };
        assert!(empty.is_empty());

        let data = [1u64, 2, 3];
        let copied = unsafe { XlibConnection::copy_array(data.as_ptr(), 2, |v| v * 10) };
        assert_eq!(copied, vec![10, 20]);
    }

    #[test]
    fn trap_flag_is_set_by_the_handler() {
        ERROR_TRAPPED.store(false, Ordering::SeqCst);
        // SAFETY: the handler tolerates a null event and never touches the display.
        unsafe {
            trap_error(ptr::null_mut(), ptr::null_mut());
        }
        assert!(ERROR_TRAPPED.load(Ordering::SeqCst));
        ERROR_TRAPPED.store(false, Ordering::SeqCst);
    }
}
