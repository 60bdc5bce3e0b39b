// src/server/mod.rs

//! The display-server seam.
//!
//! `XServer` is the minimal set of blocking requests the mode subsystem issues
//! against one X connection. Every request returns plain Rust data so that the
//! discovery logic in `crate::video` never touches raw Xlib pointers:
//! - `connection`: the real implementation, speaking Xlib through the `x11` crate.
//! - `mock`: a scripted in-memory server used by the unit tests.
//!
//! Requests that can fail on the server side return `Option`; `None` means the
//! server had nothing usable to report; no request ever panics.

pub mod connection;

#[cfg(test)]
pub mod mock;

use serde::Serialize;

/// Server-side resource id (window, output, CRTC, mode, atom).
pub type Xid = u64;

/// The three mode-setting extensions this crate knows about, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExtensionName {
    RandR,
    Xinerama,
    VidMode,
}

impl ExtensionName {
    /// Name the server registers the extension under.
    pub fn protocol_name(self) -> &'static str {
        match self {
            ExtensionName::RandR => "RANDR",
            ExtensionName::Xinerama => "XINERAMA",
            ExtensionName::VidMode => "XFree86-VidModeExtension",
        }
    }
}

/// Negotiated extension version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ExtensionVersion {
    pub major: i32,
    pub minor: i32,
}

impl ExtensionVersion {
    pub const fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }
}

/// Pixel and physical size of one X screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width_px: i32,
    pub height_px: i32,
    pub width_mm: i32,
    pub height_mm: i32,
}

/// The parts of a screen's default visual the mode subsystem cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualInfo {
    pub visual_id: Xid,
    pub depth: i32,
    pub red_mask: u64,
    pub green_mask: u64,
    pub blue_mask: u64,
}

/// One entry of the server's supported pixmap formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixmapFormat {
    pub depth: i32,
    pub bits_per_pixel: i32,
    pub scanline_pad: i32,
}

/// A RandR mode timing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandrModeInfo {
    pub id: Xid,
    pub width: u32,
    pub height: u32,
    pub dot_clock: u64,
    pub h_total: u32,
    pub v_total: u32,
    pub name: String,
}

/// Snapshot of `XRRScreenResources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandrResources {
    pub timestamp: u64,
    pub config_timestamp: u64,
    pub crtcs: Vec<Xid>,
    pub outputs: Vec<Xid>,
    pub modes: Vec<RandrModeInfo>,
}

impl RandrResources {
    pub fn mode(&self, id: Xid) -> Option<&RandrModeInfo> {
        self.modes.iter().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputConnection {
    Connected,
    Disconnected,
    Unknown,
}

/// Snapshot of `XRROutputInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandrOutputInfo {
    pub name: String,
    /// Zero when the output is not driven by any CRTC.
    pub crtc: Xid,
    pub mm_width: u64,
    pub mm_height: u64,
    pub connection: OutputConnection,
    pub modes: Vec<Xid>,
}

/// Snapshot of `XRRCrtcInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandrCrtcInfo {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub mode: Xid,
    /// Raw RandR rotation/reflection bitmask.
    pub rotation: u16,
    pub outputs: Vec<Xid>,
}

/// One Xinerama screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XineramaScreen {
    pub screen_number: i32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// An XF86VidMode modeline. The dot clock is in kHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VidModeLine {
    pub dot_clock: u32,
    pub h_display: u16,
    pub h_sync_start: u16,
    pub h_sync_end: u16,
    pub h_total: u16,
    pub h_skew: u16,
    pub v_display: u16,
    pub v_sync_start: u16,
    pub v_sync_end: u16,
    pub v_total: u16,
    pub flags: u32,
}

/// Reply to a property fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyReply {
    pub type_atom: Xid,
    /// 8, 16 or 32.
    pub format: i32,
    /// The property data as bytes (format 8 only).
    pub bytes: Vec<u8>,
    /// The property data as integers (format 32 only).
    pub longs: Vec<i64>,
}

/// Atom id of the predefined `INTEGER` type.
pub const XA_INTEGER: Xid = 19;

/// Blocking request/response operations against one X server connection.
///
/// Implementations are single-threaded; none of these calls may be issued
/// concurrently with each other.
pub trait XServer {
    /// Opaque previously-installed error handler, handed back on restore.
    type ErrorHandler;

    // --- Core protocol ---

    fn screen_count(&self) -> i32;
    fn default_screen(&self) -> i32;
    fn root_window(&self, screen: i32) -> Xid;
    fn screen_geometry(&self, screen: i32) -> ScreenGeometry;
    fn default_visual(&self, screen: i32) -> Option<VisualInfo>;
    fn pixmap_formats(&self) -> Vec<PixmapFormat>;
    fn intern_atom(&self, name: &str, only_if_exists: bool) -> Xid;

    /// Round trip to the server, flushing any pending errors.
    fn sync(&self);

    /// Reads a property of a window. `max_words` is in 32-bit units.
    fn window_property(&self, window: Xid, property: Xid, max_words: i64) -> Option<PropertyReply>;

    // --- Error interception ---

    /// Clears the trap flag, installs the trapping handler and returns the
    /// handler that was active before.
    fn install_error_trap(&self) -> Self::ErrorHandler;
    /// Puts back the handler returned by `install_error_trap`.
    fn restore_error_handler(&self, previous: Self::ErrorHandler);
    /// Whether the trap saw an error since it was installed.
    fn trapped_error(&self) -> bool;

    // --- Extension presence ---

    /// Presence and version of an extension. `None` when the extension is
    /// absent or its version query failed.
    fn query_extension(&self, extension: ExtensionName) -> Option<ExtensionVersion>;

    // --- RandR ---

    /// `current = true` asks for the cached configuration without polling
    /// hardware; `false` forces the server to probe outputs.
    fn randr_screen_resources(&self, screen: i32, current: bool) -> Option<RandrResources>;
    /// Primary output of the screen owning `root`, 0 when none is set.
    fn randr_output_primary(&self, root: Xid) -> Xid;
    fn randr_output_info(&self, config_timestamp: u64, output: Xid) -> Option<RandrOutputInfo>;
    fn randr_crtc_info(&self, config_timestamp: u64, crtc: Xid) -> Option<RandrCrtcInfo>;
    /// Atoms of every property set on the output.
    fn randr_output_properties(&self, output: Xid) -> Vec<Xid>;
    /// Reads an output property. `max_words` is in 32-bit units.
    fn randr_output_property(&self, output: Xid, property: Xid, max_words: i64) -> Option<PropertyReply>;
    /// Returns `true` on `Success`.
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
    ) -> bool;

    // --- Xinerama ---

    fn xinerama_is_active(&self) -> bool;
    /// Screen rectangles, `None` when the server returned no list. May raise
    /// a protocol error on servers that advertise Xinerama without serving it.
    fn xinerama_screens(&self) -> Option<Vec<XineramaScreen>>;

    // --- XF86VidMode ---

    fn vidmode_modelines(&self, screen: i32) -> Option<Vec<VidModeLine>>;
    fn vidmode_current_modeline(&self, screen: i32) -> Option<VidModeLine>;
    /// Returns `false` if the modeline is no longer offered or the request
    /// failed.
    fn vidmode_switch_to_mode(&self, screen: i32, modeline: &VidModeLine) -> bool;
}
