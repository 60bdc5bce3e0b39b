// src/server/mock.rs

//! Scripted in-memory `XServer` for unit tests.
//!
//! Tests build the server state up front with the `with_*`/`add_*` helpers
//! and inspect what the subsystem asked for afterwards through the request
//! log and the recorded mode switches.

use super::*;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Handler id the mock hands out while the error trap is installed.
pub const TRAP_HANDLER: u32 = u32::MAX;
/// Handler id of the default (fatal) error handler.
pub const DEFAULT_HANDLER: u32 = 0;

pub const CONFIG_TIMESTAMP: u64 = 1000;

pub struct MockServer {
    pub geometries: Vec<ScreenGeometry>,
    pub default_screen: i32,
    pub visual: Option<VisualInfo>,
    pub pixmap_formats: Vec<PixmapFormat>,
    pub extensions: HashMap<ExtensionName, ExtensionVersion>,

    pub randr_resources: HashMap<i32, RandrResources>,
    /// When set, the probing resources request fails and only the cached
    /// snapshot is available.
    pub randr_full_unavailable: bool,
    pub randr_primary: HashMap<i32, Xid>,
    pub outputs: HashMap<Xid, RandrOutputInfo>,
    pub crtcs: RefCell<HashMap<Xid, RandrCrtcInfo>>,
    pub output_properties: HashMap<(Xid, Xid), PropertyReply>,
    pub window_properties: HashMap<(Xid, Xid), PropertyReply>,
    pub set_crtc_fails: bool,

    pub xinerama_active: bool,
    pub xinerama_screens: Option<Vec<XineramaScreen>>,
    /// Makes the Xinerama screen query raise a protocol error.
    pub xinerama_raises_error: bool,
    /// Makes the Xinerama activity check raise a protocol error.
    pub xinerama_probe_raises_error: bool,

    pub vidmode_lines: HashMap<i32, Vec<VidModeLine>>,
    pub vidmode_current: RefCell<HashMap<i32, VidModeLine>>,

    atoms: RefCell<HashMap<String, Xid>>,
    next_atom: Cell<Xid>,

    handler: Cell<u32>,
    trapped: Cell<bool>,
    installs: Cell<u32>,
    restores: Cell<u32>,

    requests: RefCell<Vec<&'static str>>,
    crtc_configs: RefCell<Vec<(Xid, Xid)>>,
    vidmode_switches: RefCell<Vec<VidModeLine>>,
}

impl MockServer {
    /// One 1920x1080 screen, 24-bit TrueColor, no extensions.
    pub fn new() -> Self {
        Self {
            geometries: vec![ScreenGeometry {
                width_px: 1920,
                height_px: 1080,
                width_mm: 508,
                height_mm: 285,
            }],
            default_screen: 0,
            visual: Some(VisualInfo {
                visual_id: 0x21,
                depth: 24,
                red_mask: 0xFF_0000,
                green_mask: 0x00_FF00,
                blue_mask: 0x00_00FF,
            }),
            pixmap_formats: vec![
                PixmapFormat {
                    depth: 1,
                    bits_per_pixel: 1,
                    scanline_pad: 32,
                },
                PixmapFormat {
                    depth: 24,
                    bits_per_pixel: 32,
                    scanline_pad: 32,
                },
            ],
            extensions: HashMap::new(),
            randr_resources: HashMap::new(),
            randr_full_unavailable: false,
            randr_primary: HashMap::new(),
            outputs: HashMap::new(),
            crtcs: RefCell::new(HashMap::new()),
            output_properties: HashMap::new(),
            window_properties: HashMap::new(),
            set_crtc_fails: false,
            xinerama_active: false,
            xinerama_screens: None,
            xinerama_raises_error: false,
            xinerama_probe_raises_error: false,
            vidmode_lines: HashMap::new(),
            vidmode_current: RefCell::new(HashMap::new()),
            atoms: RefCell::new(HashMap::new()),
            next_atom: Cell::new(0x100),
            handler: Cell::new(DEFAULT_HANDLER),
            trapped: Cell::new(false),
            installs: Cell::new(0),
            restores: Cell::new(0),
            requests: RefCell::new(Vec::new()),
            crtc_configs: RefCell::new(Vec::new()),
            vidmode_switches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_extension(mut self, extension: ExtensionName, major: i32, minor: i32) -> Self {
        self.extensions
            .insert(extension, ExtensionVersion::new(major, minor));
        self
    }

    /// Adds a mode to the screen's RandR resources.
    pub fn add_randr_mode(&mut self, screen: i32, mode: RandrModeInfo) {
        self.resources_mut(screen).modes.push(mode);
    }

    /// Adds an output, and its CRTC when it is driven by one.
    pub fn add_randr_output(
        &mut self,
        screen: i32,
        output: Xid,
        info: RandrOutputInfo,
        crtc: Option<RandrCrtcInfo>,
    ) {
        let crtc_id = info.crtc;
        let resources = self.resources_mut(screen);
        resources.outputs.push(output);
        if let Some(crtc) = crtc {
            if !resources.crtcs.contains(&crtc_id) {
                resources.crtcs.push(crtc_id);
            }
            self.crtcs.get_mut().insert(crtc_id, crtc);
        }
        self.outputs.insert(output, info);
    }

    pub fn set_primary_output(&mut self, screen: i32, output: Xid) {
        self.randr_primary.insert(screen, output);
    }

    /// Publishes an `EDID` output property with the given bytes.
    pub fn set_output_edid(&mut self, output: Xid, edid: &[u8]) {
        let atom = self.intern_atom("EDID", false);
        self.output_properties.insert(
            (output, atom),
            PropertyReply {
                type_atom: XA_INTEGER,
                format: 8,
                bytes: edid.to_vec(),
                longs: Vec::new(),
            },
        );
    }

    /// Publishes `_NET_WORKAREA` on the root window of `screen`.
    pub fn set_work_area(&mut self, screen: i32, area: [i64; 4]) {
        let atom = self.intern_atom("_NET_WORKAREA", false);
        let root = self.root_window(screen);
        self.window_properties.insert(
            (root, atom),
            PropertyReply {
                type_atom: 6, // CARDINAL
                format: 32,
                bytes: Vec::new(),
                longs: area.to_vec(),
            },
        );
    }

    pub fn set_vidmode_lines(&mut self, screen: i32, lines: Vec<VidModeLine>, current: VidModeLine) {
        self.vidmode_lines.insert(screen, lines);
        self.vidmode_current.get_mut().insert(screen, current);
    }

    fn resources_mut(&mut self, screen: i32) -> &mut RandrResources {
        self.randr_resources
            .entry(screen)
            .or_insert_with(|| RandrResources {
                timestamp: CONFIG_TIMESTAMP,
                config_timestamp: CONFIG_TIMESTAMP,
                crtcs: Vec::new(),
                outputs: Vec::new(),
                modes: Vec::new(),
            })
    }

    // --- Inspection ---

    pub fn requests(&self) -> Vec<&'static str> {
        self.requests.borrow().clone()
    }

    pub fn requested(&self, request: &str) -> bool {
        self.requests.borrow().iter().any(|r| *r == request)
    }

    pub fn current_handler(&self) -> u32 {
        self.handler.get()
    }

    pub fn trap_installs(&self) -> u32 {
        self.installs.get()
    }

    pub fn trap_restores(&self) -> u32 {
        self.restores.get()
    }

    /// `(crtc, mode)` pairs passed to successful CRTC reconfigurations.
    pub fn crtc_configs(&self) -> Vec<(Xid, Xid)> {
        self.crtc_configs.borrow().clone()
    }

    pub fn vidmode_switches(&self) -> Vec<VidModeLine> {
        self.vidmode_switches.borrow().clone()
    }

    fn log(&self, request: &'static str) {
        self.requests.borrow_mut().push(request);
    }

    /// Delivers a protocol error to whichever handler is installed.
    fn raise_error(&self, request: &'static str) {
        if self.handler.get() == TRAP_HANDLER {
            self.trapped.set(true);
        } else {
            panic!("X error from {} reached the default handler", request);
        }
    }

    fn truncate(reply: &PropertyReply, max_words: i64) -> PropertyReply {
        let words = max_words.max(0) as usize;
        let mut reply = reply.clone();
        reply.bytes.truncate(words * 4);
        reply.longs.truncate(words);
        reply
    }
}

impl XServer for MockServer {
    type ErrorHandler = u32;

    fn screen_count(&self) -> i32 {
        self.geometries.len() as i32
    }

    fn default_screen(&self) -> i32 {
        self.default_screen
    }

    fn root_window(&self, screen: i32) -> Xid {
        0x10 + screen as Xid
    }

    fn screen_geometry(&self, screen: i32) -> ScreenGeometry {
        self.geometries[screen as usize]
    }

    fn default_visual(&self, _screen: i32) -> Option<VisualInfo> {
        self.visual
    }

    fn pixmap_formats(&self) -> Vec<PixmapFormat> {
        self.pixmap_formats.clone()
    }

    fn intern_atom(&self, name: &str, only_if_exists: bool) -> Xid {
        if let Some(&atom) = self.atoms.borrow().get(name) {
            return atom;
        }
        if only_if_exists {
            return 0;
        }
        let atom = self.next_atom.get();
        self.next_atom.set(atom + 1);
        self.atoms.borrow_mut().insert(name.to_string(), atom);
        atom
    }

    fn sync(&self) {
        self.log("Sync");
    }

    fn window_property(&self, window: Xid, property: Xid, max_words: i64) -> Option<PropertyReply> {
        self.log("GetWindowProperty");
        self.window_properties
            .get(&(window, property))
            .map(|reply| Self::truncate(reply, max_words))
    }

    fn install_error_trap(&self) -> u32 {
        self.installs.set(self.installs.get() + 1);
        self.trapped.set(false);
        self.handler.replace(TRAP_HANDLER)
    }

    fn restore_error_handler(&self, previous: u32) {
        self.restores.set(self.restores.get() + 1);
        self.handler.set(previous);
    }

    fn trapped_error(&self) -> bool {
        self.trapped.get()
    }

    fn query_extension(&self, extension: ExtensionName) -> Option<ExtensionVersion> {
        self.log(match extension {
            ExtensionName::RandR => "RRQueryVersion",
            ExtensionName::Xinerama => "XineramaQueryVersion",
            ExtensionName::VidMode => "XF86VidModeQueryVersion",
        });
        self.extensions.get(&extension).copied()
    }

    fn randr_screen_resources(&self, screen: i32, current: bool) -> Option<RandrResources> {
        if current {
            self.log("RRGetScreenResourcesCurrent");
        } else {
            self.log("RRGetScreenResources");
            if self.randr_full_unavailable {
                return None;
            }
        }
        self.randr_resources.get(&screen).cloned()
    }

    fn randr_output_primary(&self, root: Xid) -> Xid {
        self.log("RRGetOutputPrimary");
        let screen = (root - 0x10) as i32;
        self.randr_primary.get(&screen).copied().unwrap_or(0)
    }

    fn randr_output_info(&self, _config_timestamp: u64, output: Xid) -> Option<RandrOutputInfo> {
        self.log("RRGetOutputInfo");
        self.outputs.get(&output).cloned()
    }

    fn randr_crtc_info(&self, _config_timestamp: u64, crtc: Xid) -> Option<RandrCrtcInfo> {
        self.log("RRGetCrtcInfo");
        self.crtcs.borrow().get(&crtc).cloned()
    }

    fn randr_output_properties(&self, output: Xid) -> Vec<Xid> {
        self.log("RRListOutputProperties");
        let mut atoms: Vec<Xid> = self
            .output_properties
            .keys()
            .filter(|(o, _)| *o == output)
            .map(|(_, atom)| *atom)
            .collect();
        atoms.sort_unstable();
        atoms
    }

    fn randr_output_property(&self, output: Xid, property: Xid, max_words: i64) -> Option<PropertyReply> {
        self.log("RRGetOutputProperty");
        self.output_properties
            .get(&(output, property))
            .map(|reply| Self::truncate(reply, max_words))
    }

    #[allow(clippy::too_many_arguments)]
    fn randr_set_crtc_config(
        &self,
        _config_timestamp: u64,
        crtc: Xid,
        x: i32,
        y: i32,
        mode: Xid,
        rotation: u16,
        outputs: &[Xid],
    ) -> bool {
        self.log("RRSetCrtcConfig");
        if self.set_crtc_fails {
            return false;
        }
        let mut crtcs = self.crtcs.borrow_mut();
        let Some(info) = crtcs.get_mut(&crtc) else {
            return false;
        };
        info.x = x;
        info.y = y;
        info.mode = mode;
        info.rotation = rotation;
        info.outputs = outputs.to_vec();
        self.crtc_configs.borrow_mut().push((crtc, mode));
        true
    }

    fn xinerama_is_active(&self) -> bool {
        self.log("XineramaIsActive");
        if self.xinerama_probe_raises_error {
            self.raise_error("XineramaIsActive");
            return false;
        }
        self.xinerama_active
    }

    fn xinerama_screens(&self) -> Option<Vec<XineramaScreen>> {
        self.log("XineramaQueryScreens");
        if self.xinerama_raises_error {
            self.raise_error("XineramaQueryScreens");
            return None;
        }
        self.xinerama_screens.clone()
    }

    fn vidmode_modelines(&self, screen: i32) -> Option<Vec<VidModeLine>> {
        self.log("XF86VidModeGetAllModeLines");
        self.vidmode_lines.get(&screen).cloned()
    }

    fn vidmode_current_modeline(&self, screen: i32) -> Option<VidModeLine> {
        self.log("XF86VidModeGetModeLine");
        self.vidmode_current.borrow().get(&screen).copied()
    }

    fn vidmode_switch_to_mode(&self, screen: i32, modeline: &VidModeLine) -> bool {
        self.log("XF86VidModeSwitchToMode");
        let offered = self
            .vidmode_lines
            .get(&screen)
            .map_or(false, |lines| lines.contains(modeline));
        if offered {
            self.vidmode_current.borrow_mut().insert(screen, *modeline);
            self.vidmode_switches.borrow_mut().push(*modeline);
        }
        offered
    }
}
