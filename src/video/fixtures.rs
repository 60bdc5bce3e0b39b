// src/video/fixtures.rs

//! Canned server layouts shared by the video tests.

use crate::server::mock::MockServer;
use crate::server::{
    ExtensionName, OutputConnection, RandrCrtcInfo, RandrModeInfo, RandrOutputInfo, VidModeLine,
    XineramaScreen, Xid,
};

pub const HDMI: Xid = 0x40;
pub const DP: Xid = 0x41;
pub const VGA: Xid = 0x42;
pub const CRTC_HDMI: Xid = 0x60;
pub const CRTC_DP: Xid = 0x61;

pub const MODE_1080: Xid = 0x80;
pub const MODE_1440: Xid = 0x81;
pub const MODE_720: Xid = 0x82;
/// Same timing as `MODE_1080` under another id.
pub const MODE_1080_ALT: Xid = 0x83;

pub fn mode_info(id: Xid, width: u32, height: u32, dot_clock: u64, h_total: u32, v_total: u32) -> RandrModeInfo {
    RandrModeInfo {
        id,
        width,
        height,
        dot_clock,
        h_total,
        v_total,
        name: format!("{}x{}", width, height),
    }
}

pub fn output(name: &str, crtc: Xid, mm: (u64, u64), modes: &[Xid]) -> RandrOutputInfo {
    RandrOutputInfo {
        name: name.to_string(),
        crtc,
        mm_width: mm.0,
        mm_height: mm.1,
        connection: OutputConnection::Connected,
        modes: modes.to_vec(),
    }
}

pub fn crtc(x: i32, y: i32, width: u32, height: u32, mode: Xid, output: Xid) -> RandrCrtcInfo {
    RandrCrtcInfo {
        x,
        y,
        width,
        height,
        mode,
        rotation: 1,
        outputs: vec![output],
    }
}

/// RandR 1.5 with HDMI-1 (1080p, left), an unplugged VGA-1 and DP-1
/// (1440p, right, primary), listed by the server in that order.
pub fn randr_server() -> MockServer {
    let mut server = MockServer::new().with_extension(ExtensionName::RandR, 1, 5);
    server.geometries[0].width_px = 4480;
    server.geometries[0].height_px = 1440;

    server.add_randr_mode(0, mode_info(MODE_1080, 1920, 1080, 148_500_000, 2200, 1125));
    server.add_randr_mode(0, mode_info(MODE_1440, 2560, 1440, 241_500_000, 2720, 1481));
    server.add_randr_mode(0, mode_info(MODE_720, 1280, 720, 74_250_000, 1650, 750));
    server.add_randr_mode(0, mode_info(MODE_1080_ALT, 1920, 1080, 148_500_000, 2200, 1125));

    server.add_randr_output(
        0,
        HDMI,
        output("HDMI-1", CRTC_HDMI, (527, 296), &[MODE_1080, MODE_720, MODE_1080_ALT]),
        Some(crtc(0, 0, 1920, 1080, MODE_1080, HDMI)),
    );
    let mut vga = output("VGA-1", 0, (0, 0), &[MODE_1080]);
    vga.connection = OutputConnection::Disconnected;
    server.add_randr_output(0, VGA, vga, None);
    server.add_randr_output(
        0,
        DP,
        output("DP-1", CRTC_DP, (597, 336), &[MODE_1440, MODE_1080]),
        Some(crtc(1920, 0, 2560, 1440, MODE_1440, DP)),
    );
    server.set_primary_output(0, DP);
    server
}

pub fn xinerama_screens() -> Vec<XineramaScreen> {
    vec![
        XineramaScreen {
            screen_number: 0,
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        },
        XineramaScreen {
            screen_number: 1,
            x: 1920,
            y: 0,
            width: 1280,
            height: 1024,
        },
    ]
}

/// Xinerama 1.1, active, with two side-by-side screens.
pub fn xinerama_server() -> MockServer {
    let mut server = MockServer::new().with_extension(ExtensionName::Xinerama, 1, 1);
    server.xinerama_active = true;
    server.xinerama_screens = Some(xinerama_screens());
    server
}

pub fn modeline(width: u16, height: u16, dot_clock: u32, h_total: u16, v_total: u16) -> VidModeLine {
    VidModeLine {
        dot_clock,
        h_display: width,
        h_sync_start: width + 8,
        h_sync_end: width + 40,
        h_total,
        h_skew: 0,
        v_display: height,
        v_sync_start: height + 3,
        v_sync_end: height + 8,
        v_total,
        flags: 0,
    }
}

pub fn line_1080() -> VidModeLine {
    modeline(1920, 1080, 148_500, 2200, 1125)
}

pub fn line_1024() -> VidModeLine {
    modeline(1280, 1024, 108_000, 1688, 1066)
}

/// XF86VidMode 2.2 on the default screen, currently at 1080p.
pub fn vidmode_server() -> MockServer {
    let mut server = MockServer::new().with_extension(ExtensionName::VidMode, 2, 2);
    server.set_vidmode_lines(0, vec![line_1080(), line_1024()], line_1080());
    server
}
