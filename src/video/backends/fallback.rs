// src/video/backends/fallback.rs

//! Core-protocol fallback used when no extension yields a display.

use log::info;

use super::screen_format;
use crate::server::XServer;
use crate::video::timing::compute_dpi;
use crate::video::types::{Display, DisplayHandle, Mode, ModeHandle, PixelFormat};

pub fn enumerate_displays<S: XServer>(server: &S) -> Vec<Display> {
    let screen = server.default_screen();
    let geometry = server.screen_geometry(screen);
    let (format, scanline_pad) = screen_format(server, screen).unwrap_or_else(|| {
        let format = PixelFormat::default();
        (format, format.bits_per_pixel as i32)
    });
    let mode = Mode {
        width: geometry.width_px,
        height: geometry.height_px,
        refresh_rate: 0,
        format,
        handle: ModeHandle::Core,
    };
    info!(
        "No display extension usable, using screen {} ({}x{})",
        screen, geometry.width_px, geometry.height_px
    );

    vec![Display {
        index: 0,
        handle: DisplayHandle::Core { screen },
        name: String::new(),
        x: 0,
        y: 0,
        width_mm: if geometry.width_mm > 0 { geometry.width_mm } else { -1 },
        height_mm: if geometry.height_mm > 0 { geometry.height_mm } else { -1 },
        dpi: compute_dpi(
            geometry.width_px,
            geometry.height_px,
            geometry.width_mm,
            geometry.height_mm,
        ),
        scanline_pad,
        format,
        current_mode: mode,
        desktop_mode: mode,
    }]
}
