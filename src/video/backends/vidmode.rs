// src/video/backends/vidmode.rs

//! XF86VidMode backend: the default screen as a single display.

use log::{debug, warn};

use super::screen_format;
use crate::server::{VidModeLine, XServer};
use crate::video::error::VideoError;
use crate::video::timing::{compute_dpi, vidmode_refresh_rate};
use crate::video::types::{Display, DisplayHandle, Mode, ModeHandle, PixelFormat};

fn modeline_mode(line: &VidModeLine, format: PixelFormat) -> Mode {
    Mode {
        width: line.h_display as i32,
        height: line.v_display as i32,
        refresh_rate: vidmode_refresh_rate(line.dot_clock, line.h_total, line.v_total),
        format,
        handle: ModeHandle::VidMode(*line),
    }
}

pub fn enumerate_displays<S: XServer>(server: &S) -> Vec<Display> {
    let screen = server.default_screen();
    let Some((format, scanline_pad)) = screen_format(server, screen) else {
        return Vec::new();
    };
    let Some(current) = server.vidmode_current_modeline(screen) else {
        warn!("XVidMode could not report the current modeline of screen {}", screen);
        return Vec::new();
    };
    let mode = modeline_mode(&current, format);
    let geometry = server.screen_geometry(screen);
    debug!(
        "Display 0: XVidMode screen {} {}x{}@{}Hz",
        screen, mode.width, mode.height, mode.refresh_rate
    );

    vec![Display {
        index: 0,
        handle: DisplayHandle::VidMode { screen },
        name: String::new(),
        x: 0,
        y: 0,
        width_mm: if geometry.width_mm > 0 { geometry.width_mm } else { -1 },
        height_mm: if geometry.height_mm > 0 { geometry.height_mm } else { -1 },
        dpi: compute_dpi(mode.width, mode.height, geometry.width_mm, geometry.height_mm),
        scanline_pad,
        format,
        current_mode: mode,
        desktop_mode: mode,
    }]
}

pub fn enumerate_modes<S: XServer>(server: &S, display: &Display) -> Vec<Mode> {
    let DisplayHandle::VidMode { screen } = display.handle else {
        return Vec::new();
    };
    server
        .vidmode_modelines(screen)
        .unwrap_or_default()
        .iter()
        .map(|line| modeline_mode(line, display.format))
        .collect()
}

/// Issues the switch. The server applies it asynchronously, so a rejected
/// request is only logged.
pub fn set_mode<S: XServer>(server: &S, display: &Display, mode: &Mode) -> Result<(), VideoError> {
    let (DisplayHandle::VidMode { screen }, ModeHandle::VidMode(line)) = (display.handle, mode.handle)
    else {
        return Err(VideoError::ModeExtensionMismatch {
            display: display.extension(),
            mode: mode.handle.extension(),
        });
    };
    debug!(
        "Switching screen {} to {}x{}@{}Hz",
        screen, mode.width, mode.height, mode.refresh_rate
    );
    if !server.vidmode_switch_to_mode(screen, &line) {
        warn!("XF86VidModeSwitchToMode did not accept {}x{}", mode.width, mode.height);
    }
    Ok(())
}
