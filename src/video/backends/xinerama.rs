// src/video/backends/xinerama.rs

//! Xinerama backend: one display per screen rectangle, fixed mode.

use log::{debug, warn};

use super::screen_format;
use crate::server::{XServer, XineramaScreen};
use crate::video::error::VideoError;
use crate::video::error_guard::ErrorGuard;
use crate::video::timing::compute_dpi;
use crate::video::types::{Display, DisplayHandle, Mode, ModeHandle};

/// Current screen rectangles. Some servers raise a protocol error instead
/// of answering, so the query runs under the error trap.
///
/// # Returns
///
/// * `Ok(None)` if the server answered without a screen list.
/// * `Err(VideoError::ServerError)` if the query raised an X error.
pub fn query_screens<S: XServer>(server: &S) -> Result<Option<Vec<XineramaScreen>>, VideoError> {
    let guard = ErrorGuard::new(server);
    let screens = server.xinerama_screens();
    if guard.finish() {
        warn!("XineramaQueryScreens raised an X error");
        return Err(VideoError::ServerError("XineramaQueryScreens"));
    }
    Ok(screens)
}

/// One display per Xinerama screen rectangle. A trapped X error is passed
/// on so the caller can stop using Xinerama.
pub fn enumerate_displays<S: XServer>(server: &S) -> Result<Vec<Display>, VideoError> {
    let screen = server.default_screen();
    let Some((format, scanline_pad)) = screen_format(server, screen) else {
        return Ok(Vec::new());
    };
    let Some(screens) = query_screens(server)? else {
        return Ok(Vec::new());
    };
    // Xinerama rectangles carry no physical size; each one inherits the
    // screen-wide DPI.
    let geometry = server.screen_geometry(screen);

    let displays = screens
        .iter()
        .enumerate()
        .map(|(index, info)| {
            let mode = Mode {
                width: info.width,
                height: info.height,
                refresh_rate: 0,
                format,
                handle: ModeHandle::Xinerama,
            };
            let dpi = compute_dpi(
                geometry.width_px,
                geometry.height_px,
                geometry.width_mm,
                geometry.height_mm,
            );
            debug!(
                "Display {}: Xinerama screen {} {}x{} at ({}, {})",
                index, info.screen_number, info.width, info.height, info.x, info.y
            );
            Display {
                index,
                handle: DisplayHandle::Xinerama {
                    screen,
                    screen_number: info.screen_number,
                },
                name: String::new(),
                x: info.x,
                y: info.y,
                width_mm: -1,
                height_mm: -1,
                dpi,
                scanline_pad,
                format,
                current_mode: mode,
                desktop_mode: mode,
            }
        })
        .collect();
    Ok(displays)
}
