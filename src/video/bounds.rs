// src/video/bounds.rs

//! Display rectangles and DPI.

use log::{debug, trace};

use super::backends::xinerama;
use super::error::VideoError;
use super::types::{Display, DisplayHandle, Dpi, Rect, UsableBounds};
use crate::server::XServer;

/// Items in a `_NET_WORKAREA` entry: x, y, width, height.
const WORK_AREA_LEN: i64 = 4;

/// Desktop rectangle currently covered by the display.
pub fn display_bounds<S: XServer>(server: &S, display: &Display) -> Rect {
    let (mut x, mut y) = (display.x, display.y);
    if let DisplayHandle::Xinerama { screen_number, .. } = display.handle {
        // Xinerama layouts can change under us; ask for the live origin.
        match xinerama::query_screens(server)
            .ok()
            .flatten()
            .and_then(|screens| screens.into_iter().find(|s| s.screen_number == screen_number))
        {
            Some(live) => (x, y) = (live.x, live.y),
            None => debug!("Xinerama screen {} not found, using cached origin", screen_number),
        }
    }
    Rect::new(x, y, display.current_mode.width, display.current_mode.height)
}

/// The part of the display not reserved by panels and docks. Falls back to
/// the full bounds when the window manager publishes no work area.
pub fn usable_bounds<S: XServer>(server: &S, display: &Display) -> UsableBounds {
    let bounds = display_bounds(server, display);
    match work_area(server, display.handle.screen()) {
        Some(area) => UsableBounds {
            rect: bounds.intersection(&area).unwrap_or_default(),
            from_work_area: true,
        },
        None => UsableBounds {
            rect: bounds,
            from_work_area: false,
        },
    }
}

/// First `_NET_WORKAREA` entry on the screen's root window. `None` when the
/// property is missing, short, not 32-bit or holds values outside `i32`.
pub fn work_area<S: XServer>(server: &S, screen: i32) -> Option<Rect> {
    let atom = server.intern_atom("_NET_WORKAREA", false);
    if atom == 0 {
        return None;
    }
    let reply = server.window_property(server.root_window(screen), atom, WORK_AREA_LEN)?;
    if reply.format != 32 || reply.longs.len() < WORK_AREA_LEN as usize {
        trace!(
            "Ignoring _NET_WORKAREA with format {} and {} items",
            reply.format,
            reply.longs.len()
        );
        return None;
    }
    let mut v = [0i32; 4];
    for (out, &value) in v.iter_mut().zip(&reply.longs) {
        let Ok(value) = i32::try_from(value) else {
            debug!("Ignoring _NET_WORKAREA with out-of-range value {}", value);
            return None;
        };
        *out = value;
    }
    Some(Rect::new(v[0], v[1], v[2], v[3]))
}

/// DPI recorded for the display.
///
/// # Returns
///
/// * `Err(VideoError::DpiUnavailable)` if the display has no physical size.
pub fn display_dpi(display: &Display) -> Result<Dpi, VideoError> {
    if display.dpi.diagonal == 0.0 {
        Err(VideoError::DpiUnavailable(display.index))
    } else {
        Ok(display.dpi)
    }
}
