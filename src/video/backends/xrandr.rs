// src/video/backends/xrandr.rs

//! RandR 1.3+ backend: one display per connected, CRTC-driven output.

use log::{debug, warn};

use super::screen_format;
use crate::edid;
use crate::server::{
    OutputConnection, RandrModeInfo, RandrResources, XServer, Xid, XA_INTEGER,
};
use crate::video::error::VideoError;
use crate::video::timing::{compute_dpi, diagonal_inches, oriented_size, randr_refresh_rate};
use crate::video::types::{Display, DisplayHandle, Mode, ModeHandle, PixelFormat, Rotation};

/// EDID property length to request, in 32-bit units. Enough for the base
/// block and most of the first extension block.
const EDID_FETCH_WORDS: i64 = 100;

pub fn enumerate_displays<S: XServer>(server: &S) -> Vec<Display> {
    let mut displays = Vec::new();
    for screen in 0..server.screen_count() {
        let Some((format, scanline_pad)) = screen_format(server, screen) else {
            warn!("Skipping screen {}: no usable visual", screen);
            continue;
        };
        let Some(resources) = current_resources(server, screen) else {
            warn!("Skipping screen {}: RandR screen resources unavailable", screen);
            continue;
        };
        let primary = server.randr_output_primary(server.root_window(screen));

        // Primary first, then the rest in server order.
        for primary_pass in [true, false] {
            for &output in resources
                .outputs
                .iter()
                .filter(|&&o| (o == primary) == primary_pass)
            {
                let index = displays.len();
                if let Some(display) =
                    output_display(server, &resources, screen, output, index, format, scanline_pad)
                {
                    displays.push(display);
                }
            }
        }
    }
    displays
}

/// Cached resources first, then a full (probing) query.
fn current_resources<S: XServer>(server: &S, screen: i32) -> Option<RandrResources> {
    server
        .randr_screen_resources(screen, true)
        .or_else(|| server.randr_screen_resources(screen, false))
}

/// Full resources first, since the cached set may omit modes of outputs
/// that were never probed.
fn mode_resources<S: XServer>(server: &S, screen: i32) -> Option<RandrResources> {
    server
        .randr_screen_resources(screen, false)
        .or_else(|| server.randr_screen_resources(screen, true))
}

fn output_display<S: XServer>(
    server: &S,
    resources: &RandrResources,
    screen: i32,
    output: Xid,
    index: usize,
    format: PixelFormat,
    scanline_pad: i32,
) -> Option<Display> {
    let Some(info) = server.randr_output_info(resources.config_timestamp, output) else {
        warn!("Skipping output {:#x}: no output info", output);
        return None;
    };
    if info.connection != OutputConnection::Connected || info.crtc == 0 {
        debug!("Output {} is not driving a display", info.name);
        return None;
    }
    let Some(crtc) = server.randr_crtc_info(resources.config_timestamp, info.crtc) else {
        warn!("Skipping output {}: no info for CRTC {:#x}", info.name, info.crtc);
        return None;
    };
    let Some(mode_info) = resources.mode(crtc.mode) else {
        warn!("Skipping output {}: unknown mode {:#x}", info.name, crtc.mode);
        return None;
    };

    let rotation = Rotation::from_bits_truncate(crtc.rotation);
    let mode = randr_mode(mode_info, rotation, format);
    let name = edid_name(server, output, info.mm_width, info.mm_height)
        .unwrap_or_else(|| info.name.clone());
    let width_mm = info.mm_width as i32;
    let height_mm = info.mm_height as i32;
    debug!(
        "Display {}: {} {}x{}@{}Hz at ({}, {})",
        index, name, mode.width, mode.height, mode.refresh_rate, crtc.x, crtc.y
    );

    Some(Display {
        index,
        handle: DisplayHandle::Xrandr { screen, output },
        name,
        x: crtc.x,
        y: crtc.y,
        width_mm: if width_mm > 0 { width_mm } else { -1 },
        height_mm: if height_mm > 0 { height_mm } else { -1 },
        dpi: compute_dpi(mode.width, mode.height, width_mm, height_mm),
        scanline_pad,
        format,
        current_mode: mode,
        desktop_mode: mode,
    })
}

fn randr_mode(info: &RandrModeInfo, rotation: Rotation, format: PixelFormat) -> Mode {
    let (width, height) = oriented_size(info.width, info.height, rotation);
    Mode {
        width,
        height,
        refresh_rate: randr_refresh_rate(info.dot_clock, info.h_total, info.v_total),
        format,
        handle: ModeHandle::Xrandr { mode: info.id },
    }
}

/// Monitor product name from the output's EDID, with the screen diagonal
/// appended when the physical size is known.
fn edid_name<S: XServer>(server: &S, output: Xid, width_mm: u64, height_mm: u64) -> Option<String> {
    let atom = server.intern_atom("EDID", true);
    if atom == 0 || !server.randr_output_properties(output).contains(&atom) {
        return None;
    }
    let reply = server.randr_output_property(output, atom, EDID_FETCH_WORDS)?;
    if reply.type_atom != XA_INTEGER || reply.format != 8 {
        debug!(
            "EDID property of output {:#x} has type {} format {}",
            output, reply.type_atom, reply.format
        );
        return None;
    }
    let info = match edid::decode(&reply.bytes) {
        Ok(info) => info,
        Err(e) => {
            debug!("Ignoring EDID of output {:#x}: {}", output, e);
            return None;
        }
    };
    if !info.checksum_ok() {
        debug!("EDID checksum mismatch on output {:#x}", output);
    }
    let mut name = info.product_name?;
    if width_mm > 0 && height_mm > 0 {
        name.push_str(&format!(" {}\"", diagonal_inches(width_mm, height_mm)));
    }
    Some(name)
}

pub fn enumerate_modes<S: XServer>(server: &S, display: &Display) -> Vec<Mode> {
    let DisplayHandle::Xrandr { screen, output } = display.handle else {
        return Vec::new();
    };
    let Some(resources) = mode_resources(server, screen) else {
        warn!("RandR screen resources unavailable for display {}", display.index);
        return Vec::new();
    };
    let Some(info) = server.randr_output_info(resources.config_timestamp, output) else {
        return Vec::new();
    };
    let rotation = server
        .randr_crtc_info(resources.config_timestamp, info.crtc)
        .map_or(Rotation::ROTATE_0, |c| Rotation::from_bits_truncate(c.rotation));

    info.modes
        .iter()
        .filter_map(|&id| match resources.mode(id) {
            Some(mode) => Some(randr_mode(mode, rotation, display.format)),
            None => {
                debug!("Output {} lists unknown mode {:#x}", info.name, id);
                None
            }
        })
        .collect()
}

pub fn set_mode<S: XServer>(server: &S, display: &Display, mode: &Mode) -> Result<(), VideoError> {
    let fail = |reason: String| VideoError::ModeSetFailed {
        index: display.index,
        reason,
    };
    let (DisplayHandle::Xrandr { screen, output }, ModeHandle::Xrandr { mode: mode_id }) =
        (display.handle, mode.handle)
    else {
        return Err(VideoError::ModeExtensionMismatch {
            display: display.extension(),
            mode: mode.handle.extension(),
        });
    };

    // The CRTC driving the output may have changed since enumeration.
    let resources = current_resources(server, screen)
        .ok_or_else(|| fail("screen resources unavailable".into()))?;
    let info = server
        .randr_output_info(resources.config_timestamp, output)
        .ok_or_else(|| fail(format!("output {:#x} vanished", output)))?;
    if info.crtc == 0 {
        return Err(fail(format!("output {} has no CRTC", info.name)));
    }
    let crtc = server
        .randr_crtc_info(resources.config_timestamp, info.crtc)
        .ok_or_else(|| fail(format!("CRTC {:#x} vanished", info.crtc)))?;

    debug!(
        "Setting output {} to mode {:#x} ({}x{}@{}Hz)",
        info.name, mode_id, mode.width, mode.height, mode.refresh_rate
    );
    if server.randr_set_crtc_config(
        resources.config_timestamp,
        info.crtc,
        crtc.x,
        crtc.y,
        mode_id,
        crtc.rotation,
        &[output],
    ) {
        Ok(())
    } else {
        Err(fail(format!("XRRSetCrtcConfig rejected mode {:#x}", mode_id)))
    }
}
