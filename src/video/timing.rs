// src/video/timing.rs

//! Physical metrics derived from raw timing and size data.

use super::types::{Dpi, Rotation};

const MM_PER_INCH: f32 = 25.4;

/// Refresh rate of a RandR mode. `dot_clock` is in Hz.
pub fn randr_refresh_rate(dot_clock: u64, h_total: u32, v_total: u32) -> i32 {
    if h_total == 0 || v_total == 0 {
        return 0;
    }
    (dot_clock as f64 / (h_total as f64 * v_total as f64)).round() as i32
}

/// Refresh rate of a VidMode modeline. `dot_clock_khz` is in kHz.
pub fn vidmode_refresh_rate(dot_clock_khz: u32, h_total: u16, v_total: u16) -> i32 {
    if h_total == 0 || v_total == 0 {
        return 0;
    }
    (dot_clock_khz as f64 * 1000.0 / (h_total as f64 * v_total as f64)).round() as i32
}

/// Mode size as seen on screen once the CRTC rotation is applied.
pub fn oriented_size(width: u32, height: u32, rotation: Rotation) -> (i32, i32) {
    if rotation.is_quarter_turn() {
        (height as i32, width as i32)
    } else {
        (width as i32, height as i32)
    }
}

/// DPI from pixel and millimeter sizes. Each component is 0 when its
/// physical size is unknown.
pub fn compute_dpi(width_px: i32, height_px: i32, width_mm: i32, height_mm: i32) -> Dpi {
    let per_inch = |px: i32, mm: i32| {
        if mm > 0 {
            px as f32 * MM_PER_INCH / mm as f32
        } else {
            0.0
        }
    };

    let diagonal_px = ((width_px as f32).powi(2) + (height_px as f32).powi(2)).sqrt();
    let w_in = width_mm.max(0) as f32 / MM_PER_INCH;
    let h_in = height_mm.max(0) as f32 / MM_PER_INCH;
    let diagonal_in = (w_in * w_in + h_in * h_in).sqrt();

    Dpi {
        diagonal: if diagonal_in > 0.0 {
            diagonal_px / diagonal_in
        } else {
            0.0
        },
        horizontal: per_inch(width_px, width_mm),
        vertical: per_inch(height_px, height_mm),
    }
}

/// Screen diagonal in whole inches.
pub fn diagonal_inches(width_mm: u64, height_mm: u64) -> u32 {
    let w = width_mm as f64;
    let h = height_mm as f64;
    ((w * w + h * h).sqrt() / MM_PER_INCH as f64).round() as u32
}
