// src/video/backends/mod.rs

//! Per-extension display enumeration and mode setting.
//!
//! Exactly one `Backend` drives a session. Every display it returns carries
//! a `DisplayHandle` of the matching variant, and `set_mode` is only ever
//! called with displays and modes of its own extension.

pub mod fallback;
pub mod vidmode;
pub mod xinerama;
pub mod xrandr;

use log::{trace, warn};

use super::error::VideoError;
use super::types::{Display, Extension, Mode, PixelFormat};
use crate::server::XServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Xrandr,
    Xinerama,
    VidMode,
    Core,
}

impl Backend {
    /// Extension backends in the order they are tried.
    pub const PRIORITY: [Backend; 3] = [Backend::Xrandr, Backend::Xinerama, Backend::VidMode];

    pub fn extension(self) -> Extension {
        match self {
            Backend::Xrandr => Extension::XRandR,
            Backend::Xinerama => Extension::Xinerama,
            Backend::VidMode => Extension::XVidMode,
            Backend::Core => Extension::None,
        }
    }

    pub fn for_extension(extension: Extension) -> Self {
        match extension {
            Extension::XRandR => Backend::Xrandr,
            Extension::Xinerama => Backend::Xinerama,
            Extension::XVidMode => Backend::VidMode,
            Extension::None => Backend::Core,
        }
    }

    /// Displays visible through this backend, indexed from 0.
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::ServerError)` if a query raised an X error, in
    ///   which case the extension should not be used again this session.
    /// * An empty list if the extension reports nothing usable.
    pub fn try_enumerate_displays<S: XServer>(self, server: &S) -> Result<Vec<Display>, VideoError> {
        match self {
            Backend::Xrandr => Ok(xrandr::enumerate_displays(server)),
            Backend::Xinerama => xinerama::enumerate_displays(server),
            Backend::VidMode => Ok(vidmode::enumerate_displays(server)),
            Backend::Core => Ok(fallback::enumerate_displays(server)),
        }
    }

    /// Like `try_enumerate_displays`, with errors logged and reported as no
    /// displays.
    pub fn enumerate_displays<S: XServer>(self, server: &S) -> Vec<Display> {
        self.try_enumerate_displays(server).unwrap_or_else(|e| {
            warn!("{} enumeration failed: {}", self.extension(), e);
            Vec::new()
        })
    }

    /// Modes a display can be switched to, largest first. The desktop mode
    /// is always included.
    pub fn enumerate_modes<S: XServer>(self, server: &S, display: &Display) -> Vec<Mode> {
        let modes = match self {
            Backend::Xrandr => xrandr::enumerate_modes(server, display),
            Backend::VidMode => vidmode::enumerate_modes(server, display),
            Backend::Xinerama | Backend::Core => Vec::new(),
        };
        normalize_modes(modes, &display.desktop_mode)
    }

    /// Switches `display` to `mode`.
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::ModeExtensionMismatch)` if the display or mode
    ///   belongs to another extension.
    /// * `Err(VideoError::UnsupportedModeSwitch)` for a non-desktop mode on
    ///   Xinerama or core displays.
    /// * `Err(VideoError::ModeSetFailed)` if the server rejected the change.
    pub fn set_mode<S: XServer>(self, server: &S, display: &Display, mode: &Mode) -> Result<(), VideoError> {
        match self {
            Backend::Xrandr => xrandr::set_mode(server, display, mode),
            Backend::VidMode => vidmode::set_mode(server, display, mode),
            Backend::Xinerama | Backend::Core => {
                if mode.same_shape(&display.desktop_mode) {
                    trace!("Desktop mode requested on display {}, nothing to do", display.index);
                    Ok(())
                } else {
                    Err(VideoError::UnsupportedModeSwitch(self.extension()))
                }
            }
        }
    }
}

/// Drops duplicates, makes sure the desktop mode is listed and sorts the
/// result largest first.
fn normalize_modes(modes: Vec<Mode>, desktop: &Mode) -> Vec<Mode> {
    let mut out: Vec<Mode> = Vec::with_capacity(modes.len() + 1);
    for mode in std::iter::once(*desktop).chain(modes) {
        if !out.iter().any(|m| m.same_shape(&mode)) {
            out.push(mode);
        }
    }
    out.sort_by(|a, b| {
        (b.width, b.height, b.refresh_rate, b.format.bits_per_pixel).cmp(&(
            a.width,
            a.height,
            a.refresh_rate,
            a.format.bits_per_pixel,
        ))
    });
    out
}

/// Pixel format and scanline pad of a screen's default visual. `None` when
/// the screen has no default visual.
pub(crate) fn screen_format<S: XServer>(server: &S, screen: i32) -> Option<(PixelFormat, i32)> {
    let Some(visual) = server.default_visual(screen) else {
        warn!("Screen {} has no default visual", screen);
        return None;
    };
    let pixmap = server
        .pixmap_formats()
        .into_iter()
        .find(|f| f.depth == visual.depth);
    let bits_per_pixel = match pixmap {
        Some(f) => f.bits_per_pixel,
        None => match visual.depth {
            d if d > 16 => 32,
            d if d > 8 => 16,
            _ => 8,
        },
    };
    let scanline_pad = pixmap.map_or(bits_per_pixel, |f| f.scanline_pad);
    let format = PixelFormat {
        bits_per_pixel: bits_per_pixel as u32,
        depth: visual.depth as u32,
        red_mask: visual.red_mask as u32,
        green_mask: visual.green_mask as u32,
        blue_mask: visual.blue_mask as u32,
    };
    Some((format, scanline_pad))
}
