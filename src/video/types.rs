// src/video/types.rs

//! Normalized display and mode records shared by every backend.

use bitflags::bitflags;
use serde::Serialize;

use crate::server::{ExtensionVersion, VidModeLine, Xid};

/// The extension that owns a display for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Extension {
    XRandR,
    Xinerama,
    XVidMode,
    /// No extension; the default screen as a single display.
    None,
}

impl std::fmt::Display for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Extension::XRandR => "XRandR",
            Extension::Xinerama => "Xinerama",
            Extension::XVidMode => "XVidMode",
            Extension::None => "core",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// RandR rotation and reflection bits as reported on a CRTC.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Rotation: u16 {
        const ROTATE_0 = 1 << 0;
        const ROTATE_90 = 1 << 1;
        const ROTATE_180 = 1 << 2;
        const ROTATE_270 = 1 << 3;
        const REFLECT_X = 1 << 4;
        const REFLECT_Y = 1 << 5;
    }
}

impl Rotation {
    /// Whether the output is turned sideways, swapping width and height.
    pub fn is_quarter_turn(self) -> bool {
        self.intersects(Rotation::ROTATE_90 | Rotation::ROTATE_270)
    }
}

/// Presence and usability of one extension, fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capability {
    pub present: bool,
    /// Negotiated version; `None` when the extension was never queried.
    pub version: Option<ExtensionVersion>,
    pub active: bool,
}

/// Packed pixel layout of a screen's default visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelFormat {
    pub bits_per_pixel: u32,
    pub depth: u32,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
}

impl Default for PixelFormat {
    /// 32-bit XRGB8888, the format of every modern TrueColor visual.
    fn default() -> Self {
        PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            red_mask: 0x00FF_0000,
            green_mask: 0x0000_FF00,
            blue_mask: 0x0000_00FF,
        }
    }
}

/// How to find a display again on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DisplayHandle {
    Xrandr { screen: i32, output: Xid },
    Xinerama { screen: i32, screen_number: i32 },
    VidMode { screen: i32 },
    Core { screen: i32 },
}

impl DisplayHandle {
    pub fn extension(&self) -> Extension {
        match self {
            DisplayHandle::Xrandr { .. } => Extension::XRandR,
            DisplayHandle::Xinerama { .. } => Extension::Xinerama,
            DisplayHandle::VidMode { .. } => Extension::XVidMode,
            DisplayHandle::Core { .. } => Extension::None,
        }
    }

    /// X screen whose root window hosts the display.
    pub fn screen(&self) -> i32 {
        match *self {
            DisplayHandle::Xrandr { screen, .. }
            | DisplayHandle::Xinerama { screen, .. }
            | DisplayHandle::VidMode { screen }
            | DisplayHandle::Core { screen } => screen,
        }
    }
}

/// How to request a mode again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModeHandle {
    Xrandr { mode: Xid },
    Xinerama,
    VidMode(VidModeLine),
    Core,
}

impl ModeHandle {
    pub fn extension(&self) -> Extension {
        match self {
            ModeHandle::Xrandr { .. } => Extension::XRandR,
            ModeHandle::Xinerama => Extension::Xinerama,
            ModeHandle::VidMode(_) => Extension::XVidMode,
            ModeHandle::Core => Extension::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Mode {
    /// Width after rotation.
    pub width: i32,
    /// Height after rotation.
    pub height: i32,
    /// Whole hertz; 0 when unknown.
    pub refresh_rate: i32,
    pub format: PixelFormat,
    pub handle: ModeHandle,
}

impl Mode {
    /// Equal size, refresh and format, ignoring the server handle.
    pub fn same_shape(&self, other: &Mode) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.refresh_rate == other.refresh_rate
            && self.format == other.format
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Dpi {
    pub diagonal: f32,
    pub horizontal: f32,
    pub vertical: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Overlap of two rectangles, or `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        // Far edges can exceed i32::MAX.
        let end = |start: i32, len: i32| i64::from(start) + i64::from(len);
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = end(self.x, self.w).min(end(other.x, other.w));
        let y1 = end(self.y, self.h).min(end(other.y, other.h));
        let w = i32::try_from(x1 - i64::from(x0)).ok()?;
        let h = i32::try_from(y1 - i64::from(y0)).ok()?;
        let rect = Rect::new(x0, y0, w, h);
        (!rect.is_empty()).then_some(rect)
    }
}

/// Usable area of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsableBounds {
    pub rect: Rect,
    /// `false` when no work area was published and `rect` is the full bounds.
    pub from_work_area: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Display {
    pub index: usize,
    pub handle: DisplayHandle,
    pub name: String,
    pub x: i32,
    pub y: i32,
    /// Physical size, -1 when unknown.
    pub width_mm: i32,
    pub height_mm: i32,
    pub dpi: Dpi,
    pub scanline_pad: i32,
    pub format: PixelFormat,
    pub current_mode: Mode,
    /// Mode in effect when the display was enumerated.
    pub desktop_mode: Mode,
}

impl Display {
    pub fn extension(&self) -> Extension {
        self.handle.extension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_are_detected() {
        assert!(Rotation::ROTATE_90.is_quarter_turn());
        assert!((Rotation::ROTATE_270 | Rotation::REFLECT_X).is_quarter_turn());
        assert!(!Rotation::ROTATE_0.is_quarter_turn());
        assert!(!(Rotation::ROTATE_180 | Rotation::REFLECT_Y).is_quarter_turn());
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let screen = Rect::new(0, 0, 1920, 1080);
        let work = Rect::new(0, 32, 1920, 2000);
        assert_eq!(screen.intersection(&work), Some(Rect::new(0, 32, 1920, 1048)));
    }

    #[test]
    fn disjoint_rects_do_not_intersect() {
        let left = Rect::new(0, 0, 100, 100);
        let right = Rect::new(100, 0, 100, 100);
        assert_eq!(left.intersection(&right), None);
        assert_eq!(left.intersection(&Rect::default()), None);
    }

    #[test]
    fn intersection_near_i32_max_does_not_overflow() {
        let far = Rect::new(i32::MAX - 10, 0, 100, 100);
        assert_eq!(far.intersection(&far), Some(far));
        assert_eq!(Rect::new(0, 0, 1920, 1080).intersection(&far), None);
        assert_eq!(
            Rect::new(0, 0, 1920, 1080).intersection(&Rect::new(1900, 0, i32::MAX, 1080)),
            Some(Rect::new(1900, 0, 20, 1080))
        );
    }

    #[test]
    fn handles_report_their_extension() {
        let display = DisplayHandle::Xinerama {
            screen: 0,
            screen_number: 2,
        };
        assert_eq!(display.extension(), Extension::Xinerama);
        assert_eq!(display.screen(), 0);
        assert_eq!(ModeHandle::Xrandr { mode: 7 }.extension(), Extension::XRandR);
        assert_eq!(ModeHandle::Core.extension(), Extension::None);
    }
}
