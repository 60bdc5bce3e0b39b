// src/video/mod.rs

//! Display and video mode management on top of an `XServer` connection.
//!
//! `VideoSubsystem::init` probes RandR, Xinerama and XF86VidMode in that
//! order and lets the first one that reports a display own every display for
//! the rest of the session. When none does, the default screen is exposed as
//! a single display with a single fixed mode.
//!
//! The display list is a snapshot: hotplug and topology changes are not
//! tracked after initialization.

pub mod backends;
pub mod bounds;
pub mod error;
pub mod error_guard;
pub mod probe;
pub mod timing;
pub mod types;

use log::{debug, info, warn};
use once_cell::unsync::OnceCell;
use std::time::Instant;

pub use backends::Backend;
pub use error::VideoError;
pub use probe::Capabilities;
pub use types::{
    Capability, Display, DisplayHandle, Dpi, Extension, Mode, ModeHandle, PixelFormat, Rect,
    Rotation, UsableBounds,
};

use crate::config::{Config, ModeSwitchConfig};
use crate::server::XServer;

pub struct VideoSubsystem<S: XServer> {
    server: S,
    capabilities: Capabilities,
    backend: Backend,
    displays: Vec<Display>,
    /// Mode lists, filled per display on first request.
    modes: Vec<OnceCell<Vec<Mode>>>,
    mode_switch: ModeSwitchConfig,
    /// Until this instant, focus changes are assumed to be fallout from our
    /// own mode change.
    mode_change_deadline: Option<Instant>,
}

impl<S: XServer> VideoSubsystem<S> {
    /// Probes the extensions allowed by `config` and enumerates displays
    /// through the first one that reports any.
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::RequiredExtensionMissing)` if RandR is required
    ///   and unusable or reports no outputs.
    /// * `Err(VideoError::NoDisplays)` if not even the default screen could
    ///   be described.
    pub fn init(server: S, config: &Config) -> Result<Self, VideoError> {
        let mut capabilities = probe::probe_extensions(&server, &config.extensions)?;

        let mut chosen = None;
        for backend in Backend::PRIORITY {
            if !capabilities.get(backend.extension()).active {
                continue;
            }
            let displays = match backend.try_enumerate_displays(&server) {
                Ok(displays) => displays,
                Err(e) => {
                    warn!("Disabling {} for this session: {}", backend.extension(), e);
                    capabilities.deactivate(backend.extension());
                    Vec::new()
                }
            };
            if !displays.is_empty() {
                chosen = Some((backend, displays));
                break;
            }
            if backend == Backend::Xrandr && config.extensions.xrandr_required {
                return Err(VideoError::RequiredExtensionMissing(
                    "no usable outputs".to_string(),
                ));
            }
            debug!("{} reported no displays, trying the next extension", backend.extension());
        }
        let (backend, mut displays) = match chosen {
            Some(found) => found,
            None => (Backend::Core, Backend::Core.enumerate_displays(&server)),
        };
        if displays.is_empty() {
            return Err(VideoError::NoDisplays);
        }
        for (index, display) in displays.iter_mut().enumerate() {
            display.index = index;
        }
        info!(
            "Video initialized with {}: {} display(s)",
            backend.extension(),
            displays.len()
        );

        let modes = displays.iter().map(|_| OnceCell::new()).collect();

        Ok(Self {
            server,
            capabilities,
            backend,
            displays,
            modes,
            mode_switch: config.mode_switch.clone(),
            mode_change_deadline: None,
        })
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn display(&self, index: usize) -> Result<&Display, VideoError> {
        self.displays
            .get(index)
            .ok_or(VideoError::InvalidDisplay(index))
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn capability(&self, extension: Extension) -> Capability {
        self.capabilities.get(extension)
    }

    /// Extension that owns the displays of this session.
    pub fn active_extension(&self) -> Extension {
        self.backend.extension()
    }

    /// Modes the display can be switched to, largest first. The server is
    /// queried on the first call for each display; later calls return the
    /// same list.
    pub fn display_modes(&self, index: usize) -> Result<&[Mode], VideoError> {
        let display = self.display(index)?;
        let modes = self.modes[index].get_or_init(|| {
            Backend::for_extension(display.extension()).enumerate_modes(&self.server, display)
        });
        Ok(modes)
    }

    /// Switches a display to one of the modes returned by `display_modes`
    /// and opens the mode-change window.
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::InvalidDisplay)` if `index` is out of range.
    /// * `Err(VideoError::ModeExtensionMismatch)` if `mode` came from another
    ///   extension. The mode-change window is left untouched.
    /// * The backend's error if the switch failed. The current mode is kept.
    pub fn set_display_mode(&mut self, index: usize, mode: &Mode) -> Result<(), VideoError> {
        let extension = self.display(index)?.extension();
        if mode.handle.extension() != extension {
            return Err(VideoError::ModeExtensionMismatch {
                display: extension,
                mode: mode.handle.extension(),
            });
        }
        self.mode_change_deadline = Some(Instant::now() + self.mode_switch.change_window());
        Backend::for_extension(extension).set_mode(&self.server, &self.displays[index], mode)?;
        self.displays[index].current_mode = *mode;
        Ok(())
    }

    /// Puts every display back into the mode it had at initialization.
    /// Returns the first failure after trying all displays.
    pub fn restore_desktop_modes(&mut self) -> Result<(), VideoError> {
        let mut first_error = None;
        for index in 0..self.displays.len() {
            let display = &self.displays[index];
            if display.current_mode == display.desktop_mode {
                continue;
            }
            let desktop = display.desktop_mode;
            if let Err(e) = self.set_display_mode(index, &desktop) {
                warn!("Failed to restore desktop mode of display {}: {}", index, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Desktop rectangle of the display in its current mode.
    pub fn display_bounds(&self, index: usize) -> Result<Rect, VideoError> {
        Ok(bounds::display_bounds(&self.server, self.display(index)?))
    }

    /// Display bounds minus the areas the window manager reserves.
    pub fn display_usable_bounds(&self, index: usize) -> Result<UsableBounds, VideoError> {
        Ok(bounds::usable_bounds(&self.server, self.display(index)?))
    }

    /// DPI computed at enumeration.
    ///
    /// # Returns
    ///
    /// * `Err(VideoError::DpiUnavailable)` if the physical size is unknown.
    pub fn display_dpi(&self, index: usize) -> Result<Dpi, VideoError> {
        bounds::display_dpi(self.display(index)?)
    }

    /// Set by every mode change; focus events before it should not undo
    /// the change.
    pub fn mode_change_deadline(&self) -> Option<Instant> {
        self.mode_change_deadline
    }
}

#[cfg(test)]
mod fixtures;
