// src/video/probe.rs

//! Extension detection.
//!
//! Each extension is probed once at initialization, in priority order. A
//! probe never fails: anything that goes wrong just leaves the extension
//! inactive. The one exception is a RandR requirement set in the
//! configuration, which turns an unusable RandR into an init error.

use log::{debug, info, warn};
use serde::Serialize;

use super::error::VideoError;
use super::error_guard::ErrorGuard;
use super::types::{Capability, Extension};
use crate::config::ExtensionsConfig;
use crate::server::{ExtensionName, ExtensionVersion, XServer};

/// Oldest RandR with primary outputs and cheap cached resource queries.
pub const RANDR_MIN_VERSION: ExtensionVersion = ExtensionVersion::new(1, 3);

/// Outcome of probing all three extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub xrandr: Capability,
    pub xinerama: Capability,
    pub xvidmode: Capability,
}

impl Capabilities {
    pub fn get(&self, extension: Extension) -> Capability {
        match extension {
            Extension::XRandR => self.xrandr,
            Extension::Xinerama => self.xinerama,
            Extension::XVidMode => self.xvidmode,
            Extension::None => Capability {
                present: true,
                version: None,
                active: true,
            },
        }
    }

    /// Marks an extension unusable for the rest of the session, keeping
    /// what the probe learned about its presence and version.
    pub fn deactivate(&mut self, extension: Extension) {
        let capability = match extension {
            Extension::XRandR => &mut self.xrandr,
            Extension::Xinerama => &mut self.xinerama,
            Extension::XVidMode => &mut self.xvidmode,
            Extension::None => return,
        };
        capability.active = false;
    }
}

/// Probes RandR, Xinerama and XF86VidMode as allowed by `config`.
///
/// # Returns
///
/// * `Err(VideoError::RequiredExtensionMissing)` if RandR is required but
///   disabled, missing or older than `RANDR_MIN_VERSION`.
/// * The capabilities of all three extensions otherwise.
pub fn probe_extensions<S: XServer>(
    server: &S,
    config: &ExtensionsConfig,
) -> Result<Capabilities, VideoError> {
    let xrandr = probe_xrandr(server, config.xrandr);
    if config.xrandr_required && !xrandr.active {
        let reason = match (config.xrandr, xrandr.present, xrandr.version) {
            (false, _, _) => "disabled by configuration".to_string(),
            (true, false, _) => "extension not present".to_string(),
            (true, true, Some(v)) => format!(
                "version {}.{} is older than {}.{}",
                v.major, v.minor, RANDR_MIN_VERSION.major, RANDR_MIN_VERSION.minor
            ),
            (true, true, None) => "version query failed".to_string(),
        };
        return Err(VideoError::RequiredExtensionMissing(reason));
    }

    let capabilities = Capabilities {
        xrandr,
        xinerama: probe_xinerama(server, config.xinerama),
        xvidmode: probe_vidmode(server, config.xvidmode),
    };
    debug!("Extension capabilities: {:?}", capabilities);
    Ok(capabilities)
}

fn probe_xrandr<S: XServer>(server: &S, enabled: bool) -> Capability {
    if !enabled {
        info!("XRandR disabled by configuration");
        return Capability::default();
    }
    let Some(version) = server.query_extension(ExtensionName::RandR) else {
        debug!("{} extension not available", ExtensionName::RandR.protocol_name());
        return Capability::default();
    };
    let active = version >= RANDR_MIN_VERSION;
    if active {
        debug!("XRandR {}.{} available", version.major, version.minor);
    } else {
        warn!(
            "XRandR {}.{} is too old, {}.{} or newer is needed",
            version.major, version.minor, RANDR_MIN_VERSION.major, RANDR_MIN_VERSION.minor
        );
    }
    Capability {
        present: true,
        version: Some(version),
        active,
    }
}

fn probe_xinerama<S: XServer>(server: &S, enabled: bool) -> Capability {
    if !enabled {
        info!("Xinerama disabled by configuration");
        return Capability::default();
    }
    // Some servers advertise Xinerama but fail its requests, so both the
    // version query and the activity check run under the trap.
    let guard = ErrorGuard::new(server);
    let version = server.query_extension(ExtensionName::Xinerama);
    let is_active = version.is_some() && server.xinerama_is_active();
    if guard.finish() {
        warn!("Xinerama raised an X error while probing, ignoring it");
        return Capability {
            present: version.is_some(),
            version,
            active: false,
        };
    }
    match version {
        Some(v) => {
            debug!("Xinerama {}.{} available, active: {}", v.major, v.minor, is_active);
            Capability {
                present: true,
                version,
                active: is_active,
            }
        }
        None => {
            debug!("{} extension not available", ExtensionName::Xinerama.protocol_name());
            Capability::default()
        }
    }
}

fn probe_vidmode<S: XServer>(server: &S, enabled: bool) -> Capability {
    if !enabled {
        info!("XVidMode disabled by configuration");
        return Capability::default();
    }
    match server.query_extension(ExtensionName::VidMode) {
        Some(v) => {
            debug!("XVidMode {}.{} available", v.major, v.minor);
            Capability {
                present: true,
                version: Some(v),
                active: true,
            }
        }
        None => {
            debug!("{} extension not available", ExtensionName::VidMode.protocol_name());
            Capability::default()
        }
    }
}
