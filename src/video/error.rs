// src/video/error.rs

use thiserror::Error;

use super::types::Extension;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoError {
    #[error("XRandR is required but unusable: {0}")]
    RequiredExtensionMissing(String),
    #[error("No displays found")]
    NoDisplays,
    #[error("Display index {0} is out of range")]
    InvalidDisplay(usize),
    #[error("Mode belongs to {mode}, but display is driven by {display}")]
    ModeExtensionMismatch { display: Extension, mode: Extension },
    #[error("Failed to set mode on display {index}: {reason}")]
    ModeSetFailed { index: usize, reason: String },
    #[error("{0} displays only support their desktop mode")]
    UnsupportedModeSwitch(Extension),
    #[error("Display {0} has no physical size, DPI unavailable")]
    DpiUnavailable(usize),
    #[error("{0} raised an X error")]
    ServerError(&'static str),
}
