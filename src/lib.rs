// src/lib.rs

//! Display and video mode discovery for X11.
//!
//! The crate picks one of RandR, Xinerama or XF86VidMode per session,
//! enumerates displays and their modes through it, and applies mode changes
//! back to the server. `server::XServer` is the only place the X protocol is
//! touched, so everything above it runs against a scripted server in tests.

pub mod config;
pub mod edid;
pub mod server;
pub mod video;

pub use config::{Config, CONFIG};
pub use server::connection::XlibConnection;
pub use video::{VideoError, VideoSubsystem};
