// src/main.rs

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;

use x11_display_modes::server::XServer;
use x11_display_modes::video::{
    Capabilities, Display, Dpi, Extension, Mode, Rect, UsableBounds, VideoSubsystem,
};
use x11_display_modes::{XlibConnection, CONFIG};

#[derive(Serialize)]
struct DisplayReport<'a> {
    display: &'a Display,
    bounds: Rect,
    usable_bounds: UsableBounds,
    dpi: Option<Dpi>,
    modes: &'a [Mode],
}

#[derive(Serialize)]
struct Report<'a> {
    active_extension: Extension,
    capabilities: &'a Capabilities,
    displays: Vec<DisplayReport<'a>>,
}

fn build_report<S: XServer>(video: &VideoSubsystem<S>) -> anyhow::Result<Report<'_>> {
    let mut displays = Vec::new();
    for display in video.displays() {
        let index = display.index;
        displays.push(DisplayReport {
            display,
            bounds: video.display_bounds(index)?,
            usable_bounds: video.display_usable_bounds(index)?,
            dpi: video.display_dpi(index).ok(),
            modes: video.display_modes(index)?,
        });
    }
    Ok(Report {
        active_extension: video.active_extension(),
        capabilities: video.capabilities(),
        displays,
    })
}

fn print_report(report: &Report<'_>) {
    println!("Active extension: {}", report.active_extension);
    let caps = report.capabilities;
    for (name, cap) in [
        ("XRandR", caps.xrandr),
        ("Xinerama", caps.xinerama),
        ("XVidMode", caps.xvidmode),
    ] {
        let version = cap
            .version
            .map(|v| format!("{}.{}", v.major, v.minor))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<9} present: {:<5} version: {:<5} active: {}",
            name, cap.present, version, cap.active
        );
    }

    for entry in &report.displays {
        let d = entry.display;
        let name = if d.name.is_empty() { "(unnamed)" } else { d.name.as_str() };
        println!();
        println!("Display {}: {}", d.index, name);
        let b = entry.bounds;
        println!("  bounds:        {}x{}+{}+{}", b.w, b.h, b.x, b.y);
        let u = entry.usable_bounds.rect;
        println!(
            "  usable bounds: {}x{}+{}+{}{}",
            u.w,
            u.h,
            u.x,
            u.y,
            if entry.usable_bounds.from_work_area { "" } else { " (no work area)" }
        );
        if d.width_mm > 0 && d.height_mm > 0 {
            println!("  size:          {}x{} mm", d.width_mm, d.height_mm);
        }
        match entry.dpi {
            Some(dpi) => println!(
                "  dpi:           {:.1} (h {:.1}, v {:.1})",
                dpi.diagonal, dpi.horizontal, dpi.vertical
            ),
            None => println!("  dpi:           unknown"),
        }
        println!(
            "  format:        {} bpp, depth {}, scanline pad {}",
            d.format.bits_per_pixel, d.format.depth, d.scanline_pad
        );
        println!("  modes:");
        for mode in entry.modes {
            let marker = if mode.same_shape(&d.current_mode) { "*" } else { " " };
            println!(
                "   {} {}x{} @ {} Hz",
                marker, mode.width, mode.height, mode.refresh_rate
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            other => warn!("Ignoring unknown argument '{}'", other),
        }
    }

    let connection = XlibConnection::new().context("Failed to connect to the X server")?;
    let video = VideoSubsystem::init(connection, &CONFIG).context("Failed to initialize video")?;
    info!(
        "Found {} display(s) via {}",
        video.displays().len(),
        video.active_extension()
    );

    let report = build_report(&video)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}
