mod app;
mod capture;
mod display;
mod drawing;
mod rect_selector;

use app::{App, LIVE_WINDOW, PLANE_WINDOW};
use capture::{open_source, SourceSpec};
use clap::Parser;
use display::HighGuiDisplay;
use plane_tracker::PlaneTracker;

/// Interactive planar object tracking with ORB features and homographies.
///
/// Drag a box around a textured planar object to start tracking it.
/// SPACE pauses the video, ESC quits.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Video source: device index, file path, URL or `synth`, optionally
    /// followed by `:key=value` parameters (size, noise, bg, fg)
    #[arg(default_value = "0")]
    source: String,
}

fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = Args::parse();

    let spec: SourceSpec = args.source.parse()?;
    let source = open_source(&spec)?;

    log::info!("Creating plane tracker");
    let tracker = PlaneTracker::new()?;
    let display = HighGuiDisplay::open(&[PLANE_WINDOW, LIVE_WINDOW])?;

    let mut app = App::new(source, display, tracker)?;
    log::info!("Select a textured planar object by dragging a box. SPACE pauses, ESC quits");
    app.run()?;
    log::info!("Stopped after {} frames", app.frames_read());

    Ok(())
}

fn setup_logging() {
    simple_log::quick!();
}
