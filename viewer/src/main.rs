mod compare;
mod display;
mod layout;

use std::path::PathBuf;
use std::time::Duration;

use aperture_match_common::config::Config;
use aperture_match_common::frame::Role;
use aperture_match_source::{build_client, build_stream_url, CameraSource, FrameSource};
use tracing::{error, info};

use compare::{run_compare_loop, CompareSettings};
use display::DisplayWindow;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: aperture-match <reference_serial> <target_serial> [config.toml]");
        std::process::exit(1);
    }
    let reference_serial = &args[1];
    let target_serial = &args[2];
    let config_path = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("aperture.toml"));

    let config = match Config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let reference_url = build_stream_url(&config.watchtower.url, reference_serial, config.stream.fps);
    let target_url = build_stream_url(&config.watchtower.url, target_serial, config.stream.fps);

    info!(
        reference = reference_serial,
        target = target_serial,
        reference_url,
        target_url,
        roi_fraction = config.roi.fraction,
        "starting aperture comparison"
    );

    let client = match build_client(&config.watchtower) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    // Reader tasks live on this runtime. The display loop itself stays on
    // the main thread: HighGUI event handling must run there.
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            std::process::exit(1);
        }
    };

    let mut reference = CameraSource::open(
        runtime.handle(),
        Role::Reference,
        reference_serial,
        reference_url,
        client.clone(),
        config.stream.max_frame_bytes,
    );
    let mut target = CameraSource::open(
        runtime.handle(),
        Role::Target,
        target_serial,
        target_url,
        client,
        config.stream.max_frame_bytes,
    );

    let mut window = match DisplayWindow::open(&config.display.window_title, config.display.quit_key)
    {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "failed to open display window");
            reference.close();
            target.close();
            std::process::exit(1);
        }
    };

    info!(quit_key = %config.display.quit_key, "streams opening; press the quit key in the window to exit");

    let settings = CompareSettings {
        roi_fraction: config.roi.fraction,
        poll_timeout: Duration::from_millis(config.display.poll_timeout_ms),
    };
    let result = run_compare_loop(&mut reference, &mut target, &mut window, &settings);
    window.close();

    match result {
        Ok(()) => info!("shutdown complete"),
        Err(e) => {
            error!(error = %e, "comparison failed");
            std::process::exit(1);
        }
    }
}
