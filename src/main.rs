use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vmview::display::{DisplaySurface, PixelFormat};
use vmview::engine::{EngineLock, RecordingEngine};
use vmview::logging;
use vmview::settings::Settings;
use vmview::ui::{
    ui_queue, ArboardPasteboard, HeadlessToolkit, HostPasteboard, MemoryPasteboard, Toolkit,
    UiLoop,
};
use vmview::DisplayShim;

const DEMO_FRAMES: i32 = 120;

fn main() -> anyhow::Result<()> {
    let settings_path =
        std::env::var("VMVIEW_SETTINGS").unwrap_or_else(|_| "settings.json".to_string());
    let settings = Settings::load(&settings_path)?;
    logging::init(
        settings.debug_logging,
        settings.log_file.as_ref().map(PathBuf::from),
    );

    if let Err(err) = settings.render_backend() {
        tracing::error!(%err, "startup failed");
        HeadlessToolkit::default().show_alert("Unable to start", &err.to_string());
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let engine = Arc::new(RecordingEngine::default());
    let (queue, rx) = ui_queue();
    let shim = Arc::new(DisplayShim::new(
        &settings,
        engine,
        Arc::new(EngineLock::new()),
        queue,
    ));

    let engine_thread = thread::Builder::new()
        .name("engine".to_string())
        .spawn({
            let shim = Arc::clone(&shim);
            move || run_engine(&shim, &args)
        })
        .map_err(|err| anyhow!("failed to spawn engine thread: {err}"))?;

    let mut ui = shim.handshake().ui_build(|| {
        let pasteboard: Box<dyn HostPasteboard> = match ArboardPasteboard::new() {
            Ok(pasteboard) => Box::new(pasteboard),
            Err(err) => {
                tracing::warn!(?err, "system clipboard unavailable, using in-memory pasteboard");
                Box::new(MemoryPasteboard::default())
            }
        };
        UiLoop::new(Arc::clone(&shim), rx, HeadlessToolkit::default(), pasteboard)
    });
    ui.run();

    engine_thread
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;
    Ok(())
}

/// Stand-in engine: one surface and a sweep of dirty rows.
fn run_engine(shim: &DisplayShim, args: &[String]) {
    tracing::info!(?args, "engine starting");
    let lock = Arc::clone(shim.engine_lock());
    let mut scope = lock.lock();
    shim.handshake().engine_display_init();

    if let Some(swap) = swap_option_command(args) {
        shim.set_swap_option_command(swap);
    }
    match DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888) {
        Ok(surface) => {
            shim.on_surface_ready(surface);
        }
        Err(err) => {
            tracing::error!(%err, "cannot allocate the initial surface");
            shim.alert("Display error", &err.to_string());
            drop(scope);
            shim.request_quit();
            return;
        }
    }
    if let Err(err) = scope.unlocked(|| shim.flush_ui()) {
        tracing::warn!(?err, "UI did not adopt the initial surface");
    }
    shim.on_run_state_changed(true);
    for frame in 0..DEMO_FRAMES {
        shim.on_region_dirty(0, (frame * 8) % 480, 640, 8);
        scope.unlocked(|| thread::sleep(Duration::from_millis(16)));
    }
    drop(scope);

    tracing::info!("engine finished");
    shim.request_quit();
}

/// `swap-opt-cmd=on|off` on the command line overrides the setting.
fn swap_option_command(args: &[String]) -> Option<bool> {
    args.iter()
        .filter_map(|arg| arg.strip_prefix("swap-opt-cmd="))
        .last()
        .and_then(|value| match value {
            "on" => Some(true),
            "off" => Some(false),
            other => {
                tracing::warn!(value = other, "ignoring swap-opt-cmd value");
                None
            }
        })
}
