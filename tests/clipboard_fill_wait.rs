use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vmview::clipboard::{ClipboardFill, ClipboardInfo, ClipboardSelection, ClipboardType, PeerId};
use vmview::engine::{EngineCall, EngineLock, RecordingEngine};
use vmview::settings::Settings;
use vmview::shim::{DisplayShim, HOST_PEER};
use vmview::ui::{ui_queue, UiReceiver};

const GUEST: PeerId = PeerId(2);

fn shim() -> (Arc<DisplayShim>, Arc<RecordingEngine>, UiReceiver) {
    let engine = Arc::new(RecordingEngine::default());
    let (queue, rx) = ui_queue();
    let shim = Arc::new(DisplayShim::new(
        &Settings::default(),
        engine.clone(),
        Arc::new(EngineLock::new()),
        queue,
    ));
    (shim, engine, rx)
}

fn guest_text_clipboard() -> Arc<ClipboardInfo> {
    let info = Arc::new(ClipboardInfo::new(GUEST, ClipboardSelection::Clipboard));
    info.mark_available(ClipboardType::Text);
    info
}

fn wait_for_request(engine: &RecordingEngine) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !engine
        .calls()
        .iter()
        .any(|call| matches!(call, EngineCall::ClipboardRequest { .. }))
    {
        assert!(Instant::now() < deadline, "no clipboard request reached the engine");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn fill_completes_when_the_guest_supplies_data() {
    let (shim, engine, _rx) = shim();
    let info = guest_text_clipboard();
    shim.on_clipboard_owner_changed(info.clone());

    let guest = {
        let shim = Arc::clone(&shim);
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            wait_for_request(&engine);
            shim.engine_lock().with_lock(|_| {
                info.set_data(ClipboardType::Text, b"from guest".to_vec());
                shim.on_clipboard_owner_changed(info);
            });
        })
    };

    let fill = shim.provide_host_clipboard(ClipboardType::Text);
    guest.join().unwrap();
    assert_eq!(fill, ClipboardFill::Filled(b"from guest".to_vec()));
}

#[test]
fn replacing_the_clipboard_mid_wait_abandons_the_fill() {
    let (shim, engine, _rx) = shim();
    shim.on_clipboard_owner_changed(guest_text_clipboard());

    let guest = {
        let shim = Arc::clone(&shim);
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            wait_for_request(&engine);
            shim.engine_lock().with_lock(|_| {
                shim.on_clipboard_owner_changed(guest_text_clipboard());
            });
        })
    };

    let fill = shim.provide_host_clipboard(ClipboardType::Text);
    guest.join().unwrap();
    assert_eq!(fill, ClipboardFill::Abandoned);
}

#[test]
fn fill_from_inside_a_held_lock_is_abandoned() {
    let (shim, engine, _rx) = shim();
    shim.on_clipboard_owner_changed(guest_text_clipboard());

    let fill = shim
        .engine_lock()
        .with_lock(|_| shim.provide_host_clipboard(ClipboardType::Text));
    assert_eq!(fill, ClipboardFill::Abandoned);
    assert!(engine.calls().is_empty());
}

#[test]
fn host_owned_clipboard_is_never_filled_from_the_guest() {
    let (shim, engine, _rx) = shim();
    let mut pasteboard = vmview::ui::MemoryPasteboard::with_text("host");
    assert!(shim.clipboard().refresh_from_host(&mut pasteboard));
    assert_eq!(shim.clipboard().current().unwrap().owner(), HOST_PEER);

    assert_eq!(
        shim.provide_host_clipboard(ClipboardType::Text),
        ClipboardFill::Unavailable
    );
    assert!(!engine
        .calls()
        .iter()
        .any(|call| matches!(call, EngineCall::ClipboardRequest { .. })));
}
