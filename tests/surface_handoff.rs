use std::sync::Arc;
use std::thread;

use vmview::display::{
    CursorImage, CursorOverlayState, DirtyRegionDispatcher, DisplaySurface, PixelFormat, Rect,
    ScreenGeometry, SharedDisplayState, SurfaceHandoff,
};
use vmview::ui::{ui_queue, HeadlessToolkit, UiCommand};

fn cursor(width: u32, height: u32) -> CursorImage {
    CursorImage::new(width, height, vec![0xff; (width * height * 4) as usize].into())
}

#[test]
fn redraws_apply_only_to_their_own_surface() {
    let state = SharedDisplayState::new(ScreenGeometry::default());
    let (queue, rx) = ui_queue();
    let handoff = SurfaceHandoff::new(Arc::clone(&state), queue.clone());
    let dirty = DirtyRegionDispatcher::new(Arc::clone(&state), queue);

    handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
    dirty.schedule(Rect::new(0, 0, 8, 8));
    let second = handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
    dirty.schedule(Rect::new(8, 8, 8, 8));

    let mut toolkit = HeadlessToolkit::default();
    let mut applied = Vec::new();
    while let Some(command) = rx.try_recv() {
        match command {
            UiCommand::AdoptGeometry => {
                assert_eq!(handoff.adopt_geometry(&mut toolkit), Some(second));
            }
            UiCommand::Redraw { surface, rect } => {
                if dirty.apply(surface, rect, &mut toolkit) {
                    applied.push(surface);
                }
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
    assert_eq!(applied, vec![second]);
    assert_eq!(toolkit.invalidated(), &[Rect::new(8, 8, 8, 8)]);
}

#[test]
fn concurrent_switches_never_invalidate_a_stale_tag() {
    let state = SharedDisplayState::new(ScreenGeometry::default());
    let (queue, rx) = ui_queue();
    let handoff = Arc::new(SurfaceHandoff::new(Arc::clone(&state), queue.clone()));
    let dirty = Arc::new(DirtyRegionDispatcher::new(Arc::clone(&state), queue));

    let engine = {
        let handoff = Arc::clone(&handoff);
        let dirty = Arc::clone(&dirty);
        thread::spawn(move || {
            for i in 0..200u32 {
                handoff.switch_surface(
                    DisplaySurface::blank(64 + i % 3, 64, PixelFormat::Bgrx8888).unwrap(),
                );
                dirty.schedule(Rect::new(0, 0, 4, 4));
            }
        })
    };

    let mut toolkit = HeadlessToolkit::default();
    let mut applied = 0;
    let mut finished = false;
    loop {
        match rx.try_recv() {
            Some(UiCommand::AdoptGeometry) => {
                handoff.adopt_geometry(&mut toolkit);
            }
            Some(UiCommand::Redraw { surface, rect }) => {
                let current = state.current_surface_id();
                if dirty.apply(surface, rect, &mut toolkit) {
                    applied += 1;
                    assert!(surface <= current.unwrap());
                }
            }
            Some(other) => panic!("unexpected command: {other:?}"),
            None if finished => break,
            None => finished = engine.is_finished(),
        }
    }
    engine.join().unwrap();

    assert!(applied <= 200);
    assert_eq!(
        handoff.adopt_geometry(&mut toolkit),
        state.current_surface_id()
    );
    assert_eq!(toolkit.view_size().1, 64);
}

#[test]
fn redefining_a_visible_cursor_invalidates_old_and_new_bounds() {
    let state = SharedDisplayState::new(ScreenGeometry::default());
    let (queue, rx) = ui_queue();
    let handoff = SurfaceHandoff::new(Arc::clone(&state), queue.clone());
    let surface = handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
    let overlay = CursorOverlayState::new(
        Arc::clone(&state),
        DirtyRegionDispatcher::new(Arc::clone(&state), queue),
    );

    overlay.define(cursor(12, 20));
    overlay.move_to(40, 30, true);
    while rx.try_recv().is_some() {}

    overlay.define(cursor(24, 24));
    let mut redraws = Vec::new();
    while let Some(command) = rx.try_recv() {
        if let UiCommand::Redraw { surface: tag, rect } = command {
            assert_eq!(tag, surface);
            redraws.push(rect);
        }
    }
    assert_eq!(
        redraws,
        vec![Rect::new(40, 30, 12, 20), Rect::new(40, 30, 24, 24)]
    );

    let snapshot = handoff.render_snapshot();
    let placed = snapshot.cursor.expect("visible cursor in snapshot");
    assert_eq!((placed.x, placed.y, placed.image.width()), (40, 30, 24));
}
