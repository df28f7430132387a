//! Startup ordering between the engine thread and the UI thread.
//!
//! The engine signals `display_ready` when it reaches display
//! initialisation and then parks on `app_ready` while still holding the
//! engine lock. The UI thread builds its toolkit objects in that window and
//! releases the engine once its loop is running.

use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    Constructing,
    DisplayReady,
    Running,
}

pub fn can_transition(from: StartupPhase, to: StartupPhase) -> bool {
    matches!(
        (from, to),
        (StartupPhase::Constructing, StartupPhase::DisplayReady)
            | (StartupPhase::DisplayReady, StartupPhase::Running)
    ) || from == to
}

/// Counting semaphore.
#[derive(Debug, Default)]
pub struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub fn post(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        self.cond.notify_one();
    }

    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count == 0 {
            count = self.cond.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }
}

#[derive(Debug)]
pub struct StartupHandshake {
    display_ready: Semaphore,
    app_ready: Semaphore,
    phase: Mutex<StartupPhase>,
}

impl Default for StartupHandshake {
    fn default() -> Self {
        Self {
            display_ready: Semaphore::default(),
            app_ready: Semaphore::default(),
            phase: Mutex::new(StartupPhase::Constructing),
        }
    }
}

impl StartupHandshake {
    pub fn phase(&self) -> StartupPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Engine thread, engine lock held: announce the display and park until
    /// the UI loop is running.
    pub fn engine_display_init(&self) {
        tracing::debug!("engine reached display init");
        self.display_ready.post();
        self.app_ready.wait();
        tracing::debug!("engine released by UI loop");
    }

    /// UI thread: block until the engine is parked in display init.
    pub fn ui_await_display(&self) {
        self.display_ready.wait();
        self.advance(StartupPhase::DisplayReady);
    }

    /// UI thread: wait for the engine, then build toolkit objects while it
    /// stays parked.
    pub fn ui_build<R>(&self, build: impl FnOnce() -> R) -> R {
        if self.phase() == StartupPhase::Constructing {
            self.ui_await_display();
        }
        build()
    }

    /// UI thread, first loop iteration: release the engine. Later calls do
    /// nothing.
    pub fn ui_loop_started(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase == StartupPhase::Running {
            return;
        }
        if !can_transition(*phase, StartupPhase::Running) {
            tracing::warn!(?phase, "UI loop started before the engine reached display init");
        }
        *phase = StartupPhase::Running;
        drop(phase);
        self.app_ready.post();
    }

    fn advance(&self, next: StartupPhase) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if can_transition(*phase, next) {
            *phase = next;
        } else {
            tracing::warn!(from = ?*phase, to = ?next, "ignoring startup phase transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn engine_stays_parked_until_loop_starts() {
        let handshake = Arc::new(StartupHandshake::default());
        let released = Arc::new(AtomicBool::new(false));

        let engine = {
            let handshake = Arc::clone(&handshake);
            let released = Arc::clone(&released);
            thread::spawn(move || {
                handshake.engine_display_init();
                released.store(true, Ordering::SeqCst);
            })
        };

        let built = handshake.ui_build(|| {
            thread::sleep(Duration::from_millis(20));
            released.load(Ordering::SeqCst)
        });
        assert!(!built, "engine must stay parked while the UI builds");
        assert_eq!(handshake.phase(), StartupPhase::DisplayReady);

        handshake.ui_loop_started();
        engine.join().unwrap();
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(handshake.phase(), StartupPhase::Running);
    }

    #[test]
    fn loop_started_twice_posts_once() {
        let handshake = StartupHandshake::default();
        handshake.display_ready.post();
        handshake.ui_await_display();
        handshake.ui_loop_started();
        handshake.ui_loop_started();
        assert_eq!(*handshake.app_ready.count.lock().unwrap(), 1);
    }

    #[test]
    fn phases_only_move_forward() {
        let cases = [
            (StartupPhase::Running, StartupPhase::Constructing),
            (StartupPhase::DisplayReady, StartupPhase::Constructing),
            (StartupPhase::Constructing, StartupPhase::Running),
        ];
        for (from, to) in cases {
            assert!(!can_transition(from, to), "unexpected transition {from:?} -> {to:?}");
        }
    }
}
