//! Clipboard transfer between the guest and the host pasteboard.
//!
//! The current [`ClipboardInfo`] is tracked by identity. A host request for
//! guest-owned data blocks on a wake event with the engine lock released,
//! and gives up as soon as a newer clipboard replaces the one it asked for.

use crate::engine::{Engine, EngineLock};
use crate::ui::queue::{UiCommand, UiQueue};
use crate::ui::toolkit::HostPasteboard;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Identity of a clipboard participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardSelection {
    Clipboard,
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardType {
    Text,
}

const TYPE_COUNT: usize = 1;

impl ClipboardType {
    pub const ALL: [ClipboardType; TYPE_COUNT] = [ClipboardType::Text];

    fn index(self) -> usize {
        match self {
            ClipboardType::Text => 0,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct TypeSlot {
    available: bool,
    data: Option<Vec<u8>>,
}

/// One clipboard generation. Shared by `Arc`; two infos are the same
/// clipboard only if they are the same allocation.
#[derive(Debug)]
pub struct ClipboardInfo {
    owner: PeerId,
    selection: ClipboardSelection,
    types: Mutex<[TypeSlot; TYPE_COUNT]>,
}

impl ClipboardInfo {
    pub fn new(owner: PeerId, selection: ClipboardSelection) -> Self {
        Self {
            owner,
            selection,
            types: Mutex::new(Default::default()),
        }
    }

    pub fn owner(&self) -> PeerId {
        self.owner
    }

    pub fn selection(&self) -> ClipboardSelection {
        self.selection
    }

    pub fn mark_available(&self, kind: ClipboardType) {
        self.slots()[kind.index()].available = true;
    }

    pub fn is_available(&self, kind: ClipboardType) -> bool {
        self.slots()[kind.index()].available
    }

    pub fn available_types(&self) -> Vec<ClipboardType> {
        ClipboardType::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .collect()
    }

    pub fn set_data(&self, kind: ClipboardType, bytes: Vec<u8>) {
        let mut slots = self.slots();
        let slot = &mut slots[kind.index()];
        slot.available = true;
        slot.data = Some(bytes);
    }

    pub fn has_data(&self, kind: ClipboardType) -> bool {
        self.slots()[kind.index()].data.is_some()
    }

    pub fn data(&self, kind: ClipboardType) -> Option<Vec<u8>> {
        self.slots()[kind.index()].data.clone()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, [TypeSlot; TYPE_COUNT]> {
        self.types.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Manual-reset event: stays set until [`WakeEvent::reset`].
#[derive(Debug, Default)]
pub struct WakeEvent {
    set: Mutex<bool>,
    cond: Condvar,
}

impl WakeEvent {
    pub fn set(&self) {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        *set = true;
        self.cond.notify_all();
    }

    pub fn reset(&self) {
        *self.set.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait(&self) {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        while !*set {
            set = self.cond.wait(set).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Result of a host request for guest-owned clipboard data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardFill {
    Filled(Vec<u8>),
    /// No clipboard, or the requested type was never offered.
    Unavailable,
    /// The clipboard was replaced while waiting; nothing is delivered.
    Abandoned,
}

pub struct ClipboardSyncChannel {
    peer: PeerId,
    engine: Arc<dyn Engine>,
    lock: Arc<EngineLock>,
    queue: UiQueue,
    tracked: Mutex<Option<Arc<ClipboardInfo>>>,
    host_change_count: Mutex<Option<i64>>,
    wake: WakeEvent,
}

impl ClipboardSyncChannel {
    pub fn new(peer: PeerId, engine: Arc<dyn Engine>, lock: Arc<EngineLock>, queue: UiQueue) -> Self {
        Self {
            peer,
            engine,
            lock,
            queue,
            tracked: Mutex::new(None),
            host_change_count: Mutex::new(None),
            wake: WakeEvent::default(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn current(&self) -> Option<Arc<ClipboardInfo>> {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_current(&self, info: &Arc<ClipboardInfo>) -> bool {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tracked| Arc::ptr_eq(tracked, info))
    }

    /// Engine thread, engine lock held: a clipboard changed owner or gained
    /// data.
    pub fn on_owner_changed(&self, info: Arc<ClipboardInfo>) {
        if info.owner() == self.peer || info.selection() != ClipboardSelection::Clipboard {
            return;
        }

        let previous = {
            let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
            if tracked.as_ref().is_some_and(|t| Arc::ptr_eq(t, &info)) {
                None
            } else {
                Some(tracked.replace(info))
            }
        };

        if let Some(previous) = previous {
            drop(previous);
            tracing::debug!("guest took clipboard ownership");
            self.queue.post(UiCommand::AdvertiseClipboard);
        }
        self.wake.set();
    }

    /// Engine thread: the guest wants host data for a clipboard we own.
    pub fn on_data_requested(&self, info: Arc<ClipboardInfo>, kind: ClipboardType) {
        if info.owner() != self.peer {
            return;
        }
        self.queue.post(UiCommand::ServeClipboardRequest { info, kind });
    }

    /// UI thread: declare the guest as owner of the host pasteboard.
    pub fn advertise(&self, pasteboard: &mut dyn HostPasteboard) {
        let types = self.lock.with_lock(|_| {
            self.current()
                .filter(|info| info.owner() != self.peer)
                .map(|info| info.available_types())
        });
        let Some(types) = types else {
            return;
        };
        let count = pasteboard.declare_guest_owned(&types);
        *self
            .host_change_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(count);
    }

    /// UI thread: pick up a host pasteboard change, if any. Returns true when
    /// a new clipboard was announced to the engine.
    pub fn refresh_from_host(&self, pasteboard: &mut dyn HostPasteboard) -> bool {
        let count = pasteboard.change_count();
        {
            let seen = self
                .host_change_count
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *seen == Some(count) {
                return false;
            }
        }

        let info = Arc::new(ClipboardInfo::new(self.peer, ClipboardSelection::Clipboard));
        if pasteboard.has_text() {
            info.mark_available(ClipboardType::Text);
        }

        self.lock.with_lock(|_| {
            let previous = self
                .tracked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(Arc::clone(&info));
            drop(previous);
            self.engine.clipboard_announce(&info);
        });

        *self
            .host_change_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(count);
        self.wake.set();
        tracing::debug!(change_count = count, "host clipboard changed");
        true
    }

    /// UI thread: answer a guest request for host data.
    pub fn serve_request(
        &self,
        info: &Arc<ClipboardInfo>,
        kind: ClipboardType,
        pasteboard: &mut dyn HostPasteboard,
    ) {
        if !self.is_current(info) {
            tracing::trace!("dropping request for a superseded clipboard");
            return;
        }
        let bytes = match kind {
            ClipboardType::Text => pasteboard.read_text(),
        };
        let Some(bytes) = bytes else {
            return;
        };
        self.lock.with_lock(|_| {
            if self.is_current(info) {
                self.engine.clipboard_publish(self.peer, info, kind, bytes);
            }
        });
    }

    /// Host wants the guest's clipboard data. Blocks until the guest fills
    /// it, the type turns out to be unavailable, or the clipboard is
    /// replaced.
    pub fn provide_host_data(&self, kind: ClipboardType) -> ClipboardFill {
        self.lock.with_lock(|scope| {
            let Some(info) = self.current() else {
                return ClipboardFill::Unavailable;
            };
            if info.owner() == self.peer {
                return ClipboardFill::Unavailable;
            }
            if !scope.owns_lock() {
                tracing::warn!("clipboard fill requested with the engine lock already held");
                return ClipboardFill::Abandoned;
            }

            self.wake.reset();
            self.engine.clipboard_request_data(&info, kind);

            while self.is_current(&info) && info.is_available(kind) && !info.has_data(kind) {
                scope.unlocked(|| self.wake.wait());
                self.wake.reset();
            }

            if !self.is_current(&info) {
                tracing::trace!("clipboard replaced during fill, abandoning");
                return ClipboardFill::Abandoned;
            }
            match info.data(kind) {
                Some(bytes) => ClipboardFill::Filled(bytes),
                None => ClipboardFill::Unavailable,
            }
        })
    }
}
