//! Scoped access to the engine lock.
//!
//! The engine thread holds the lock for most of its life and drops it only
//! around blocking waits; the UI thread takes it briefly for every operation
//! that touches emulated state. Either thread may re-enter through
//! [`EngineLock::with_lock`] while already holding the lock.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static HELD_LOCKS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

fn mark_held(id: usize, held: bool) {
    HELD_LOCKS.with(|set| {
        let mut set = set.borrow_mut();
        if held {
            set.insert(id);
        } else {
            set.remove(&id);
        }
    });
}

#[derive(Debug)]
pub struct EngineLock {
    id: usize,
    mutex: Mutex<()>,
}

impl Default for EngineLock {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLock {
    pub fn new() -> Self {
        Self {
            id: NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed),
            mutex: Mutex::new(()),
        }
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        HELD_LOCKS.with(|set| set.borrow().contains(&self.id))
    }

    /// Acquire the lock and keep it until the returned scope is dropped.
    ///
    /// If the current thread already holds the lock the scope is a
    /// non-owning view of the outer acquisition.
    pub fn lock(&self) -> EngineLockScope<'_> {
        if self.is_held_by_current_thread() {
            return EngineLockScope {
                lock: self,
                guard: None,
                owning: false,
            };
        }
        let guard = self.acquire();
        EngineLockScope {
            lock: self,
            guard: Some(guard),
            owning: true,
        }
    }

    /// Run `body` with the lock held, without self-deadlocking when the
    /// caller already holds it.
    pub fn with_lock<R>(&self, body: impl FnOnce(&mut EngineLockScope<'_>) -> R) -> R {
        let mut scope = self.lock();
        body(&mut scope)
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        let guard = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        mark_held(self.id, true);
        guard
    }
}

/// Proof that the engine lock is held by the current thread.
pub struct EngineLockScope<'a> {
    lock: &'a EngineLock,
    guard: Option<MutexGuard<'a, ()>>,
    owning: bool,
}

impl<'a> EngineLockScope<'a> {
    /// False when this scope is nested inside another acquisition on the
    /// same thread; such a scope cannot release the lock.
    pub fn owns_lock(&self) -> bool {
        self.owning
    }

    /// Release the lock around `f` and reacquire it afterwards.
    ///
    /// A nested scope runs `f` with the lock still held by its outer frame.
    pub fn unlocked<R>(&mut self, f: impl FnOnce() -> R) -> R {
        if !self.owning {
            tracing::warn!("engine lock release requested from a nested scope");
            return f();
        }
        if let Some(guard) = self.guard.take() {
            mark_held(self.lock.id, false);
            drop(guard);
        }
        let result = f();
        self.guard = Some(self.lock.acquire());
        result
    }
}

impl Drop for EngineLockScope<'_> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            mark_held(self.lock.id, false);
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn nested_with_lock_does_not_deadlock() {
        let lock = EngineLock::new();
        let value = lock.with_lock(|outer| {
            assert!(outer.owns_lock());
            lock.with_lock(|inner| {
                assert!(!inner.owns_lock());
                7
            })
        });
        assert_eq!(value, 7);
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn held_flag_is_per_lock() {
        let a = EngineLock::new();
        let b = EngineLock::new();
        a.with_lock(|_| {
            assert!(a.is_held_by_current_thread());
            assert!(!b.is_held_by_current_thread());
        });
    }

    #[test]
    fn unlocked_lets_another_thread_in() {
        let lock = Arc::new(EngineLock::new());
        let (tx, rx) = mpsc::channel();
        let mut scope = lock.lock();
        let other = Arc::clone(&lock);
        let handle = thread::spawn(move || {
            other.with_lock(|_| tx.send(()).unwrap());
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        scope.unlocked(|| {
            rx.recv_timeout(Duration::from_secs(2))
                .expect("other thread should acquire while released");
        });
        assert!(lock.is_held_by_current_thread());
        drop(scope);
        handle.join().unwrap();
        assert!(!lock.is_held_by_current_thread());
    }
}
