use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::error::Interrupted;

/// How often a thread blocked on a [`PromotableLock`] wakes to check its
/// [`Interrupt`].
pub(crate) const INTERRUPT_POLL: Duration = Duration::from_millis(5);

/// A cloneable cancellation token for threads blocked acquiring a
/// [`PromotableLock`].
///
/// Triggering it causes the next (or current) blocking acquisition made with
/// the token to return [`Interrupted`]. The flag is cleared when reported,
/// so a token can be reused after an interruption has been observed.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt any thread blocked with this token.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true if an interruption is pending.
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume a pending interruption, returning true if there was one.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Default)]
struct State {
    /// Active readers, including a reader promoted to writer, and a writer.
    readers: usize,

    /// Threads blocked in [`PromotableLock::write()`].
    waiting_writers: usize,

    writing: bool,
}

/// A reader / writer lock that lets the sole active reader promote itself to
/// a writer without releasing the lock.
///
/// Writers take priority: once a writer is waiting, new readers block and
/// promotion is refused, so a stream of readers cannot starve it. Promotion
/// never blocks.
///
/// The lock is released when the returned guard is dropped.
#[derive(Debug, Default)]
pub struct PromotableLock {
    state: Mutex<State>,
    changed: Condvar,
}

impl PromotableLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared read lock, blocking while a writer is active or
    /// waiting.
    pub fn read(&self, interrupt: &Interrupt) -> Result<ReadGuard<'_>, Interrupted> {
        let mut state = self.state.lock();

        while state.waiting_writers > 0 || state.writing {
            if interrupt.take() {
                debug!("interrupted waiting for read lock");
                return Err(Interrupted);
            }
            self.changed.wait_for(&mut state, INTERRUPT_POLL);
        }

        state.readers += 1;
        Ok(ReadGuard { lock: self })
    }

    /// Acquire an exclusive write lock, blocking while any reader or writer
    /// is active.
    pub fn write(&self, interrupt: &Interrupt) -> Result<WriteGuard<'_>, Interrupted> {
        let mut state = self.state.lock();
        state.waiting_writers += 1;

        while state.readers > 0 || state.writing {
            if interrupt.take() {
                // Readers blocked behind this writer may proceed.
                state.waiting_writers -= 1;
                drop(state);
                self.changed.notify_all();

                debug!("interrupted waiting for write lock");
                return Err(Interrupted);
            }
            self.changed.wait_for(&mut state, INTERRUPT_POLL);
        }

        state.waiting_writers -= 1;
        state.readers += 1;
        state.writing = true;
        Ok(WriteGuard { lock: self })
    }

    fn try_promote(&self) -> bool {
        let mut state = self.state.lock();

        if state.waiting_writers > 0 || state.readers > 1 || state.writing {
            return false;
        }

        state.writing = true;
        true
    }

    fn unlock(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0);

        state.readers -= 1;
        state.writing = false;
        drop(state);

        self.changed.notify_all();
    }
}

/// A shared hold on a [`PromotableLock`], released on drop.
#[derive(Debug)]
#[must_use = "the lock is released when the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a PromotableLock,
}

impl<'a> ReadGuard<'a> {
    /// Atomically convert this read hold into a write hold, if this is the
    /// only reader and no writer is waiting.
    ///
    /// On failure the read hold is returned unchanged.
    pub fn try_promote(self) -> Result<WriteGuard<'a>, Self> {
        if !self.lock.try_promote() {
            return Err(self);
        }

        let lock = self.lock;
        mem::forget(self);
        Ok(WriteGuard { lock })
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// An exclusive hold on a [`PromotableLock`], released on drop.
#[derive(Debug)]
#[must_use = "the lock is released when the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a PromotableLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
