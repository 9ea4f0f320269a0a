//! Cooperative cancellation for the receive listener.
//!
//! A [`CancellationToken`] owns both halves of stopping a background thread:
//! the flag the thread polls and the join handle the caller waits on.

use crate::listener::ListenerExit;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Debug, Default)]
enum JoinState {
    #[default]
    Idle,
    /// Claimed by a listener that is still spawning its thread.
    Reserved,
    Attached(JoinHandle<ListenerExit>),
    Joined(ListenerExit),
}

#[derive(Debug, Default)]
struct TokenInner {
    requested: AtomicBool,
    join: Mutex<JoinState>,
}

/// Cross-thread stop signal plus the rendezvous with the stopped thread.
///
/// Clones share state. The background thread only ever reads the flag; the
/// foreground side signals and joins.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn signal(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Claim the token for one listener. Only the first claim succeeds.
    pub(crate) fn reserve(&self) -> bool {
        let mut join = self.inner.join.lock();
        match *join {
            JoinState::Idle => {
                *join = JoinState::Reserved;
                true
            }
            _ => false,
        }
    }

    /// Give back a reservation whose thread never started.
    pub(crate) fn release(&self) {
        let mut join = self.inner.join.lock();
        if matches!(*join, JoinState::Reserved) {
            *join = JoinState::Idle;
        }
    }

    /// Hand a reserved token the thread it will join.
    ///
    /// Only the holder of the reservation calls this, so the slot is always
    /// `Reserved` here.
    pub(crate) fn attach(&self, handle: JoinHandle<ListenerExit>) {
        let mut join = self.inner.join.lock();
        debug_assert!(matches!(*join, JoinState::Reserved));
        *join = JoinState::Attached(handle);
    }

    /// Block until the attached thread has exited and return its exit.
    ///
    /// Later calls return the same exit without blocking; concurrent callers
    /// wait for the first join to finish. Returns `None` if nothing was ever
    /// attached.
    pub fn join(&self) -> Option<ListenerExit> {
        let mut join = self.inner.join.lock();
        match std::mem::take(&mut *join) {
            JoinState::Idle => None,
            JoinState::Reserved => {
                *join = JoinState::Reserved;
                None
            }
            JoinState::Attached(handle) => {
                let exit = handle.join().unwrap_or(ListenerExit::Panicked);
                *join = JoinState::Joined(exit.clone());
                Some(exit)
            }
            JoinState::Joined(exit) => {
                *join = JoinState::Joined(exit.clone());
                Some(exit)
            }
        }
    }

    /// The exit status if the thread has already been joined.
    pub fn exit(&self) -> Option<ListenerExit> {
        match &*self.inner.join.lock() {
            JoinState::Joined(exit) => Some(exit.clone()),
            _ => None,
        }
    }

    /// Whether the attached thread has finished running (joined or not).
    pub fn is_finished(&self) -> bool {
        match &*self.inner.join.lock() {
            JoinState::Idle | JoinState::Reserved => false,
            JoinState::Attached(handle) => handle.is_finished(),
            JoinState::Joined(_) => true,
        }
    }
}
