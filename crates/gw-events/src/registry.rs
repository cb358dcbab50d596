//! Session arena.
//!
//! Sessions live in slots addressed by a stable index, which is what the
//! readiness tokens carry. The open/closing status is a field of the slot,
//! so "active set" and "cleanup queue" can never disagree: a slot is in the
//! active set while it is occupied, and in the cleanup queue exactly when its
//! state is [`SessionState::Closing`].
//!
//! Vacated slots are reused. A slot is only vacated by the cleanup pass, after
//! the current readiness batch has been consumed and with the channels that
//! carried its tokens closed.

use std::fmt;

/// Monotonic session number, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of an occupied slot.
///
/// `Pending` sessions are held by the caller until both channels are
/// registered; `Closed` sessions are no longer in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closing,
}

/// An occupied slot.
#[derive(Debug)]
pub struct Entry<S> {
    pub id: SessionId,
    pub state: SessionState,
    pub session: S,
}

/// Arena of open sessions plus the cleanup queue.
#[derive(Debug)]
pub struct SessionRegistry<S> {
    slots: Vec<Option<Entry<S>>>,
    free: Vec<usize>,
    cleanup: Vec<usize>,
    next_id: u64,
    len: usize,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), cleanup: Vec::new(), next_id: 1, len: 0 }
    }

    /// The slot the next [`SessionRegistry::insert`] will use.
    ///
    /// Lets the caller derive readiness tokens before the session is stored.
    #[inline]
    pub fn next_slot(&self) -> usize {
        self.free.last().copied().unwrap_or(self.slots.len())
    }

    /// Store `session` as active. Returns its slot and id.
    pub fn insert(&mut self, session: S) -> (usize, SessionId) {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        let entry = Entry { id, state: SessionState::Active, session };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.len += 1;
        (slot, id)
    }

    /// Vacate `slot`, returning what it held.
    ///
    /// The cleanup queue is not touched: it is taken with
    /// [`SessionRegistry::drain_cleanup`] before queued slots are removed.
    pub fn remove(&mut self, slot: usize) -> Option<Entry<S>> {
        let entry = self.slots.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(entry)
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&Entry<S>> {
        self.slots.get(slot)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Entry<S>> {
        self.slots.get_mut(slot)?.as_mut()
    }

    #[inline]
    pub fn session_mut(&mut self, slot: usize) -> Option<&mut S> {
        self.get_mut(slot).map(|entry| &mut entry.session)
    }

    /// Queue the session in `slot` for teardown.
    ///
    /// Returns `true` if this call queued it, `false` if it was already queued
    /// or the slot is vacant.
    pub fn mark_for_cleanup(&mut self, slot: usize) -> bool {
        match self.get_mut(slot) {
            Some(entry) if entry.state == SessionState::Active => {
                entry.state = SessionState::Closing;
                self.cleanup.push(slot);
                true
            }
            _ => false,
        }
    }

    /// Take the cleanup queue, in marking order. The queue is left empty.
    pub fn drain_cleanup(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.cleanup)
    }

    /// Number of sessions queued for teardown.
    pub fn pending_cleanup(&self) -> usize {
        self.cleanup.len()
    }

    /// Number of occupied slots (the active set, including sessions queued for
    /// teardown in the current iteration).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Upper bound on occupied slot indices.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Entry<S>)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| entry.as_ref().map(|e| (slot, e)))
    }
}
