//! Per-channel receiver adapter.
//!
//! Rather than attaching a callback object to every readiness registration,
//! the adapter is folded into the token itself: the low bit carries the
//! [`ChannelRole`], the remaining bits the session's arena slot. The listener
//! owns the one token that can never be produced by a slot.

use std::io;

use mio::Token;

use crate::channel::ChannelRole;
use crate::registry::SessionRegistry;
use crate::session::Session;

/// Token reserved for the listening source.
pub const LISTENER: Token = Token(usize::MAX);

/// What a readiness token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyEvent {
    /// The listener has pending connections.
    Accept,
    /// One channel of one session is readable.
    Channel(ChannelEvent),
}

impl ReadyEvent {
    #[inline]
    pub fn from_token(token: Token) -> Self {
        if token == LISTENER {
            Self::Accept
        } else {
            Self::Channel(ChannelEvent { slot: token.0 >> 1, role: ChannelRole::from_bit(token.0) })
        }
    }
}

/// Receiver adapter bound to one channel of the session in `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEvent {
    pub slot: usize,
    pub role: ChannelRole,
}

/// Outcome of draining a channel.
#[derive(Debug)]
pub enum Drain {
    /// Input consumed; the value is what the channel reported.
    Data(usize),
    /// Input consumed up to the channel's budget; more is queued.
    More(usize),
    /// The peer closed the channel in an orderly way.
    Closed,
    /// The channel failed.
    Failed(io::Error),
    /// The slot holds no session (already torn down).
    Vacant,
}

impl Drain {
    /// Whether the owning session has to be torn down.
    pub fn needs_cleanup(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

impl ChannelEvent {
    pub fn new(slot: usize, role: ChannelRole) -> Self {
        Self { slot, role }
    }

    #[inline]
    pub fn token(self) -> Token {
        Token((self.slot << 1) | self.role as usize)
    }

    /// Drain the bound channel.
    pub fn drain<S: Session>(self, registry: &mut SessionRegistry<S>) -> Drain {
        let Some(session) = registry.session_mut(self.slot) else {
            return Drain::Vacant;
        };
        let channel = session.channel(self.role);
        match channel.receive() {
            Ok(n) if n < 0 => Drain::Closed,
            Ok(n) if channel.has_pending() => Drain::More(n as usize),
            Ok(n) => Drain::Data(n as usize),
            Err(e) => Drain::Failed(e),
        }
    }

    /// Queue the owning session for teardown. Returns `true` the first time.
    pub fn mark_for_cleanup<S>(self, registry: &mut SessionRegistry<S>) -> bool {
        registry.mark_for_cleanup(self.slot)
    }
}
