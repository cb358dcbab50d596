//! The channel contract: one half-duplex, non-blocking conduit.

use std::fmt;
use std::io;

use mio::event::Source;

/// Which of a session's two channels an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Session-level protocol traffic (logon, heartbeats, admin messages).
    Protocol = 0,
    /// Order-entry traffic towards the trading system.
    OrderEntry = 1,
}

impl ChannelRole {
    /// Both roles, in the order channels are registered and closed.
    pub const ALL: [ChannelRole; 2] = [ChannelRole::Protocol, ChannelRole::OrderEntry];

    #[inline]
    pub(crate) fn from_bit(bit: usize) -> Self {
        if bit & 1 == 0 { Self::Protocol } else { Self::OrderEntry }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::OrderEntry => "order-entry",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-blocking, readable, closeable data source owned by one session.
///
/// None of these methods may block: the event loop runs every session on a
/// single thread, so a stalled call stalls the whole gateway.
pub trait Channel {
    /// Drain whatever input is available right now, within a bounded amount
    /// of work.
    ///
    /// Returns the number of bytes processed, or a negative value once the
    /// peer has closed the connection in an orderly way. I/O failures are
    /// returned as `Err`.
    fn receive(&mut self) -> io::Result<isize>;

    /// Whether the last [`Channel::receive`] stopped early with input left.
    ///
    /// Readiness is edge-triggered: such a channel will not be reported
    /// again, so the loop drains it once more on its next iteration.
    fn has_pending(&self) -> bool {
        false
    }

    /// Send keep-alive traffic if due. Fails when the peer is unresponsive.
    fn keep_alive(&mut self) -> io::Result<()>;

    /// Release the underlying conduit. Must be idempotent.
    fn close(&mut self) -> io::Result<()>;

    /// The readiness source registered with the poller.
    fn source(&mut self) -> &mut dyn Source;
}
