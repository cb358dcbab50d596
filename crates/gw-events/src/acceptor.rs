//! The acceptor contract: the listening side that produces sessions.

use std::io;

use mio::event::Source;

use crate::session::Session;

/// Owns the listening capability and turns pending connections into sessions.
pub trait Acceptor {
    type Session: Session;

    /// Accept one pending connection.
    ///
    /// Returns `Ok(None)` when there is nothing to accept right now, including
    /// after a transient failure. `Err` is reserved for listener failures that
    /// cannot be recovered from; it terminates the event loop.
    ///
    /// Must not block.
    fn accept(&mut self) -> io::Result<Option<Self::Session>>;

    /// The listening readiness source.
    fn source(&mut self) -> &mut dyn Source;
}
