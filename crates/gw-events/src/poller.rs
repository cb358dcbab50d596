//! The readiness primitive.
//!
//! [`Poller`] is the seam between the event loop and the OS. [`MioPoller`]
//! is the production implementation; readiness is edge-triggered, so every
//! consumer must drain its source until `WouldBlock` on each event.

use std::io;
use std::time::Duration;

use mio::event::Source;
use mio::{Events, Interest, Poll, Token};
use tracing::debug;

/// Registers readable sources and reports which of them became ready.
pub trait Poller {
    /// Register `source` for read-readiness under `token`.
    fn register(&mut self, source: &mut dyn Source, token: Token) -> io::Result<()>;

    /// Stop watching `source`.
    fn deregister(&mut self, source: &mut dyn Source) -> io::Result<()>;

    /// Wait at most `timeout` and append the tokens that became ready to
    /// `ready`, in the order the OS reports them.
    fn poll(&mut self, ready: &mut Vec<Token>, timeout: Duration) -> io::Result<()>;
}

/// [`Poller`] backed by `mio::Poll`.
pub struct MioPoller {
    poll: Poll,
    events: Events,
}

impl MioPoller {
    /// Create a poller fetching at most `capacity` events per wait.
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self { poll: Poll::new()?, events: Events::with_capacity(capacity) })
    }
}

impl Poller for MioPoller {
    fn register(&mut self, source: &mut dyn Source, token: Token) -> io::Result<()> {
        self.poll.registry().register(source, token, Interest::READABLE)
    }

    fn deregister(&mut self, source: &mut dyn Source) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    fn poll(&mut self, ready: &mut Vec<Token>, timeout: Duration) -> io::Result<()> {
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            // A signal cut the wait short: report an empty batch.
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("poll interrupted");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        ready.extend(self.events.iter().map(|event| event.token()));
        Ok(())
    }
}
