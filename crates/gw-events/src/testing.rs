//! Scripted collaborators for exercising the loop without sockets.
//!
//! Every fake shares its state through `Rc` handles, so a test keeps a spy
//! after the fake itself has been moved into the loop.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::rc::Rc;
use std::time::Duration;

use mio::event::Source;
use mio::{Interest, Registry, Token};

use crate::acceptor::Acceptor;
use crate::channel::Channel;
use crate::poller::Poller;
use crate::session::Session;

/// Readiness source that accepts every registration and never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSource;

impl Source for NullSource {
    fn register(&mut self, _: &Registry, _: Token, _: Interest) -> io::Result<()> {
        Ok(())
    }

    fn reregister(&mut self, _: &Registry, _: Token, _: Interest) -> io::Result<()> {
        Ok(())
    }

    fn deregister(&mut self, _: &Registry) -> io::Result<()> {
        Ok(())
    }
}

/// Script and call counters of one fake channel.
#[derive(Debug, Default)]
pub struct ChannelScript {
    /// Results handed out by `receive`, front first. `Ok(0)` once empty.
    pub receives: VecDeque<Result<isize, io::ErrorKind>>,
    /// When set, every `keep_alive` fails with this kind.
    pub keep_alive_error: Option<io::ErrorKind>,
    /// When set, every `close` fails with this kind (after counting).
    pub close_error: Option<io::ErrorKind>,
    /// Reported by `has_pending`.
    pub pending: bool,
    pub receive_calls: u32,
    pub keep_alive_calls: u32,
    pub closes: u32,
}

pub struct FakeChannel {
    script: Rc<RefCell<ChannelScript>>,
    source: NullSource,
}

impl Channel for FakeChannel {
    fn receive(&mut self) -> io::Result<isize> {
        let mut script = self.script.borrow_mut();
        script.receive_calls += 1;
        match script.receives.pop_front() {
            Some(Ok(n)) => Ok(n),
            Some(Err(kind)) => Err(io::Error::from(kind)),
            None => Ok(0),
        }
    }

    fn keep_alive(&mut self) -> io::Result<()> {
        let mut script = self.script.borrow_mut();
        script.keep_alive_calls += 1;
        match script.keep_alive_error {
            Some(kind) => Err(io::Error::from(kind)),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        let mut script = self.script.borrow_mut();
        script.closes += 1;
        match script.close_error {
            Some(kind) => Err(io::Error::from(kind)),
            None => Ok(()),
        }
    }

    fn has_pending(&self) -> bool {
        self.script.borrow().pending
    }

    fn source(&mut self) -> &mut dyn Source {
        &mut self.source
    }
}

/// Observation handle for one fake session.
#[derive(Clone, Default)]
pub struct SessionSpy {
    pub protocol: Rc<RefCell<ChannelScript>>,
    pub order_entry: Rc<RefCell<ChannelScript>>,
    stamps: Rc<Cell<u32>>,
    last_activity: Rc<Cell<u64>>,
}

impl SessionSpy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp refreshes seen so far.
    pub fn stamps(&self) -> u32 {
        self.stamps.get()
    }

    pub fn last_activity(&self) -> u64 {
        self.last_activity.get()
    }

    /// `(protocol, order_entry)` close calls.
    pub fn closes(&self) -> (u32, u32) {
        (self.protocol.borrow().closes, self.order_entry.borrow().closes)
    }

    /// `(protocol, order_entry)` keep-alive calls.
    pub fn keep_alives(&self) -> (u32, u32) {
        (self.protocol.borrow().keep_alive_calls, self.order_entry.borrow().keep_alive_calls)
    }
}

pub struct FakeSession {
    protocol: FakeChannel,
    order_entry: FakeChannel,
    stamps: Rc<Cell<u32>>,
    last_activity: Rc<Cell<u64>>,
}

impl FakeSession {
    pub fn new(spy: &SessionSpy) -> Self {
        Self {
            protocol: FakeChannel { script: Rc::clone(&spy.protocol), source: NullSource },
            order_entry: FakeChannel { script: Rc::clone(&spy.order_entry), source: NullSource },
            stamps: Rc::clone(&spy.stamps),
            last_activity: Rc::clone(&spy.last_activity),
        }
    }
}

impl Session for FakeSession {
    type Protocol = FakeChannel;
    type OrderEntry = FakeChannel;

    fn protocol(&mut self) -> &mut FakeChannel {
        &mut self.protocol
    }

    fn order_entry(&mut self) -> &mut FakeChannel {
        &mut self.order_entry
    }

    fn update_current_timestamp(&mut self) {
        self.stamps.set(self.stamps.get() + 1);
        self.last_activity.set(gw_core::time_util::monotonic_us());
    }

    fn last_activity_us(&self) -> u64 {
        self.last_activity.get()
    }
}

/// Hands out queued sessions; `Ok(None)` once the queue is empty.
#[derive(Clone, Default)]
pub struct FakeAcceptor {
    queue: Rc<RefCell<VecDeque<io::Result<Option<FakeSession>>>>>,
    source: NullSource,
}

impl FakeAcceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, spy: &SessionSpy) {
        self.queue.borrow_mut().push_back(Ok(Some(FakeSession::new(spy))));
    }

    pub fn push_none(&self) {
        self.queue.borrow_mut().push_back(Ok(None));
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.queue.borrow_mut().push_back(Err(io::Error::from(kind)));
    }
}

impl Acceptor for FakeAcceptor {
    type Session = FakeSession;

    fn accept(&mut self) -> io::Result<Option<FakeSession>> {
        self.queue.borrow_mut().pop_front().unwrap_or(Ok(None))
    }

    fn source(&mut self) -> &mut dyn Source {
        &mut self.source
    }
}

#[derive(Default)]
struct PollerState {
    batches: VecDeque<io::Result<Vec<Token>>>,
    registered: Vec<Token>,
    failing: HashSet<Token>,
    deregistrations: u32,
    timeouts: Vec<Duration>,
}

/// Poller replaying scripted readiness batches.
///
/// Registration records the token; since every fake source is a
/// [`NullSource`], deregistration can only be counted.
#[derive(Clone, Default)]
pub struct ScriptedPoller {
    state: Rc<RefCell<PollerState>>,
}

impl ScriptedPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the tokens the next `poll` reports.
    pub fn push(&self, batch: Vec<Token>) {
        self.state.borrow_mut().batches.push_back(Ok(batch));
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().batches.push_back(Err(io::Error::from(kind)));
    }

    /// Make registration under `token` fail.
    pub fn fail_registration(&self, token: Token) {
        self.state.borrow_mut().failing.insert(token);
    }

    pub fn registered(&self) -> Vec<Token> {
        self.state.borrow().registered.clone()
    }

    pub fn deregistrations(&self) -> u32 {
        self.state.borrow().deregistrations
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.borrow().timeouts.clone()
    }
}

impl Poller for ScriptedPoller {
    fn register(&mut self, _source: &mut dyn Source, token: Token) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.failing.contains(&token) {
            return Err(io::Error::other("registration refused"));
        }
        state.registered.push(token);
        Ok(())
    }

    fn deregister(&mut self, _source: &mut dyn Source) -> io::Result<()> {
        self.state.borrow_mut().deregistrations += 1;
        Ok(())
    }

    fn poll(&mut self, ready: &mut Vec<Token>, timeout: Duration) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.timeouts.push(timeout);
        match state.batches.pop_front() {
            Some(Ok(batch)) => {
                ready.extend(batch);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => Ok(()),
        }
    }
}
