//! The session event loop.
//!
//! One iteration:
//!
//! 1. wait for readiness, at most `poll_timeout`, or not at all while
//!    channels carried over from the previous iteration still hold input;
//! 2. dispatch the carried-over channels, then every ready token: accept new
//!    sessions on the listener token, drain the addressed channel on a channel
//!    token, and mark the owning session for cleanup when the channel reports
//!    close or fails. A channel that stops on its read budget is carried over;
//! 3. keep-alive sweep over every session in the arena;
//! 4. cleanup pass: close and drop every session marked in 2 or 3.
//!
//! Nothing is closed before step 4: the arena is never shrunk while it is
//! walked, and a session whose two channels fail in the same batch is closed
//! once.

use std::convert::Infallible;
use std::time::Duration;

use gw_core::GatewayError;
use mio::Token;
use tracing::{debug, error, info, trace, warn};

use crate::acceptor::Acceptor;
use crate::adapter::{ChannelEvent, Drain, LISTENER, ReadyEvent};
use crate::channel::{Channel, ChannelRole};
use crate::poller::{MioPoller, Poller};
use crate::registry::SessionRegistry;
use crate::session::Session;

/// What happened during one call to [`EventLoop::run_once`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Readiness events returned by the poller.
    pub events: usize,
    /// Sessions accepted and registered.
    pub accepted: usize,
    /// Sessions accepted but closed again because registration failed.
    pub rejected: usize,
    /// Channel drains performed.
    pub drains: usize,
    /// Channels drained again because they were left with input last time.
    pub resumed: usize,
    /// Sessions newly queued for teardown.
    pub marked: usize,
    /// Keep-alive sweeps performed (one per open session).
    pub swept: usize,
    /// Sessions closed by the cleanup pass.
    pub closed: usize,
    /// Open sessions once the iteration finished.
    pub open: usize,
}

/// Single-threaded multiplexer over every session produced by `A`.
pub struct EventLoop<A: Acceptor, P: Poller = MioPoller> {
    acceptor: A,
    poller: P,
    sessions: SessionRegistry<A::Session>,
    ready: Vec<Token>,
    /// Channels whose last drain stopped with input left.
    carry: Vec<Token>,
    poll_timeout: Duration,
}

impl<A: Acceptor, P: Poller> EventLoop<A, P> {
    /// Register the acceptor's listener with `poller` and build the loop.
    pub fn new(mut acceptor: A, mut poller: P, poll_timeout: Duration) -> Result<Self, GatewayError> {
        poller.register(acceptor.source(), LISTENER).map_err(GatewayError::Poll)?;
        Ok(Self {
            acceptor,
            poller,
            sessions: SessionRegistry::new(),
            ready: Vec::new(),
            carry: Vec::new(),
            poll_timeout,
        })
    }

    /// Run until the poller or the listener fails.
    pub fn run(&mut self) -> Result<Infallible, GatewayError> {
        info!("event loop running, poll_timeout={:?}", self.poll_timeout);
        loop {
            match self.run_once() {
                Ok(report) if report.accepted + report.closed > 0 => {
                    debug!(
                        "iteration: accepted={} rejected={} closed={} open={}",
                        report.accepted, report.rejected, report.closed, report.open,
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!("event loop terminated: {e}");
                    return Err(e);
                }
            }
        }
    }

    /// Run exactly one iteration.
    pub fn run_once(&mut self) -> Result<IterationReport, GatewayError> {
        let mut report = IterationReport::default();

        let timeout = if self.carry.is_empty() { self.poll_timeout } else { Duration::ZERO };
        self.poller.poll(&mut self.ready, timeout).map_err(GatewayError::Poll)?;
        report.events = self.ready.len();

        // Carried-over channels go first; one the poller reported again is
        // drained once.
        let mut batch = std::mem::take(&mut self.carry);
        report.resumed = batch.len();
        for token in self.ready.drain(..) {
            if !batch.contains(&token) {
                batch.push(token);
            }
        }

        let dispatched = self.dispatch(&batch, &mut report);
        batch.clear();
        self.ready = batch;
        dispatched?;

        self.keep_alive_sweep(&mut report);
        self.cleanup(&mut report);

        report.open = self.sessions.len();
        Ok(report)
    }

    /// Open sessions, including ones queued for teardown this iteration.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> &SessionRegistry<A::Session> {
        &self.sessions
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    fn dispatch(&mut self, batch: &[Token], report: &mut IterationReport) -> Result<(), GatewayError> {
        for &token in batch {
            match ReadyEvent::from_token(token) {
                ReadyEvent::Accept => self.accept_all(report)?,
                ReadyEvent::Channel(event) => self.drain(event, report),
            }
        }
        Ok(())
    }

    /// Accept until the acceptor has nothing more to hand out.
    fn accept_all(&mut self, report: &mut IterationReport) -> Result<(), GatewayError> {
        while let Some(session) = self.acceptor.accept().map_err(GatewayError::Listener)? {
            if self.admit(session) {
                report.accepted += 1;
            } else {
                report.rejected += 1;
            }
        }
        Ok(())
    }

    /// Register both channels of a pending session and store it, or close it.
    ///
    /// Registration is all-or-nothing: a session is never stored with only one
    /// of its channels watched.
    fn admit(&mut self, mut session: A::Session) -> bool {
        let slot = self.sessions.next_slot();
        let protocol = ChannelEvent::new(slot, ChannelRole::Protocol).token();
        let order_entry = ChannelEvent::new(slot, ChannelRole::OrderEntry).token();

        if let Err(e) = self.poller.register(session.protocol().source(), protocol) {
            warn!("rejecting session: protocol channel registration failed: {e}");
            close_quietly(&mut session);
            return false;
        }
        if let Err(e) = self.poller.register(session.order_entry().source(), order_entry) {
            warn!("rejecting session: order-entry channel registration failed: {e}");
            if let Err(e) = self.poller.deregister(session.protocol().source()) {
                debug!("protocol channel deregistration failed: {e}");
            }
            close_quietly(&mut session);
            return false;
        }

        let (stored, id) = self.sessions.insert(session);
        debug_assert_eq!(stored, slot);
        info!("session {id} accepted, slot={slot}, open={}", self.sessions.len());
        true
    }

    fn drain(&mut self, event: ChannelEvent, report: &mut IterationReport) {
        let outcome = event.drain(&mut self.sessions);
        match &outcome {
            Drain::Vacant => {
                trace!("readiness for vacant slot {}", event.slot);
                return;
            }
            Drain::Data(n) => trace!("slot {} {}: {n} bytes", event.slot, event.role),
            Drain::More(n) => {
                trace!("slot {} {}: {n} bytes, more queued", event.slot, event.role);
                self.carry.push(event.token());
            }
            Drain::Closed => debug!("slot {} {}: closed by peer", event.slot, event.role),
            Drain::Failed(e) => debug!("slot {} {}: receive failed: {e}", event.slot, event.role),
        }
        report.drains += 1;

        if outcome.needs_cleanup() && event.mark_for_cleanup(&mut self.sessions) {
            report.marked += 1;
        }
    }

    /// Refresh every open session and ask both its channels for keep-alive
    /// traffic. A failure on one channel does not skip the other.
    fn keep_alive_sweep(&mut self, report: &mut IterationReport) {
        for slot in 0..self.sessions.capacity() {
            let Some(session) = self.sessions.session_mut(slot) else {
                continue;
            };
            session.update_current_timestamp();
            let order_entry = session.order_entry().keep_alive();
            let protocol = session.protocol().keep_alive();
            report.swept += 1;

            if let Err(e) = order_entry.and(protocol) {
                debug!("slot {slot}: keep-alive failed: {e}");
                if self.sessions.mark_for_cleanup(slot) {
                    report.marked += 1;
                }
            }
        }
    }

    fn cleanup(&mut self, report: &mut IterationReport) {
        if self.sessions.pending_cleanup() == 0 {
            return;
        }

        for slot in self.sessions.drain_cleanup() {
            let Some(mut entry) = self.sessions.remove(slot) else {
                continue;
            };
            self.carry
                .retain(|&token| !matches!(ReadyEvent::from_token(token), ReadyEvent::Channel(ev) if ev.slot == slot));
            for role in ChannelRole::ALL {
                if let Err(e) = self.poller.deregister(entry.session.channel(role).source()) {
                    debug!("session {}: {role} deregistration failed: {e}", entry.id);
                }
            }
            close_quietly(&mut entry.session);
            report.closed += 1;
            info!("session {} closed, open={}", entry.id, self.sessions.len());
        }
    }
}

/// Close both channels, logging instead of propagating close-time errors.
fn close_quietly<S: Session>(session: &mut S) {
    if let Err(e) = session.close() {
        warn!("error while closing session: {e}");
    }
}
