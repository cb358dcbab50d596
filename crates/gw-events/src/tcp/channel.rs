//! One non-blocking TCP conduit with heartbeat and idle detection.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use gw_core::time_util::monotonic_us;
use mio::event::Source;
use mio::net::TcpStream;
use tracing::trace;

use super::{KeepAlive, OnDataCallback};
use crate::channel::{Channel, ChannelRole};

/// Read buffer size; one `read` never hands more than this to the callback.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Reads performed by one `receive` call before yielding to other sessions.
const READ_BUDGET: usize = 16;

/// A [`Channel`] over a non-blocking TCP stream.
pub struct TcpChannel {
    role: ChannelRole,
    stream: TcpStream,
    /// Client address of the owning session, passed to the callback.
    client_addr: SocketAddr,
    buf: Box<[u8]>,
    on_data: Option<OnDataCallback>,
    keep_alive: KeepAlive,
    last_rx_us: u64,
    last_tx_us: u64,
    /// Set while a non-blocking connect is in flight: the instant it expires.
    connect_deadline_us: Option<u64>,
    /// The last `receive` stopped on its budget with input still queued.
    pending: bool,
    closed: bool,
}

impl TcpChannel {
    /// Wrap an already-connected, non-blocking stream.
    pub fn new(
        role: ChannelRole,
        stream: TcpStream,
        client_addr: SocketAddr,
        keep_alive: KeepAlive,
        on_data: Option<OnDataCallback>,
    ) -> Self {
        let now = monotonic_us();
        Self {
            role,
            stream,
            client_addr,
            buf: vec![0u8; READ_BUF_SIZE].into_boxed_slice(),
            on_data,
            keep_alive,
            last_rx_us: now,
            last_tx_us: now,
            connect_deadline_us: None,
            pending: false,
            closed: false,
        }
    }

    /// Wrap a stream whose non-blocking connect may still be in progress.
    ///
    /// Heartbeats are held back until the connection is established, and
    /// `keep_alive` fails once `connect_timeout` passes without it.
    pub fn connecting(
        role: ChannelRole,
        stream: TcpStream,
        client_addr: SocketAddr,
        keep_alive: KeepAlive,
        on_data: Option<OnDataCallback>,
        connect_timeout: Duration,
    ) -> Self {
        let mut channel = Self::new(role, stream, client_addr, keep_alive, on_data);
        channel.connect_deadline_us = Some(channel.last_tx_us + connect_timeout.as_micros() as u64);
        channel
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_connecting(&self) -> bool {
        self.connect_deadline_us.is_some()
    }

    /// Check on an in-flight connect. Returns `true` once established.
    fn poll_connect(&mut self, now: u64) -> io::Result<bool> {
        let Some(deadline) = self.connect_deadline_us else {
            return Ok(true);
        };
        if let Some(e) = self.stream.take_error()? {
            return Err(e);
        }
        match self.stream.peer_addr() {
            Ok(peer) => {
                self.connect_deadline_us = None;
                self.last_rx_us = now;
                self.last_tx_us = now;
                trace!("[{}] {} connected to {peer}", self.client_addr, self.role);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotConnected && now < deadline => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{}: connect not completed in time", self.role),
            )),
            Err(e) => Err(e),
        }
    }

    /// Write `bytes` in one go or fail. A short write or a full send buffer
    /// counts as an unresponsive peer.
    fn send_whole(&mut self, bytes: &[u8]) -> io::Result<()> {
        loop {
            match self.stream.write(bytes) {
                Ok(n) if n == bytes.len() => return Ok(()),
                Ok(n) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("{}: short heartbeat write ({n}/{} bytes)", self.role, bytes.len()),
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(io::Error::new(
                        io::ErrorKind::WouldBlock,
                        format!("{}: send buffer full, peer not reading", self.role),
                    ));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Channel for TcpChannel {
    /// Read until the socket would block or [`READ_BUDGET`] reads are spent.
    /// Returns the bytes read, or `-1` once the peer has shut down its side
    /// (after forwarding anything read first).
    fn receive(&mut self) -> io::Result<isize> {
        self.pending = false;
        let mut total = 0usize;
        let mut drained = false;
        for _ in 0..READ_BUDGET {
            match self.stream.read(&mut self.buf) {
                Ok(0) => return Ok(-1),
                Ok(n) => {
                    total += n;
                    self.last_rx_us = monotonic_us();
                    if let Some(cb) = &self.on_data {
                        cb(self.client_addr, self.role, &self.buf[..n]);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    drained = true;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.pending = !drained;
        trace!("[{}] {} read {total} bytes, pending={}", self.client_addr, self.role, self.pending);
        Ok(total as isize)
    }

    fn has_pending(&self) -> bool {
        self.pending
    }

    fn keep_alive(&mut self) -> io::Result<()> {
        let now = monotonic_us();
        if !self.poll_connect(now)? {
            return Ok(());
        }

        let silent_us = now.saturating_sub(self.last_rx_us);
        if silent_us >= self.keep_alive.idle_timeout.as_micros() as u64 {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{}: nothing received for {}ms", self.role, silent_us / 1_000),
            ));
        }

        let idle_us = now.saturating_sub(self.last_tx_us);
        if !self.keep_alive.heartbeat.is_empty() && idle_us >= self.keep_alive.heartbeat_interval.as_micros() as u64 {
            let heartbeat = std::sync::Arc::clone(&self.keep_alive.heartbeat);
            self.send_whole(&heartbeat)?;
            self.last_tx_us = now;
            trace!("[{}] {} heartbeat sent", self.client_addr, self.role);
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    fn source(&mut self) -> &mut dyn Source {
        &mut self.stream
    }
}
