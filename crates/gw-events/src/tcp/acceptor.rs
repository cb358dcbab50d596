//! Listening socket that pairs every client with an upstream connection.

use std::io;
use std::net::SocketAddr;

use gw_core::GatewayError;
use mio::event::Source;
use mio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::channel::TcpChannel;
use super::session::TcpSession;
use super::TcpSettings;
use crate::acceptor::Acceptor;
use crate::channel::ChannelRole;

/// [`Acceptor`] over a non-blocking TCP listener.
///
/// Each accepted client becomes the protocol channel of a new session; the
/// order-entry channel is a fresh non-blocking connection to the trading
/// system. `accept` never waits for that connect: a refusal surfaces as a read
/// or keep-alive failure of the order-entry channel, and a connect still in
/// flight after `connect_timeout` fails keep-alive. A client whose upstream
/// socket cannot even be created is dropped.
pub struct TcpAcceptor {
    listener: TcpListener,
    settings: TcpSettings,
}

impl TcpAcceptor {
    /// Bind the listener on `addr`.
    pub fn bind(addr: SocketAddr, settings: TcpSettings) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr).map_err(GatewayError::Listener)?;
        info!("listening on {addr}, order entry at {}", settings.order_entry_addr);
        Ok(Self { listener, settings })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn connect_upstream(&self) -> Result<TcpStream, GatewayError> {
        let addr = self.settings.order_entry_addr;
        let stream = TcpStream::connect(addr).map_err(|source| GatewayError::Connect { addr, source })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("upstream {addr}: TCP_NODELAY not set: {e}");
        }
        Ok(stream)
    }

    fn open_session(&self, client: TcpStream, client_addr: SocketAddr) -> Result<TcpSession, GatewayError> {
        let upstream = self.connect_upstream()?;
        if let Err(e) = client.set_nodelay(true) {
            debug!("[{client_addr}] TCP_NODELAY not set: {e}");
        }

        let s = &self.settings;
        let protocol = TcpChannel::new(
            ChannelRole::Protocol,
            client,
            client_addr,
            s.protocol_keep_alive.clone(),
            s.on_data.clone(),
        );
        let order_entry = TcpChannel::connecting(
            ChannelRole::OrderEntry,
            upstream,
            client_addr,
            s.order_entry_keep_alive.clone(),
            s.on_data.clone(),
            s.connect_timeout,
        );
        Ok(TcpSession::new(client_addr, protocol, order_entry))
    }
}

/// Accept errors that concern a single connection, not the listener.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}

impl Acceptor for TcpAcceptor {
    type Session = TcpSession;

    /// Returns the next session, skipping clients that cannot be served, and
    /// `Ok(None)` once the backlog is empty.
    fn accept(&mut self) -> io::Result<Option<TcpSession>> {
        loop {
            let (client, client_addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if is_transient(&e) => {
                    debug!("transient accept failure: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.open_session(client, client_addr) {
                Ok(session) => return Ok(Some(session)),
                Err(e) => warn!("[{client_addr}] rejecting client: {e}"),
            }
        }
    }

    fn source(&mut self) -> &mut dyn Source {
        &mut self.listener
    }
}
