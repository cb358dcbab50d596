//! A client session: accepted client socket plus its upstream connection.

use std::net::SocketAddr;

use gw_core::time_util::monotonic_us;

use super::channel::TcpChannel;
use crate::session::Session;

pub struct TcpSession {
    client_addr: SocketAddr,
    protocol: TcpChannel,
    order_entry: TcpChannel,
    last_activity_us: u64,
}

impl TcpSession {
    pub fn new(client_addr: SocketAddr, protocol: TcpChannel, order_entry: TcpChannel) -> Self {
        Self { client_addr, protocol, order_entry, last_activity_us: monotonic_us() }
    }

    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }
}

impl Session for TcpSession {
    type Protocol = TcpChannel;
    type OrderEntry = TcpChannel;

    fn protocol(&mut self) -> &mut TcpChannel {
        &mut self.protocol
    }

    fn order_entry(&mut self) -> &mut TcpChannel {
        &mut self.order_entry
    }

    fn update_current_timestamp(&mut self) {
        self.last_activity_us = monotonic_us();
    }

    fn last_activity_us(&self) -> u64 {
        self.last_activity_us
    }
}
