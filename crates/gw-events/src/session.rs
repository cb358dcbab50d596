//! The session contract: two channels sharing one lifecycle.

use std::io;

use crate::channel::{Channel, ChannelRole};

/// One logical peer connection, composed of a protocol channel and an
/// order-entry channel.
///
/// Channels are owned exclusively by their session and are never handed out
/// beyond a borrow.
pub trait Session {
    type Protocol: Channel;
    type OrderEntry: Channel;

    fn protocol(&mut self) -> &mut Self::Protocol;

    fn order_entry(&mut self) -> &mut Self::OrderEntry;

    /// Refresh the last-activity stamp. Called once per keep-alive sweep.
    fn update_current_timestamp(&mut self);

    /// Last value recorded by [`Session::update_current_timestamp`], in µs.
    fn last_activity_us(&self) -> u64;

    /// Borrow the channel playing `role`.
    fn channel(&mut self, role: ChannelRole) -> &mut dyn Channel {
        match role {
            ChannelRole::Protocol => self.protocol(),
            ChannelRole::OrderEntry => self.order_entry(),
        }
    }

    /// Close both channels.
    ///
    /// The order-entry channel is closed even if closing the protocol channel
    /// fails. The first error encountered is returned.
    fn close(&mut self) -> io::Result<()> {
        let protocol = self.protocol().close();
        let order_entry = self.order_entry().close();
        protocol.and(order_entry)
    }
}
