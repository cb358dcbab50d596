//! # gw-events
//!
//! Single-threaded session multiplexer for the order-entry gateway.
//!
//! ## Architecture
//!
//! ```text
//! Acceptor ──► Session { protocol, order_entry } ──► EventLoop
//!                                                    ├─ Poller (readiness)
//!                                                    ├─ SessionRegistry (slot arena + cleanup queue)
//!                                                    └─ ChannelEvent (token ⇄ slot/role)
//! ```
//!
//! Each loop iteration waits for readiness, dispatches accept and read events,
//! runs one keep-alive sweep over every open session, and finally tears down
//! the sessions that were marked during the first two phases.
//!
//! - [`channel`] / [`session`] / [`acceptor`]: collaborator contracts
//! - [`poller`]: readiness primitive, `mio`-backed in production
//! - [`adapter`]: per-channel receiver adapter encoded in the readiness token
//! - [`registry`]: session arena with idempotent cleanup marking
//! - [`event_loop`]: the loop itself
//! - [`tcp`]: payload-agnostic TCP implementations of the contracts

pub mod acceptor;
pub mod adapter;
pub mod channel;
pub mod event_loop;
pub mod poller;
pub mod registry;
pub mod session;
pub mod tcp;

#[cfg(test)]
pub(crate) mod testing;

pub use acceptor::Acceptor;
pub use adapter::{ChannelEvent, Drain, ReadyEvent};
pub use channel::{Channel, ChannelRole};
pub use event_loop::{EventLoop, IterationReport};
pub use poller::{MioPoller, Poller};
pub use registry::{SessionId, SessionRegistry, SessionState};
pub use session::Session;
