//! Command relay: topic registry, envelopes, permission-gated forwarding
//! and the websocket session that drives them.

pub mod bus;
pub mod connection;
pub mod dispatcher;
pub mod envelope;
pub mod protocol;
pub mod topic;

pub use bus::{ConnectionId, Delivery, RelayBus};
pub use connection::{serve, RelaySession, Reply};
pub use dispatcher::{Dispatch, DropReason, Relay};
pub use envelope::Inbound;
pub use protocol::{ClientFrame, ServerFrame};
pub use topic::{Channel, Topic};
