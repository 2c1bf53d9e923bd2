//! Connection endpoints for sessionprims.
//!
//! An [`Endpoint`] owns one transport and runs it through the connection
//! lifecycle: registration handshake, channel dispatch, chunked sends and
//! reassembly, keepalive, and an ordered closure that notifies observers
//! exactly once.

pub mod config;
pub mod connector;
pub mod control;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod listener;
pub mod metrics;
pub mod registration;
pub mod registry;
pub mod state;

pub use config::{ClientIdentity, EndpointConfig, Role};
pub use connector::{connect_tcp, connect_ws, Address};
pub use control::{CloseDTO, ControlMessage};
pub use dispatch::{ChannelHandler, DispatchResult};
pub use endpoint::{Endpoint, EndpointBuilder};
pub use error::{EndpointError, Result};
pub use events::{EndpointEvent, EndpointObserver, EventForwarder};
pub use listener::{EndpointListener, ListenMode};
pub use metrics::EndpointStats;
pub use registration::{new_connection_id, ConnRegisterDTO, ConnRegisterReplyDTO};
pub use registry::ConnectionRegistry;
pub use state::ConnectionState;
