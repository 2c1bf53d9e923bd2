//! Session-layer messaging primitives.
//!
//! sessionprims moves envelopes between registered peers over TCP or
//! WebSocket: a compact binary codec, chunking for oversized messages, and
//! a connection endpoint with registration, channel dispatch, keepalive and
//! ordered closure.
//!
//! # Crate Structure
//!
//! - [`codec`]: Binary primitive codec with the probe contract
//! - [`frame`]: Envelopes, serializers, length-prefix framing, chunk reassembly
//! - [`transport`]: Stream and WebSocket transports
//! - [`endpoint`]: Connection endpoints (behind the `endpoint` feature)

/// Re-export codec types.
pub mod codec {
    pub use sessionprims_codec::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sessionprims_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use sessionprims_transport::*;
}

/// Re-export endpoint types (requires `endpoint` feature).
#[cfg(feature = "endpoint")]
pub mod endpoint {
    pub use sessionprims_endpoint::*;
}
