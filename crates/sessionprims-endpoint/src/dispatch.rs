use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use sessionprims_frame::channel::is_reserved;
use sessionprims_frame::Envelope;

use crate::endpoint::Endpoint;
use crate::error::{EndpointError, Result};

/// Outcome of dispatching one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DispatchResult {
    Handled = 1,
    /// The message was dropped; the connection carries on.
    Recoverable = 0,
    /// The connection must be recycled.
    Fatal = -1,
}

impl DispatchResult {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<i32> for DispatchResult {
    fn from(code: i32) -> Self {
        match code {
            1.. => Self::Handled,
            0 => Self::Recoverable,
            _ => Self::Fatal,
        }
    }
}

/// Handles messages arriving on one channel.
///
/// Handlers run on the endpoint's receive task, one message at a time in
/// arrival order. A handler that blocks stalls the whole connection; use
/// [`Endpoint::post`] to answer from inside one.
pub trait ChannelHandler: Send + Sync + 'static {
    /// `envelope.msg_id` is the correlation id to answer with.
    fn handle(&self, endpoint: &Endpoint, envelope: &Envelope) -> DispatchResult;
}

impl<F> ChannelHandler for F
where
    F: Fn(&Endpoint, &Envelope) -> DispatchResult + Send + Sync + 'static,
{
    fn handle(&self, endpoint: &Endpoint, envelope: &Envelope) -> DispatchResult {
        self(endpoint, envelope)
    }
}

/// Channel name to handler map. The last registration for a name wins.
#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: RwLock<HashMap<String, Arc<dyn ChannelHandler>>>,
}

impl HandlerTable {
    pub(crate) fn register(&self, channel: &str, handler: Arc<dyn ChannelHandler>) -> Result<()> {
        if is_reserved(channel) {
            return Err(EndpointError::ReservedChannel(channel.to_string()));
        }
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel.to_string(), handler);
        Ok(())
    }

    pub(crate) fn remove(&self, channel: &str) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel)
            .is_some()
    }

    /// The handler for `channel`. The table lock is released before the
    /// caller invokes it, so handlers may register other handlers.
    pub(crate) fn get(&self, channel: &str) -> Option<Arc<dyn ChannelHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .cloned()
    }

    pub(crate) fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        channels.sort();
        channels
    }

    pub(crate) fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("channels", &self.channels())
            .finish()
    }
}
