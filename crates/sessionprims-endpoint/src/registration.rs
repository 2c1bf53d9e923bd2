//! Registration handshake.
//!
//! The client sends [`ConnRegisterDTO`] with a connection id it just
//! generated. The server assigns a canonical id and answers with
//! [`ConnRegisterReplyDTO`], echoing the client's id as `OldConnectionId`.
//! A client only adopts a reply whose `OldConnectionId` matches the id its
//! current attempt sent; anything else belongs to a superseded attempt and
//! is dropped without a state change.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ClientIdentity;
use crate::error::{EndpointError, Result};

const MAX_CONNECTION_ID_LEN: usize = 128;
const MAX_DEVICE_ID_LEN: usize = 256;
const MAX_PROPS: usize = 64;
const MAX_PROP_LEN: usize = 4096;

/// Client registration request, sent on the control channel.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ConnRegisterDTO {
    /// Regenerated for every connection attempt.
    pub connection_id: String,
    pub user_id: Uuid,
    pub device_id: String,
    /// Open extension properties. Redacted in debug output.
    #[serde(default)]
    pub props: Vec<String>,
}

/// Server registration reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ConnRegisterReplyDTO {
    /// Server-assigned connection id.
    pub connection_id: String,
    /// The id the client sent in its request.
    pub old_connection_id: String,
    #[serde(default)]
    pub props: Vec<String>,
}

impl fmt::Debug for ConnRegisterDTO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnRegisterDTO")
            .field("connection_id", &self.connection_id)
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("props", &format_args!("<redacted:{} props>", self.props.len()))
            .finish()
    }
}

impl ConnRegisterDTO {
    /// Build a request for `identity` with a fresh connection id.
    pub fn for_identity(identity: &ClientIdentity) -> Self {
        Self {
            connection_id: new_connection_id(),
            user_id: identity.user_id,
            device_id: identity.device_id.clone(),
            props: identity.props.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_connection_id(&self.connection_id)?;
        if self.device_id.len() > MAX_DEVICE_ID_LEN {
            return Err(EndpointError::Registration(format!(
                "invalid device_id length: {}",
                self.device_id.len()
            )));
        }
        validate_props(&self.props)
    }
}

impl ConnRegisterReplyDTO {
    pub fn validate(&self) -> Result<()> {
        validate_connection_id(&self.connection_id)?;
        validate_connection_id(&self.old_connection_id)?;
        validate_props(&self.props)
    }
}

/// Generate a connection id.
pub fn new_connection_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Client-side state of the current registration attempt.
#[derive(Debug, Default)]
pub(crate) struct RegistrationAttempt {
    /// Connection id sent by the attempt still awaiting its reply.
    pending: Option<String>,
}

impl RegistrationAttempt {
    /// Start a new attempt, superseding any earlier one.
    pub(crate) fn begin(&mut self, identity: &ClientIdentity) -> ConnRegisterDTO {
        let request = ConnRegisterDTO::for_identity(identity);
        self.pending = Some(request.connection_id.clone());
        request
    }

    /// Accept `reply` if it answers the current attempt.
    ///
    /// Returns the `(old, new)` connection ids on success. A reply for any
    /// other attempt, or a second reply for this one, yields `None`.
    pub(crate) fn accept(&mut self, reply: &ConnRegisterReplyDTO) -> Option<(String, String)> {
        let answers_current = self.pending.as_deref() == Some(reply.old_connection_id.as_str());
        if !answers_current || reply.validate().is_err() {
            return None;
        }
        let old = self.pending.take()?;
        Some((old, reply.connection_id.clone()))
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Server side: validate a request and build the reply.
pub(crate) fn answer(request: &ConnRegisterDTO) -> Result<ConnRegisterReplyDTO> {
    request.validate()?;
    Ok(ConnRegisterReplyDTO {
        connection_id: new_connection_id(),
        old_connection_id: request.connection_id.clone(),
        props: Vec::new(),
    })
}

fn validate_connection_id(connection_id: &str) -> Result<()> {
    if connection_id.is_empty() || connection_id.len() > MAX_CONNECTION_ID_LEN {
        return Err(EndpointError::Registration(format!(
            "invalid connection_id length: {}",
            connection_id.len()
        )));
    }
    Ok(())
}

fn validate_props(props: &[String]) -> Result<()> {
    if props.len() > MAX_PROPS {
        return Err(EndpointError::Registration(format!(
            "too many props: {} (max {MAX_PROPS})",
            props.len()
        )));
    }
    if let Some(prop) = props.iter().find(|prop| prop.len() > MAX_PROP_LEN) {
        return Err(EndpointError::Registration(format!(
            "prop too long: {} bytes (max {MAX_PROP_LEN})",
            prop.len()
        )));
    }
    Ok(())
}
