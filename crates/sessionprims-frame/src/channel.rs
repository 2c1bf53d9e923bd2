//! Reserved channel and message type names.
//!
//! Names starting with `$` belong to the session layer. Connection management
//! travels on [`CONTROL`]; chunk control messages travel on the channel of the
//! message they carry, marked by a reserved message type.

/// Connection management (registration, close).
pub const CONTROL: &str = "$control";

/// Client registration request.
pub const REGISTER: &str = "$register";

/// Server registration reply.
pub const REGISTER_REPLY: &str = "$register.reply";

/// Graceful close request.
pub const CLOSE: &str = "$close";

/// Announces a chunked message.
pub const CHUNK_START: &str = "$chunk.start";

/// One slice of a chunked message.
pub const CHUNK: &str = "$chunk";

/// Marks the end of a chunked message.
pub const CHUNK_END: &str = "$chunk.end";

const RESERVED_PREFIX: char = '$';

/// Returns true if the name is reserved for the session layer.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Returns true if the message type is one of the chunk control types.
pub fn is_chunk_control(message_type: &str) -> bool {
    matches!(message_type, CHUNK_START | CHUNK | CHUNK_END)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names() {
        assert!(is_reserved(CONTROL));
        assert!(is_reserved(CHUNK));
        assert!(!is_reserved("chat"));
        assert!(!is_reserved(""));
    }

    #[test]
    fn chunk_control_types() {
        assert!(is_chunk_control(CHUNK_START));
        assert!(is_chunk_control(CHUNK));
        assert!(is_chunk_control(CHUNK_END));
        assert!(!is_chunk_control(REGISTER));
    }
}
