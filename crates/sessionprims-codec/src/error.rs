/// Errors that can occur while decoding wire values.
///
/// Each variant maps onto a stable negative sentinel via [`CodecError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// No buffer was supplied.
    #[error("buffer is absent")]
    Absent,

    /// The buffer holds fewer bytes than the value requires.
    #[error("buffer too short ({available} bytes available, {needed} needed)")]
    Short { needed: usize, available: usize },

    /// A length header or payload is not a valid encoding.
    #[error("malformed value: {0}")]
    Malformed(&'static str),
}

impl CodecError {
    /// Sentinel code for an absent buffer.
    pub const ABSENT: i64 = -1;
    /// Sentinel code for a short buffer.
    pub const SHORT: i64 = -2;
    /// Sentinel code for a malformed encoding.
    pub const MALFORMED: i64 = -3;

    /// The negative sentinel code for this error.
    pub fn code(&self) -> i64 {
        match self {
            CodecError::Absent => Self::ABSENT,
            CodecError::Short { .. } => Self::SHORT,
            CodecError::Malformed(_) => Self::MALFORMED,
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
