//! Encoder and decoder error types.

use thiserror::Error;

/// Error type for MessagePack encoding operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// No registered extension encoder accepted the value.
    #[error("no registered extension accepts the value")]
    UnsupportedValue,
    /// A string, binary, array, map, or extension payload exceeds the
    /// 32-bit length a MessagePack header can carry.
    #[error("length {0} does not fit a 32-bit header")]
    LengthOverflow(usize),
    /// Value nesting exceeded the configured depth limit.
    #[error("value nesting exceeds the depth limit of {0}")]
    DepthLimitExceeded(usize),
}

/// Error type for MessagePack decoding operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A tag byte the MessagePack format never produces (0xc1).
    #[error("invalid tag byte 0x{0:02x} at offset {1}")]
    InvalidFormat(u8, usize),
    /// Input ended before the value completed. The streaming decoder
    /// suspends instead of reporting this, except at end of stream.
    #[error("unexpected end of input")]
    TruncatedInput,
    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
    /// An extension tag with no registered decoder, under the
    /// [`UnknownExtPolicy::Error`](crate::UnknownExtPolicy) policy.
    #[error("no decoder registered for extension tag {0}")]
    UnrecognizedExtension(i8),
    /// Value nesting exceeded the configured depth limit.
    #[error("value nesting exceeds the depth limit of {0}")]
    DepthLimitExceeded(usize),
    /// A declared length exceeded the configured `max_len` guard.
    #[error("declared length {0} exceeds the configured limit of {1}")]
    SizeLimitExceeded(usize, usize),
    /// Bytes remained after the single expected value.
    #[error("{0} trailing bytes after the decoded value")]
    TrailingBytes(usize),
    /// A timestamp extension payload was not 4, 8, or 12 bytes.
    #[error("invalid timestamp payload length {0}")]
    InvalidTimestampLength(usize),
    /// A timestamp payload carried nanoseconds outside 0..=999_999_999.
    #[error("timestamp nanoseconds {0} out of range")]
    InvalidTimestampNanos(u32),
}
