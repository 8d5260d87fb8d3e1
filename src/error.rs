//! Error types for obc-link.

use thiserror::Error;

use crate::protocol::MessageType;

/// Main error type for all link operations.
///
/// Framing and addressing variants (`FrameTooShort`, `AddressMismatch`,
/// `UnrecognizedMessageType`, `UnrecognizedCommand`) are recovered inside the
/// dispatcher by discarding the frame. Codec variants abort a single transfer.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Fewer bytes were available than a full frame needs.
    #[error("frame too short: got {got} bytes, need {need}")]
    FrameTooShort { got: usize, need: usize },

    /// Payload does not fit the space available for it.
    #[error("payload too large: {len} bytes, limit {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// Inbound frame is not addressed to this station.
    #[error("address mismatch: frame for {found}, this station is {expected}")]
    AddressMismatch { expected: String, found: String },

    /// Message type byte has no known meaning.
    #[error("unrecognized message type: {0}")]
    UnrecognizedMessageType(u8),

    /// Message type is valid but not accepted by this end of the link.
    #[error("unexpected message type {0:?}")]
    UnexpectedMessage(MessageType),

    /// Command code byte has no known meaning.
    #[error("unrecognized command: {0}")]
    UnrecognizedCommand(u8),

    /// Receive marker or envelope header is malformed.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Terminal countdown packet never arrived within the read cap.
    #[error("incomplete transfer: {received} packets received in {reads} reads")]
    IncompleteTransfer { received: usize, reads: usize },

    /// Not enough pixel bytes for the announced image size.
    #[error("image size mismatch: need {expected} bytes, got {got}")]
    ImageSizeMismatch { expected: usize, got: usize },

    /// WOD record shorter than its fixed layout.
    #[error("truncated WOD record: got {0} bytes")]
    TruncatedWOD(usize),

    /// Command arguments could not be parsed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Underlying serial channel could not be opened.
    #[error("link unavailable: {0}")]
    LinkUnavailable(String),

    /// Link was closed (writer task stopped or peer hung up).
    #[error("link closed")]
    LinkClosed,

    /// I/O error on the link or the payload store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinkError {
    /// Whether the dispatcher drops the frame and keeps running.
    pub fn is_discard(&self) -> bool {
        matches!(
            self,
            LinkError::FrameTooShort { .. }
                | LinkError::AddressMismatch { .. }
                | LinkError::UnrecognizedMessageType(_)
                | LinkError::UnexpectedMessage(_)
                | LinkError::UnrecognizedCommand(_)
                | LinkError::MalformedEnvelope(_)
                | LinkError::InvalidArgument(_)
        )
    }
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;
