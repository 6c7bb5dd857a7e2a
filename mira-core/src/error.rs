//! Domain-specific error types for the mira protocol.
//!
//! All fallible operations return `Result<T, MiraError>`.
//! No panics on invalid input — every error is typed.
//!
//! Errors fall into two terminal classes: protocol violations and I/O
//! failures. Both end the session; nothing here is retried. A stalled
//! peer is *not* an error — the watchdog handles it locally.

use thiserror::Error;

use crate::wire::ReplyCode;

/// The canonical error type for the mira protocol.
#[derive(Debug, Error)]
pub enum MiraError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// The opcode byte does not resolve to any decoder in the table.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// The peer answered the handshake with a non-success result.
    #[error("handshake failed: {0}")]
    Handshake(ReplyCode),

    /// A declared payload size was zero or negative.
    #[error("invalid payload size: {0}")]
    InvalidPayloadSize(i32),

    /// The peer cleared the cursor before ever sending a cursor image.
    #[error("cannot draw empty pointer: no cursor image received yet")]
    EmptyPointer,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} value: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u8 },

    /// The stream violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── I/O Errors ───────────────────────────────────────────────
    /// The transport closed mid-payload.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The transport layer reported an error.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    // ── Internal Errors ──────────────────────────────────────────
    /// The hand-off queue's consumer side is gone.
    #[error("update queue closed")]
    QueueClosed,
}

impl MiraError {
    /// Whether this error originated in the protocol layer (as
    /// opposed to the transport).
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::UnknownOpcode(_)
                | Self::Handshake(_)
                | Self::InvalidPayloadSize(_)
                | Self::EmptyPointer
                | Self::UnknownVariant { .. }
                | Self::ProtocolViolation(_)
        )
    }
}
