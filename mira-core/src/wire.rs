//! Wire-level protocol constants and fixed-layout messages.
//!
//! The stream is a sequence of opcode-tagged commands. All multi-byte
//! integers are big-endian.
//!
//! ## Command layouts
//!
//! **Handshake request** (client → peer, sent exactly once):
//! ```text
//! opcode:        u8   (0x00)
//! version:       u8
//! screen_mask:   u8   (supported screen formats, bitmask)
//! pointer_mask:  u8   (supported pointer formats, bitmask)
//! ```
//!
//! **Handshake reply** (opcode 1):
//! ```text
//! result:        u8
//! screen_fmt:    u8
//! pointer_fmt:   u8
//! width:         i32
//! height:        i32
//! ```
//!
//! **Image update** (opcode 2):
//! ```text
//! width:         i32
//! height:        i32
//! x_offset:      i32
//! y_offset:      i32
//! payload_size:  i32
//! payload:       [u8; payload_size]
//! ```
//!
//! **Pointer update** (opcode 3):
//! ```text
//! x:             i32
//! y:             i32
//! has_cursor:    u8
//! width:         i32      (only if has_cursor != 0)
//! height:        i32      (only if has_cursor != 0)
//! payload:       [u8; 4 * width * height]
//! ```
//!
//! **Distance** (opcode 4): reserved, currently empty.

use serde::{Deserialize, Serialize};

use crate::error::MiraError;

/// Protocol version sent in the handshake request.
pub const PROTOCOL_VERSION: u8 = 1;

// ── Opcode ───────────────────────────────────────────────────────

/// Single leading byte identifying the command that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Outbound handshake request. Never valid on the receive path.
    Init = 0,
    /// Handshake reply from the peer.
    InitReply = 1,
    /// Full or partial screen image.
    Image = 2,
    /// Cursor position / image.
    Pointer = 3,
    /// Reserved keepalive (future depth-sensing data).
    Distance = 4,
}

impl Opcode {
    /// Number of entries in the command table.
    pub const COUNT: usize = 5;
}

// ── ReplyCode ────────────────────────────────────────────────────

/// Result of the version/format handshake, as reported by the peer.
///
/// Any byte outside the known set maps to [`ReplyCode::Unknown`];
/// every code other than `Success` is a fatal protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Success,
    BadMessage,
    VersionMismatch,
    ScreenFormatUnsupported,
    PointerFormatUnsupported,
    Unknown,
}

impl ReplyCode {
    /// Map a wire byte to a reply code.
    pub fn from_wire(value: u8) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::BadMessage,
            2 => Self::VersionMismatch,
            3 => Self::ScreenFormatUnsupported,
            4 => Self::PointerFormatUnsupported,
            _ => Self::Unknown,
        }
    }

    /// Numeric code, matching the wire value where one exists.
    pub fn code(self) -> u16 {
        match self {
            Self::Success => 0,
            Self::BadMessage => 1,
            Self::VersionMismatch => 2,
            Self::ScreenFormatUnsupported => 3,
            Self::PointerFormatUnsupported => 4,
            Self::Unknown => 999,
        }
    }

    /// Human-readable reason for a failed handshake.
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "",
            Self::BadMessage => "Bad handshake message",
            Self::VersionMismatch => "Version mismatch",
            Self::ScreenFormatUnsupported => "Screen format not supported",
            Self::PointerFormatUnsupported => "Pointer format not supported",
            Self::Unknown => "Unknown error",
        }
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

// ── Pixel formats ────────────────────────────────────────────────

/// Pixel layout for the screen texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenFormat {
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba,
}

impl ScreenFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ScreenFormat::Rgb => 3,
            ScreenFormat::Rgba => 4,
        }
    }

    /// Bit this format occupies in the handshake request mask.
    pub const fn mask_bit(self) -> u8 {
        match self {
            ScreenFormat::Rgb => 0x01,
            ScreenFormat::Rgba => 0x02,
        }
    }

    /// Map a format byte from the handshake reply.
    pub fn from_wire(value: u8) -> Result<Self, MiraError> {
        match value {
            0x01 => Ok(ScreenFormat::Rgb),
            0x02 => Ok(ScreenFormat::Rgba),
            other => Err(MiraError::UnknownVariant {
                type_name: "ScreenFormat",
                value: other,
            }),
        }
    }
}

/// Pixel layout for the cursor overlay. The overlay needs an alpha
/// channel, so RGBA is the only format defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerFormat {
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba,
}

impl PointerFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    pub const fn mask_bit(self) -> u8 {
        0x01
    }

    pub fn from_wire(value: u8) -> Result<Self, MiraError> {
        match value {
            0x01 => Ok(PointerFormat::Rgba),
            other => Err(MiraError::UnknownVariant {
                type_name: "PointerFormat",
                value: other,
            }),
        }
    }
}

// ── HandshakeRequest ─────────────────────────────────────────────

/// The fixed 4-byte handshake request, written once at session start.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeRequest {
    pub version: u8,
    pub screen_formats: u8,
    pub pointer_formats: u8,
}

impl HandshakeRequest {
    /// Encoded size on the wire.
    pub const SIZE: usize = 4;

    pub fn new(screen: ScreenFormat, pointer: PointerFormat) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            screen_formats: screen.mask_bit(),
            pointer_formats: pointer.mask_bit(),
        }
    }

    /// Serialize to bytes.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        [
            Opcode::Init as u8,
            self.version,
            self.screen_formats,
            self.pointer_formats,
        ]
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_code_mapping() {
        assert_eq!(ReplyCode::from_wire(0), ReplyCode::Success);
        assert_eq!(ReplyCode::from_wire(2), ReplyCode::VersionMismatch);
        assert_eq!(ReplyCode::from_wire(4), ReplyCode::PointerFormatUnsupported);
        // Anything unrecognized falls back to Unknown / 999.
        assert_eq!(ReplyCode::from_wire(42), ReplyCode::Unknown);
        assert_eq!(ReplyCode::Unknown.code(), 999);
    }

    #[test]
    fn reply_code_messages() {
        assert_eq!(ReplyCode::VersionMismatch.message(), "Version mismatch");
        assert!(ReplyCode::Success.message().is_empty());
    }

    #[test]
    fn screen_format_round_trip() {
        assert_eq!(ScreenFormat::from_wire(0x01).unwrap(), ScreenFormat::Rgb);
        assert_eq!(ScreenFormat::from_wire(0x02).unwrap(), ScreenFormat::Rgba);
        assert!(ScreenFormat::from_wire(0x40).is_err());
        assert_eq!(ScreenFormat::Rgb.bytes_per_pixel(), 3);
        assert_eq!(ScreenFormat::Rgba.bytes_per_pixel(), 4);
    }

    #[test]
    fn handshake_request_encoding() {
        let req = HandshakeRequest::new(ScreenFormat::Rgb, PointerFormat::Rgba);
        let bytes = req.encode();
        assert_eq!(bytes, [0x00, PROTOCOL_VERSION, 0x01, 0x01]);
    }
}
