//! Session state for one mirroring connection.
//!
//! Models the pump's lifecycle with validated transitions that return
//! `Result` instead of panicking:
//!
//! ```text
//!  Connecting ──► HandshakeSent ──► Streaming ──► Terminated
//!       │               │                              ▲
//!       └───────────────┴──────────────────────────────┘
//! ```
//!
//! The session is owned exclusively by the pump. It becomes *ready*
//! only once a successful handshake reply has recorded the negotiated
//! geometry; until then decoders run in skip mode.

use crate::error::MiraError;
use crate::wire::{PointerFormat, ScreenFormat};

// ── PumpPhase ────────────────────────────────────────────────────

/// The current phase of the command pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PumpPhase {
    /// Transport acquired, nothing sent yet. Initial state.
    #[default]
    Connecting,

    /// Handshake request written (or skipped on a read-only
    /// transport); awaiting the reply in skip mode.
    HandshakeSent,

    /// Handshake reply accepted; decoders run in full mode.
    Streaming,

    /// Session over — transport closed, fatal error, or cancellation.
    /// Terminal state.
    Terminated,
}

impl std::fmt::Display for PumpPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::HandshakeSent => write!(f, "HandshakeSent"),
            Self::Streaming => write!(f, "Streaming"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

// ── Session ──────────────────────────────────────────────────────

/// Negotiated parameters and lifecycle phase for one connection.
#[derive(Debug)]
pub struct Session {
    phase: PumpPhase,
    version: u8,
    screen_format: ScreenFormat,
    pointer_format: PointerFormat,
    width: u32,
    height: u32,
}

impl Session {
    /// New session advertising the given formats.
    pub fn new(version: u8, screen_format: ScreenFormat, pointer_format: PointerFormat) -> Self {
        Self {
            phase: PumpPhase::Connecting,
            version,
            screen_format,
            pointer_format,
            width: 0,
            height: 0,
        }
    }

    pub fn phase(&self) -> PumpPhase {
        self.phase
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn screen_format(&self) -> ScreenFormat {
        self.screen_format
    }

    pub fn pointer_format(&self) -> PointerFormat {
        self.pointer_format
    }

    /// Negotiated screen width; zero until the handshake completes.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Negotiated screen height; zero until the handshake completes.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the handshake has completed and decoders may run in
    /// full mode.
    pub fn is_ready(&self) -> bool {
        self.phase == PumpPhase::Streaming
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Record that the handshake request went out (or was skipped on
    /// a read-only transport).
    ///
    /// Valid from: `Connecting`.
    pub fn handshake_sent(&mut self) -> Result<(), MiraError> {
        match self.phase {
            PumpPhase::Connecting => {
                self.phase = PumpPhase::HandshakeSent;
                Ok(())
            }
            _ => Err(MiraError::ProtocolViolation(
                "handshake already sent or session over",
            )),
        }
    }

    /// Accept the negotiated formats and geometry from a successful
    /// handshake reply and enter `Streaming`.
    ///
    /// Valid from: `HandshakeSent`.
    pub fn complete_handshake(
        &mut self,
        screen_format: ScreenFormat,
        pointer_format: PointerFormat,
        width: u32,
        height: u32,
    ) -> Result<(), MiraError> {
        match self.phase {
            PumpPhase::HandshakeSent => {
                self.screen_format = screen_format;
                self.pointer_format = pointer_format;
                self.width = width;
                self.height = height;
                self.phase = PumpPhase::Streaming;
                Ok(())
            }
            _ => Err(MiraError::ProtocolViolation(
                "handshake reply outside HandshakeSent phase",
            )),
        }
    }

    /// Force the terminal state. Valid from any phase.
    pub fn terminate(&mut self) {
        self.phase = PumpPhase::Terminated;
    }
}

// ── Tests ────────────────────────────────────────────────────────
