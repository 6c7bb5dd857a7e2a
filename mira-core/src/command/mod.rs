//! One decoder per opcode.
//!
//! Decoders know their own wire layout and can either fully decode a
//! command into an [`Update`] or *skip* it — consume and discard the
//! payload so the stream stays framed. Which mode runs is decided by
//! the dispatcher, never by the decoders themselves.

use async_trait::async_trait;

use crate::error::MiraError;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::Update;
use crate::wire::Opcode;

mod distance;
mod handshake;
mod image;
mod pointer;
mod reserved;

pub use distance::DistanceCmd;
pub use handshake::HandshakeReplyCmd;
pub use image::ImageCmd;
pub use pointer::PointerCmd;
pub use reserved::ReservedCmd;

// ── Command ──────────────────────────────────────────────────────

/// A protocol command decoder.
///
/// `decode` consumes the command's payload and may produce an update;
/// `skip` consumes exactly the same number of payload bytes without
/// producing anything or touching decoder state.
#[async_trait]
pub trait Command: Send {
    async fn decode(
        &mut self,
        stream: &mut FrameStream,
        session: &mut Session,
    ) -> Result<Option<Update>, MiraError>;

    async fn skip(
        &mut self,
        stream: &mut FrameStream,
        session: &mut Session,
    ) -> Result<(), MiraError>;
}

// ── CommandSet ───────────────────────────────────────────────────

/// Immutable opcode → decoder table, fixed at pump construction.
///
/// Every byte in `[0, len)` resolves to exactly one decoder; anything
/// outside is a fatal protocol error surfaced by the dispatcher.
pub struct CommandSet {
    commands: Vec<Box<dyn Command>>,
}

impl CommandSet {
    /// Build the standard table. `pool_frames` sizes the image
    /// decoder's buffer pool.
    pub fn new(pool_frames: usize) -> Self {
        let commands: Vec<Box<dyn Command>> = vec![
            Box::new(ReservedCmd),
            Box::new(HandshakeReplyCmd),
            Box::new(ImageCmd::new(pool_frames)),
            Box::new(PointerCmd::new()),
            Box::new(DistanceCmd),
        ];
        debug_assert_eq!(commands.len(), Opcode::COUNT);
        Self { commands }
    }

    /// Number of opcodes in the table.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Look up the decoder for an opcode byte.
    pub fn get_mut(&mut self, opcode: u8) -> Option<&mut Box<dyn Command>> {
        self.commands.get_mut(opcode as usize)
    }
}
