//! # mira-core
//!
//! Client-side protocol library for the mira screen-mirroring
//! system: a producer endpoint receives a remote framebuffer and
//! cursor stream over a byte transport and hands decoded updates to
//! a renderer.
//!
//! This crate contains:
//! - **Wire types**: `Opcode`, `HandshakeRequest`, `ReplyCode`,
//!   pixel formats
//! - **Command decoders**: one per opcode, with full and skip modes
//! - **Pump**: `CmdPump` — handshake, dispatch loop, stall watchdog
//! - **Updates**: `Update` / `Surface` — the renderer write contract
//! - **Hand-off queue**: bounded SPSC `UpdateSender`/`UpdateReceiver`
//! - **Pool**: `FramePool` of recycled frame buffers
//! - **Error**: `MiraError` — typed, `thiserror`-based hierarchy

pub mod command;
pub mod error;
pub mod pool;
pub mod pump;
pub mod queue;
pub mod session;
pub mod stream;
pub mod update;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::{Command, CommandSet};
pub use error::MiraError;
pub use pool::{FramePool, PooledFrame};
pub use pump::{CmdPump, PumpConfig, RenderSink};
pub use queue::{DEFAULT_QUEUE_CAPACITY, UpdateReceiver, UpdateSender, update_queue};
pub use session::{PumpPhase, Session};
pub use stream::FrameStream;
pub use update::{ImagePatch, Pixels, Surface, Update};
pub use wire::{
    HandshakeRequest, Opcode, PROTOCOL_VERSION, PointerFormat, ReplyCode, ScreenFormat,
};
