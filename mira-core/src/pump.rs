//! The command pump — protocol state machine and read loop.
//!
//! Owns the transport for the session's lifetime. After draining
//! stale bytes and writing the one-shot handshake request, the loop
//! reads one opcode byte at a time, routes it through the
//! [`CommandSet`], and forwards decoded updates to the hand-off
//! queue. Until the handshake reply succeeds every other command is
//! dispatched in skip mode so the stream stays framed; the mode gate
//! lives here, not in the decoders.
//!
//! A stalled peer is handled by the watchdog around the opcode read:
//! each timeout injects a "no signal" border overlay and re-polls the
//! *same* in-flight read. The session ends on transport close, fatal
//! protocol or I/O error, or cooperative cancellation — never with a
//! retry.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::command::CommandSet;
use crate::error::MiraError;
use crate::queue::UpdateSender;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::Update;
use crate::wire::{HandshakeRequest, Opcode, PointerFormat, ScreenFormat, PROTOCOL_VERSION};

// ── PumpConfig ───────────────────────────────────────────────────

/// Tunables for one pump instance.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Version advertised in the handshake request.
    pub protocol_version: u8,
    /// Screen format offered to the peer.
    pub screen_format: ScreenFormat,
    /// Pointer format offered to the peer.
    pub pointer_format: PointerFormat,
    /// Frame buffers kept by the image decoder's pool.
    pub pool_frames: usize,
    /// Silence on the wire longer than this triggers a "no signal"
    /// overlay.
    pub watchdog_timeout: Duration,
    /// Quiet window used to drain stale bytes at startup; zero
    /// disables draining.
    pub drain_window: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            screen_format: ScreenFormat::Rgb,
            pointer_format: PointerFormat::Rgba,
            pool_frames: 3,
            watchdog_timeout: Duration::from_secs(10),
            drain_window: Duration::from_millis(25),
        }
    }
}

// ── RenderSink ───────────────────────────────────────────────────

/// Callbacks the renderer collaborator exposes to the pump.
///
/// Updates themselves travel through the hand-off queue; this trait
/// only carries the out-of-band signals.
pub trait RenderSink: Send {
    /// Negotiated screen dimensions, delivered exactly once when the
    /// handshake completes.
    fn screen_configured(&mut self, width: u32, height: u32);

    /// An update was enqueued; the renderer may want to redraw.
    fn request_redraw(&mut self);
}

/// Headless operation: ignore all render signals.
impl RenderSink for () {
    fn screen_configured(&mut self, _width: u32, _height: u32) {}
    fn request_redraw(&mut self) {}
}

// ── CmdPump ──────────────────────────────────────────────────────

/// Protocol state machine driving one mirroring session.
pub struct CmdPump {
    stream: FrameStream,
    writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    commands: CommandSet,
    session: Session,
    updates: UpdateSender,
    sink: Box<dyn RenderSink>,
    cancel: CancellationToken,
    config: PumpConfig,
}

impl CmdPump {
    /// Build a pump over the transport's read half and optional
    /// write half. A `None` writer degrades to one-directional
    /// operation: the handshake request is skipped but the read side
    /// runs normally.
    pub fn new(
        reader: impl tokio::io::AsyncRead + Send + Unpin + 'static,
        writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
        updates: UpdateSender,
        sink: Box<dyn RenderSink>,
        config: PumpConfig,
    ) -> Self {
        let session = Session::new(
            config.protocol_version,
            config.screen_format,
            config.pointer_format,
        );
        Self {
            stream: FrameStream::new(reader),
            writer,
            commands: CommandSet::new(config.pool_frames),
            session,
            updates,
            sink,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Token that cooperatively stops the loop. Cancellation takes
    /// effect between opcode dispatches, never inside a decode.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok` on clean shutdown (transport closed or
    /// cancellation); any error is terminal — there is no retry or
    /// reconnect at this layer.
    pub async fn run(mut self) -> Result<(), MiraError> {
        let result = self.pump().await;
        self.session.terminate();
        match &result {
            Ok(()) => info!("session closed"),
            Err(e) => error!(error = %e, "session failed"),
        }
        result
    }

    async fn pump(&mut self) -> Result<(), MiraError> {
        let discarded = self.stream.drain_stale(self.config.drain_window).await?;
        if discarded > 0 {
            debug!(discarded, "discarded stale bytes from previous session");
        }

        self.send_handshake().await?;

        loop {
            if self.cancel.is_cancelled() {
                info!("pump cancelled");
                return Ok(());
            }
            let Some(code) = self.read_opcode_watched().await? else {
                info!("transport closed");
                return Ok(());
            };
            self.dispatch(code).await?;
        }
    }

    /// Write the fixed 4-byte handshake request, flush, and shut the
    /// write side down — this protocol version never writes again.
    async fn send_handshake(&mut self) -> Result<(), MiraError> {
        let request = HandshakeRequest {
            version: self.session.version(),
            screen_formats: self.session.screen_format().mask_bit(),
            pointer_formats: self.session.pointer_format().mask_bit(),
        };
        match self.writer.take() {
            Some(mut w) => {
                w.write_all(&request.encode()).await?;
                w.flush().await?;
                w.shutdown().await?;
                debug!(version = request.version, "handshake request sent");
            }
            None => warn!("transport has no write side; running read-only"),
        }
        self.session.handshake_sent()
    }

    /// Read the next opcode byte under the stall watchdog.
    ///
    /// Exactly one read is in flight at a time: the same future is
    /// polled across timeout cycles, so a peer that wakes up after
    /// several "no signal" injections is dispatched normally.
    async fn read_opcode_watched(&mut self) -> Result<Option<u8>, MiraError> {
        let Self {
            stream,
            session,
            updates,
            sink,
            cancel,
            config,
            ..
        } = self;

        let read = stream.read_opcode();
        tokio::pin!(read);
        loop {
            tokio::select! {
                result = &mut read => return result,
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(config.watchdog_timeout) => {
                    warn!(timeout = ?config.watchdog_timeout, "no data from peer");
                    if session.is_ready() {
                        updates.push(Update::no_signal(
                            session.width(),
                            session.height(),
                            session.screen_format(),
                        ))?;
                        sink.request_redraw();
                    }
                }
            }
        }
    }

    /// Route one opcode to its decoder.
    async fn dispatch(&mut self, code: u8) -> Result<(), MiraError> {
        let ready = self.session.is_ready();
        let Some(cmd) = self.commands.get_mut(code) else {
            return Err(MiraError::UnknownOpcode(code));
        };

        // Until the handshake reply lands, only the reply itself is
        // decoded; everything else is skipped to keep the framing.
        if ready || code == Opcode::InitReply as u8 {
            if let Some(update) = cmd.decode(&mut self.stream, &mut self.session).await? {
                if !ready && self.session.is_ready() {
                    self.sink
                        .screen_configured(self.session.width(), self.session.height());
                }
                self.updates.push(update)?;
                self.sink.request_redraw();
            }
        } else {
            trace!(code, "skip-mode dispatch before handshake");
            cmd.skip(&mut self.stream, &mut self.session).await?;
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
