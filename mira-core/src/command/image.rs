//! Opcode 2 — full or partial screen image.

use async_trait::async_trait;

use crate::command::Command;
use crate::error::MiraError;
use crate::pool::FramePool;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::{ImagePatch, Pixels, Update};

/// Decodes screen image updates.
///
/// Wire layout: `{width:4, height:4, x:4, y:4, payload_size:4,
/// payload}`. The payload size is carried explicitly on the wire and
/// must equal `bpp * width * height`; the legacy convention that left
/// the field out and derived the size is not supported.
///
/// Payload buffers come from a pool sized to the *negotiated*
/// full-screen geometry, created lazily on the first decode (the
/// geometry is unknown before the handshake). The buffer travels
/// inside the resulting update and returns to the pool when the
/// consumer drops it.
pub struct ImageCmd {
    pool: Option<FramePool>,
    pool_frames: usize,
}

impl ImageCmd {
    pub fn new(pool_frames: usize) -> Self {
        Self {
            pool: None,
            pool_frames,
        }
    }
}

#[async_trait]
impl Command for ImageCmd {
    async fn decode(
        &mut self,
        stream: &mut FrameStream,
        session: &mut Session,
    ) -> Result<Option<Update>, MiraError> {
        let width = stream.read_i32().await?;
        let height = stream.read_i32().await?;
        let x = stream.read_i32().await?;
        let y = stream.read_i32().await?;
        let payload_size = stream.read_i32().await?;

        if payload_size <= 0 {
            return Err(MiraError::InvalidPayloadSize(payload_size));
        }
        if width <= 0 || height <= 0 || x < 0 || y < 0 {
            return Err(MiraError::ProtocolViolation(
                "image update with negative geometry",
            ));
        }

        // Consumers index the patch as width x height pixels; a size
        // that disagrees with the declared rectangle would read past
        // the payload on apply.
        let bpp = session.screen_format().bytes_per_pixel();
        let expected = bpp * width as usize * height as usize;
        if payload_size as usize != expected {
            return Err(MiraError::ProtocolViolation(
                "image payload size does not match declared geometry",
            ));
        }

        let frame_size = session.screen_format().bytes_per_pixel()
            * session.width() as usize
            * session.height() as usize;
        if payload_size as usize > frame_size {
            return Err(MiraError::ProtocolViolation(
                "image payload exceeds negotiated screen size",
            ));
        }

        let pool_frames = self.pool_frames;
        let pool = self
            .pool
            .get_or_insert_with(|| FramePool::new(pool_frames, frame_size));

        let mut frame = pool.checkout();
        frame.resize(payload_size as usize);
        stream.read_exact(&mut frame[..]).await?;

        Ok(Some(Update::Screen(ImagePatch {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
            pixels: Pixels::Pooled(frame),
        })))
    }

    async fn skip(
        &mut self,
        stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<(), MiraError> {
        stream.skip(8).await?; // width, height
        stream.skip(8).await?; // x, y offsets
        let payload_size = stream.read_i32().await?;
        if payload_size < 0 {
            return Err(MiraError::InvalidPayloadSize(payload_size));
        }
        stream.skip(payload_size as usize).await
    }
}
