//! Opcode 3 — cursor position / image.

use async_trait::async_trait;
use bytes::Bytes;

use crate::command::Command;
use crate::error::MiraError;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::{ImagePatch, Pixels, Update};

/// Cursor pixels are always RGBA.
const CURSOR_BPP: usize = 4;

/// Decodes pointer updates and tracks the erase/redraw cycle.
///
/// Wire layout: `{x:4, y:4, has_cursor:1, [width:4, height:4,
/// payload 4·w·h]}`. The decoder remembers the last drawn rectangle
/// so every new position ships as erase-then-draw; without the erase
/// the cursor would smear trails across the overlay.
///
/// Tracker state belongs to the pump thread alone — the consumer only
/// ever sees the immutable patches.
pub struct PointerCmd {
    last_x: i32,
    last_y: i32,
    /// Cursor dimensions; zero until the first cursor image arrives.
    width: u32,
    height: u32,
    cursor: Bytes,
    erase: Bytes,
}

impl PointerCmd {
    pub fn new() -> Self {
        Self {
            last_x: 0,
            last_y: 0,
            width: 0,
            height: 0,
            cursor: Bytes::new(),
            erase: Bytes::new(),
        }
    }

    /// Clip a cursor-sized rectangle at `(x, y)` to the screen and
    /// crop `pixels` row-by-row when the visible extent is smaller
    /// than the full cursor. Fully off-screen rectangles yield `None`.
    fn patch_at(&self, x: i32, y: i32, pixels: &Bytes, session: &Session) -> Option<ImagePatch> {
        if x < 0 || y < 0 {
            return None;
        }
        let vis_w = (self.width as i64).min(session.width() as i64 - x as i64);
        let vis_h = (self.height as i64).min(session.height() as i64 - y as i64);
        if vis_w <= 0 || vis_h <= 0 {
            return None;
        }
        let (vis_w, vis_h) = (vis_w as u32, vis_h as u32);

        let pixels = if (vis_w, vis_h) == (self.width, self.height) {
            Pixels::Shared(pixels.clone())
        } else {
            let full_row = self.width as usize * CURSOR_BPP;
            let vis_row = vis_w as usize * CURSOR_BPP;
            let mut cropped = Vec::with_capacity(vis_row * vis_h as usize);
            for row in 0..vis_h as usize {
                let start = row * full_row;
                cropped.extend_from_slice(&pixels[start..start + vis_row]);
            }
            Pixels::Shared(Bytes::from(cropped))
        };

        Some(ImagePatch {
            x: x as u32,
            y: y as u32,
            width: vis_w,
            height: vis_h,
            pixels,
        })
    }
}

impl Default for PointerCmd {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for PointerCmd {
    async fn decode(
        &mut self,
        stream: &mut FrameStream,
        session: &mut Session,
    ) -> Result<Option<Update>, MiraError> {
        let x = stream.read_i32().await?;
        let y = stream.read_i32().await?;
        let has_cursor = stream.read_u8().await? != 0;

        if has_cursor {
            let w = stream.read_i32().await?;
            let h = stream.read_i32().await?;
            if w <= 0 || h <= 0 {
                return Err(MiraError::InvalidPayloadSize(
                    w.saturating_mul(h).saturating_mul(CURSOR_BPP as i32),
                ));
            }
            let size = CURSOR_BPP * w as usize * h as usize;
            let mut buf = vec![0u8; size];
            stream.read_exact(&mut buf).await?;

            if (w as u32, h as u32) != (self.width, self.height) {
                self.erase = Bytes::from(vec![0u8; size]);
                self.width = w as u32;
                self.height = h as u32;
            }
            self.cursor = Bytes::from(buf);
        } else if self.width == 0 {
            // The peer must send at least one cursor image before
            // omitting it.
            return Err(MiraError::EmptyPointer);
        }

        let mut parts = Vec::with_capacity(2);
        if let Some(erase) = self.patch_at(self.last_x, self.last_y, &self.erase, session) {
            parts.push(Update::Pointer(erase));
        }
        if let Some(draw) = self.patch_at(x, y, &self.cursor, session) {
            parts.push(Update::Pointer(draw));
        }
        self.last_x = x;
        self.last_y = y;

        Ok(Some(Update::Multi(parts)))
    }

    async fn skip(
        &mut self,
        stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<(), MiraError> {
        stream.skip(8).await?; // x, y
        let has_cursor = stream.read_u8().await? != 0;
        if has_cursor {
            let w = stream.read_i32().await?;
            let h = stream.read_i32().await?;
            if w <= 0 || h <= 0 {
                return Err(MiraError::InvalidPayloadSize(
                    w.saturating_mul(h).saturating_mul(CURSOR_BPP as i32),
                ));
            }
            stream.skip(CURSOR_BPP * w as usize * h as usize).await?;
        }
        Ok(())
    }
}
