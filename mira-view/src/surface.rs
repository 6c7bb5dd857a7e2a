//! In-memory render target.
//!
//! Headless stand-in for a GPU texture pair: one byte buffer for the
//! screen, one RGBA buffer for the cursor overlay. Blits are clamped
//! to the allocated dimensions so a malformed patch can never write
//! out of bounds.

use mira_core::{ImagePatch, Surface};

/// Cursor overlay is always RGBA.
const POINTER_BPP: usize = 4;

/// Byte-buffer implementation of the renderer write contract.
pub struct MemorySurface {
    width: u32,
    height: u32,
    bpp: usize,
    screen: Vec<u8>,
    pointer: Vec<u8>,
    blits: u64,
}

impl MemorySurface {
    /// `bpp` is the negotiated screen format's bytes per pixel.
    pub fn new(bpp: usize) -> Self {
        Self {
            width: 0,
            height: 0,
            bpp,
            screen: Vec::new(),
            pointer: Vec::new(),
            blits: 0,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Blits applied since setup.
    pub fn blits(&self) -> u64 {
        self.blits
    }

    pub fn screen_bytes(&self) -> &[u8] {
        &self.screen
    }

    pub fn pointer_bytes(&self) -> &[u8] {
        &self.pointer
    }

    fn blit(target: &mut [u8], stride: usize, height: u32, patch: &ImagePatch, bpp: usize) {
        let rows = patch.height.min(height.saturating_sub(patch.y)) as usize;
        let dst_x = patch.x as usize * bpp;
        if dst_x >= stride {
            // Fully right of the surface; nothing visible.
            return;
        }
        let full_row = patch.width as usize * bpp;
        let copy = full_row.min(stride - dst_x);

        for row in 0..rows {
            let src = row * full_row;
            let dst = (patch.y as usize + row) * stride + dst_x;
            target[dst..dst + copy].copy_from_slice(&patch.pixels[src..src + copy]);
        }
    }
}

impl Surface for MemorySurface {
    fn setup(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.screen = vec![0; width as usize * height as usize * self.bpp];
        self.pointer = vec![0; width as usize * height as usize * POINTER_BPP];
        self.blits = 0;
    }

    fn blit_screen(&mut self, patch: &ImagePatch) {
        let stride = self.width as usize * self.bpp;
        Self::blit(&mut self.screen, stride, self.height, patch, self.bpp);
        self.blits += 1;
    }

    fn blit_pointer(&mut self, patch: &ImagePatch) {
        let stride = self.width as usize * POINTER_BPP;
        Self::blit(&mut self.pointer, stride, self.height, patch, POINTER_BPP);
        self.blits += 1;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mira_core::Pixels;

    fn patch(x: u32, y: u32, w: u32, h: u32, fill: u8, bpp: usize) -> ImagePatch {
        ImagePatch {
            x,
            y,
            width: w,
            height: h,
            pixels: Pixels::Shared(Bytes::from(vec![fill; (w * h) as usize * bpp])),
        }
    }

    #[test]
    fn screen_blit_lands_at_offset() {
        let mut s = MemorySurface::new(3);
        s.setup(8, 8);
        s.blit_screen(&patch(2, 1, 2, 2, 0xAA, 3));

        let stride = 8 * 3;
        // Row 1, pixels 2..4.
        assert_eq!(&s.screen_bytes()[stride + 6..stride + 12], &[0xAA; 6]);
        // Row 0 untouched.
        assert!(s.screen_bytes()[..stride].iter().all(|&b| b == 0));
        assert_eq!(s.blits(), 1);
    }

    #[test]
    fn oversized_patch_is_clamped() {
        let mut s = MemorySurface::new(3);
        s.setup(4, 4);
        // Claims 8x8 at (2,2); only 2x2 fits.
        s.blit_screen(&patch(2, 2, 8, 8, 0xBB, 3));
        assert_eq!(s.screen_bytes().len(), 4 * 4 * 3);
    }

    #[test]
    fn patch_right_of_surface_is_ignored() {
        let mut s = MemorySurface::new(3);
        s.setup(4, 4);
        // Well-formed 1x1 patch at an absurd x offset: nothing to
        // draw, and no write may land outside the buffer.
        s.blit_screen(&patch(1_000_000, 0, 1, 1, 0xEE, 3));
        assert!(s.screen_bytes().iter().all(|&b| b == 0));

        // Same on the boundary itself.
        s.blit_screen(&patch(4, 0, 1, 1, 0xEE, 3));
        assert!(s.screen_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn patch_below_surface_is_ignored() {
        let mut s = MemorySurface::new(3);
        s.setup(4, 4);
        s.blit_screen(&patch(0, 1_000_000, 1, 1, 0xEE, 3));
        assert!(s.screen_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn pointer_overlay_is_separate() {
        let mut s = MemorySurface::new(3);
        s.setup(8, 8);
        s.blit_pointer(&patch(0, 0, 2, 2, 0xCC, 4));

        assert_eq!(&s.pointer_bytes()[..8], &[0xCC; 8]);
        assert!(s.screen_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn setup_resets_counters() {
        let mut s = MemorySurface::new(3);
        s.setup(4, 4);
        s.blit_screen(&patch(0, 0, 1, 1, 0x11, 3));
        s.setup(8, 8);
        assert_eq!(s.blits(), 0);
        assert_eq!(s.dimensions(), (8, 8));
    }
}
