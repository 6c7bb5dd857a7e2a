//! Renderer-facing update model.
//!
//! Decoded commands become [`Update`] values: immutable restatements
//! of pixel regions that the consumer applies to its own textures via
//! the [`Surface`] write contract. Updates are idempotent — replaying
//! or dropping one only affects staleness, never correctness.

use std::sync::OnceLock;

use bytes::Bytes;

use crate::pool::PooledFrame;
use crate::wire::ScreenFormat;

/// Width in pixels of the "no signal" border overlay.
pub const NO_SIGNAL_BORDER: u32 = 10;

/// Largest screen edge the shared border buffer covers.
const NO_SIGNAL_MAX_EDGE: usize = 10_000;

// ── Pixels ───────────────────────────────────────────────────────

/// Pixel storage carried by a patch.
///
/// Pool-backed frames flow back to the [`FramePool`](crate::pool::FramePool)
/// once the consumer drops the update; shared buffers (cursor images,
/// border overlays) are cheaply cloned `Bytes`.
#[derive(Debug)]
pub enum Pixels {
    Shared(Bytes),
    Pooled(PooledFrame),
}

impl std::ops::Deref for Pixels {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Pixels::Shared(b) => b,
            Pixels::Pooled(f) => f,
        }
    }
}

// ── ImagePatch ───────────────────────────────────────────────────

/// A sub-rectangle of pixels destined for a texture.
///
/// `pixels` holds at least `width * height * bytes_per_pixel` bytes;
/// shared buffers may be larger than the rectangle needs.
#[derive(Debug)]
pub struct ImagePatch {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
}

// ── Update ───────────────────────────────────────────────────────

/// A decoded, renderer-ready update.
#[derive(Debug)]
pub enum Update {
    /// One-time (re)allocation of the target textures to the
    /// negotiated dimensions.
    SetupScreen { width: u32, height: u32 },
    /// Replace a sub-rectangle of the screen texture.
    Screen(ImagePatch),
    /// Replace a sub-rectangle of the cursor overlay. Erase patches
    /// carry zero-filled pixels.
    Pointer(ImagePatch),
    /// Ordered list of updates; the consumer must apply them in list
    /// order (erase before redraw).
    Multi(Vec<Update>),
    /// Border overlay injected by the stall watchdog.
    NoSignal(Vec<ImagePatch>),
}

impl Update {
    /// Apply this update to a surface, recursing into `Multi` in
    /// list order.
    pub fn apply(&self, surface: &mut dyn Surface) {
        match self {
            Update::SetupScreen { width, height } => surface.setup(*width, *height),
            Update::Screen(patch) => surface.blit_screen(patch),
            Update::Pointer(patch) => surface.blit_pointer(patch),
            Update::Multi(updates) => {
                for u in updates {
                    u.apply(surface);
                }
            }
            Update::NoSignal(patches) => {
                for p in patches {
                    surface.blit_screen(p);
                }
            }
        }
    }

    /// Build the watchdog's border overlay: four green edge
    /// rectangles framing the negotiated screen.
    pub fn no_signal(screen_w: u32, screen_h: u32, format: ScreenFormat) -> Update {
        let border = NO_SIGNAL_BORDER.min(screen_w).min(screen_h);
        let bytes = border_bytes(format);
        let patch = |x: u32, y: u32, w: u32, h: u32| ImagePatch {
            x,
            y,
            width: w,
            height: h,
            pixels: Pixels::Shared(bytes.clone()),
        };
        Update::NoSignal(vec![
            patch(0, 0, border, screen_h),
            patch(0, screen_h.saturating_sub(border), screen_w, border),
            patch(screen_w.saturating_sub(border), 0, border, screen_h),
            patch(0, 0, screen_w, border),
        ])
    }
}

/// Shared green pixel run sized for the longest border rectangle.
fn border_bytes(format: ScreenFormat) -> Bytes {
    static RGB: OnceLock<Bytes> = OnceLock::new();
    static RGBA: OnceLock<Bytes> = OnceLock::new();

    let fill = |bpp: usize| {
        let pixels = NO_SIGNAL_MAX_EDGE * NO_SIGNAL_BORDER as usize;
        let mut buf = vec![0u8; pixels * bpp];
        for px in buf.chunks_exact_mut(bpp) {
            px[1] = 127; // green channel
            if bpp == 4 {
                px[3] = 255;
            }
        }
        Bytes::from(buf)
    };

    match format {
        ScreenFormat::Rgb => RGB.get_or_init(|| fill(3)).clone(),
        ScreenFormat::Rgba => RGBA.get_or_init(|| fill(4)).clone(),
    }
}

// ── Surface ──────────────────────────────────────────────────────

/// Write contract the external renderer implements for its texture
/// and overlay state. The pump never calls this directly; the
/// consumer invokes [`Update::apply`] on dequeued updates.
pub trait Surface {
    /// (Re)allocate screen and pointer textures to `width × height`.
    fn setup(&mut self, width: u32, height: u32);

    /// Replace a sub-rectangle of the screen texture.
    fn blit_screen(&mut self, patch: &ImagePatch);

    /// Replace a sub-rectangle of the cursor overlay.
    fn blit_pointer(&mut self, patch: &ImagePatch);
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        ops: Vec<String>,
    }

    impl Surface for Recorder {
        fn setup(&mut self, width: u32, height: u32) {
            self.ops.push(format!("setup {width}x{height}"));
        }
        fn blit_screen(&mut self, patch: &ImagePatch) {
            self.ops.push(format!(
                "screen {}x{}+{}+{}",
                patch.width, patch.height, patch.x, patch.y
            ));
        }
        fn blit_pointer(&mut self, patch: &ImagePatch) {
            self.ops.push(format!(
                "pointer {}x{}+{}+{}",
                patch.width, patch.height, patch.x, patch.y
            ));
        }
    }

    fn patch(x: u32, y: u32, w: u32, h: u32) -> ImagePatch {
        ImagePatch {
            x,
            y,
            width: w,
            height: h,
            pixels: Pixels::Shared(Bytes::from(vec![0u8; (w * h * 4) as usize])),
        }
    }

    #[test]
    fn multi_applies_in_list_order() {
        let update = Update::Multi(vec![
            Update::Pointer(patch(10, 10, 16, 16)),
            Update::Pointer(patch(50, 50, 16, 16)),
        ]);

        let mut rec = Recorder::default();
        update.apply(&mut rec);
        assert_eq!(rec.ops, ["pointer 16x16+10+10", "pointer 16x16+50+50"]);
    }

    #[test]
    fn no_signal_has_four_borders() {
        let update = Update::no_signal(800, 480, ScreenFormat::Rgb);
        let Update::NoSignal(patches) = &update else {
            panic!("expected NoSignal");
        };
        assert_eq!(patches.len(), 4);
        // Left edge spans the full height at the configured width.
        assert_eq!(patches[0].width, NO_SIGNAL_BORDER);
        assert_eq!(patches[0].height, 480);
        // Bottom edge sits flush with the lower bound.
        assert_eq!(patches[1].y, 480 - NO_SIGNAL_BORDER);

        // Border pixels are green.
        let px = &patches[0].pixels;
        assert_eq!(px[0], 0);
        assert_eq!(px[1], 127);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn no_signal_clamps_to_tiny_screens() {
        let update = Update::no_signal(6, 4, ScreenFormat::Rgb);
        let Update::NoSignal(patches) = &update else {
            panic!("expected NoSignal");
        };
        assert!(patches.iter().all(|p| p.width <= 6 && p.height <= 4));
    }

    #[test]
    fn setup_reaches_surface() {
        let mut rec = Recorder::default();
        Update::SetupScreen {
            width: 800,
            height: 480,
        }
        .apply(&mut rec);
        assert_eq!(rec.ops, ["setup 800x480"]);
    }
}
