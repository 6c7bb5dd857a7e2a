//! Recycling pool of frame-sized pixel buffers.
//!
//! Screen payloads arrive at up to full-frame size many times per
//! second; allocating per command would churn the allocator for no
//! reason. The pool hands out [`PooledFrame`]s that return their
//! backing buffer through a channel when dropped, so the hand-off is
//! pump → queue → consumer → pool with exactly one owner mutating a
//! buffer at any time. No locks — ownership moves with the frame.
//!
//! `checkout` never blocks: if every pooled buffer is still in
//! flight, a fresh one is allocated and the *return* channel's bound
//! decides whether it is retained or freed. The retained set never
//! exceeds the pool capacity.

use bytes::BytesMut;
use tokio::sync::mpsc;

/// Fixed-capacity pool of reusable frame buffers.
pub struct FramePool {
    frame_size: usize,
    ret_tx: mpsc::Sender<BytesMut>,
    ret_rx: mpsc::Receiver<BytesMut>,
}

impl FramePool {
    /// Create a pool of `capacity` buffers, each able to hold
    /// `frame_size` bytes without reallocating.
    pub fn new(capacity: usize, frame_size: usize) -> Self {
        let (ret_tx, ret_rx) = mpsc::channel(capacity.max(1));
        for _ in 0..capacity.max(1) {
            // Cannot fail: the channel was sized for exactly this many.
            let _ = ret_tx.try_send(BytesMut::with_capacity(frame_size));
        }
        Self {
            frame_size,
            ret_tx,
            ret_rx,
        }
    }

    /// Byte size buffers are provisioned for.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Take a buffer out of the pool, or allocate a fresh one if all
    /// pooled buffers are currently held downstream.
    pub fn checkout(&mut self) -> PooledFrame {
        let buf = self
            .ret_rx
            .try_recv()
            .unwrap_or_else(|_| BytesMut::with_capacity(self.frame_size));
        PooledFrame {
            buf,
            ret: self.ret_tx.clone(),
        }
    }
}

// ── PooledFrame ──────────────────────────────────────────────────

/// A checked-out pool buffer. Dereferences to its byte contents and
/// returns itself to the pool on drop.
#[derive(Debug)]
pub struct PooledFrame {
    buf: BytesMut,
    ret: mpsc::Sender<BytesMut>,
}

impl PooledFrame {
    /// Set the logical length to `len`, zero-filling new bytes.
    pub fn resize(&mut self, len: usize) {
        self.buf.resize(len, 0);
    }
}

impl std::ops::Deref for PooledFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl std::ops::DerefMut for PooledFrame {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledFrame {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        // Channel full means the pool already holds its capacity;
        // the extra buffer is simply freed.
        let _ = self.ret.try_send(buf);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_and_return() {
        let mut pool = FramePool::new(2, 64);

        let mut a = pool.checkout();
        a.resize(64);
        a[0] = 0xAA;
        let ptr_a = a.as_ptr();
        drop(a);

        // The returned buffer is recycled (cleared, same allocation).
        let b = pool.checkout();
        assert_eq!(b.len(), 0);
        assert_eq!(b.as_ptr(), ptr_a);
    }

    #[test]
    fn exhausted_pool_allocates_fresh() {
        let mut pool = FramePool::new(1, 16);

        let held = pool.checkout();
        let extra = pool.checkout(); // pool empty — fresh allocation
        assert_eq!(extra.len(), 0);
        drop(held);
        drop(extra); // one recycled, one freed (channel bound)

        let _again = pool.checkout();
    }

    #[test]
    fn resize_zero_fills() {
        let mut pool = FramePool::new(1, 8);
        let mut f = pool.checkout();
        f.resize(8);
        assert_eq!(&f[..], &[0u8; 8]);
    }
}
