//! Bounded hand-off queue between the pump and the renderer.
//!
//! Single producer (the pump), single consumer (the rendering loop).
//! The producer never waits: when the queue is at capacity the newest
//! update is dropped. Updates are idempotent restatements of pixel
//! regions, so a dropped update only costs staleness that the next
//! update repairs. The consumer side polls non-blocking — an empty
//! queue just means nothing to draw this frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::MiraError;
use crate::update::Update;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Create a bounded hand-off queue.
pub fn update_queue(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        UpdateSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        UpdateReceiver { rx, dropped },
    )
}

// ── UpdateSender ─────────────────────────────────────────────────

/// Producer half held by the pump.
#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::Sender<Update>,
    dropped: Arc<AtomicU64>,
}

impl UpdateSender {
    /// Enqueue an update without blocking.
    ///
    /// A full queue drops the update and returns `Ok`; a closed queue
    /// (consumer gone) is an error that ends the session.
    pub fn push(&self, update: Update) -> Result<(), MiraError> {
        match self.tx.try_send(update) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(total, "hand-off queue full, dropping update");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MiraError::QueueClosed),
        }
    }

    /// Updates dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── UpdateReceiver ───────────────────────────────────────────────

/// Consumer half held by the rendering loop.
pub struct UpdateReceiver {
    rx: mpsc::Receiver<Update>,
    dropped: Arc<AtomicU64>,
}

impl UpdateReceiver {
    /// Non-blocking poll for the next update.
    pub fn poll_update(&mut self) -> Option<Update> {
        self.rx.try_recv().ok()
    }

    /// Await the next update; `None` once the pump has terminated
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<Update> {
        self.rx.recv().await
    }

    /// Updates dropped so far on the producer side.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_update() -> Update {
        Update::SetupScreen {
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn fifo_order() {
        let (tx, mut rx) = update_queue(4);
        tx.push(Update::SetupScreen {
            width: 800,
            height: 480,
        })
        .unwrap();
        tx.push(setup_update()).unwrap();

        match rx.poll_update() {
            Some(Update::SetupScreen { width: 800, .. }) => {}
            other => panic!("expected first update, got {other:?}"),
        }
        assert!(rx.poll_update().is_some());
        assert!(rx.poll_update().is_none());
    }

    #[tokio::test]
    async fn overflow_drops_newest_without_blocking() {
        let (tx, mut rx) = update_queue(2);
        for _ in 0..5 {
            tx.push(setup_update()).unwrap();
        }
        assert_eq!(tx.dropped(), 3);

        // Only the first two made it through.
        assert!(rx.poll_update().is_some());
        assert!(rx.poll_update().is_some());
        assert!(rx.poll_update().is_none());
        assert_eq!(rx.dropped(), 3);
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let (tx, rx) = update_queue(2);
        drop(rx);
        assert!(matches!(
            tx.push(setup_update()),
            Err(MiraError::QueueClosed)
        ));
    }
}
