//! Byte-stream read seam between the pump and the transport.
//!
//! The transport collaborator only has to supply an [`AsyncRead`]; the
//! pump owns it exclusively for the session's lifetime. All multi-byte
//! reads are big-endian. End-of-stream surfaces as `None` from
//! [`FrameStream::read_opcode`] and as [`MiraError::UnexpectedEof`]
//! when it happens in the middle of a command payload.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::MiraError;

/// Scratch size for skip/drain reads.
const DISCARD_CHUNK: usize = 4096;

/// Buffered view of the session's inbound byte stream.
pub struct FrameStream {
    inner: Box<dyn AsyncRead + Send + Unpin>,
}

impl FrameStream {
    /// Wrap a transport read half.
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            inner: Box::new(reader),
        }
    }

    /// Discard bytes left over from a previous session.
    ///
    /// Reads until the stream stays quiet for `window`. A zero window
    /// disables draining. Returns the number of bytes discarded.
    pub async fn drain_stale(&mut self, window: Duration) -> Result<usize, MiraError> {
        if window.is_zero() {
            return Ok(0);
        }
        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut discarded = 0usize;
        loop {
            match tokio::time::timeout(window, self.inner.read(&mut scratch)).await {
                Err(_) => break, // quiet — nothing stale left
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => return Err(e.into()),
            }
        }
        Ok(discarded)
    }

    /// Read the next opcode byte.
    ///
    /// Returns `Ok(None)` when the transport has closed. This is the
    /// only read the watchdog wraps, and it must stay a single-byte
    /// read: a one-byte read either completes or consumes nothing, so
    /// the select loop in the pump can poll it across timeout cycles
    /// without ever losing stream position.
    pub async fn read_opcode(&mut self) -> Result<Option<u8>, MiraError> {
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte).await? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Read a single byte, treating end-of-stream as an error.
    pub async fn read_u8(&mut self) -> Result<u8, MiraError> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte).await?;
        Ok(byte[0])
    }

    /// Read a big-endian `i32`.
    pub async fn read_i32(&mut self) -> Result<i32, MiraError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Fill `buf` completely, looping over short reads.
    ///
    /// End-of-stream before the buffer is full is a fatal I/O error —
    /// partial payloads are never delivered.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), MiraError> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(MiraError::UnexpectedEof);
            }
            filled += n;
        }
        Ok(())
    }

    /// Consume and discard exactly `n` bytes.
    pub async fn skip(&mut self, mut n: usize) -> Result<(), MiraError> {
        let mut scratch = [0u8; DISCARD_CHUNK];
        while n > 0 {
            let want = n.min(DISCARD_CHUNK);
            let read = self.inner.read(&mut scratch[..want]).await?;
            if read == 0 {
                return Err(MiraError::UnexpectedEof);
            }
            n -= read;
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opcode_read_and_eof() {
        let mock = tokio_test::io::Builder::new().read(&[0x02]).build();
        let mut stream = FrameStream::new(mock);

        assert_eq!(stream.read_opcode().await.unwrap(), Some(0x02));
        assert_eq!(stream.read_opcode().await.unwrap(), None);
    }

    #[tokio::test]
    async fn big_endian_i32() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0x00, 0x00, 0x03, 0x20])
            .build();
        let mut stream = FrameStream::new(mock);
        assert_eq!(stream.read_i32().await.unwrap(), 800);
    }

    #[tokio::test]
    async fn read_exact_spans_short_reads() {
        // Payload split across three reads.
        let mock = tokio_test::io::Builder::new()
            .read(&[1, 2])
            .read(&[3])
            .read(&[4, 5, 6])
            .build();
        let mut stream = FrameStream::new(mock);

        let mut buf = [0u8; 6];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn read_exact_truncated_is_eof() {
        let mock = tokio_test::io::Builder::new().read(&[1, 2, 3]).build();
        let mut stream = FrameStream::new(mock);

        let mut buf = [0u8; 8];
        let err = stream.read_exact(&mut buf).await.unwrap_err();
        assert!(matches!(err, MiraError::UnexpectedEof));
    }

    #[tokio::test]
    async fn skip_preserves_framing() {
        let mock = tokio_test::io::Builder::new()
            .read(&[9, 9, 9, 9, 9, 0x07])
            .build();
        let mut stream = FrameStream::new(mock);

        stream.skip(5).await.unwrap();
        assert_eq!(stream.read_opcode().await.unwrap(), Some(0x07));
    }

    #[tokio::test]
    async fn skip_truncated_is_eof() {
        let mock = tokio_test::io::Builder::new().read(&[1, 2]).build();
        let mut stream = FrameStream::new(mock);
        assert!(matches!(
            stream.skip(10).await.unwrap_err(),
            MiraError::UnexpectedEof
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_discards_stale_bytes() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0xde, 0xad, 0xbe, 0xef])
            .build();
        let mut stream = FrameStream::new(mock);

        let n = stream
            .drain_stale(Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(n, 4);
    }

    #[tokio::test]
    async fn zero_window_disables_drain() {
        let mock = tokio_test::io::Builder::new().read(&[0x01]).build();
        let mut stream = FrameStream::new(mock);

        assert_eq!(stream.drain_stale(Duration::ZERO).await.unwrap(), 0);
        // The byte is still there for the opcode read.
        assert_eq!(stream.read_opcode().await.unwrap(), Some(0x01));
    }
}
