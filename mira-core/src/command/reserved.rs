//! Opcode 0 — reserved for the outbound handshake request.

use async_trait::async_trait;

use crate::command::Command;
use crate::error::MiraError;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::Update;

/// The handshake-request opcode seen on the *receive* path.
///
/// We send Init; the peer never does. Before the handshake this slot
/// is only ever skipped (a no-op — the command carries no inbound
/// payload); decoding it means the peer is broken.
pub struct ReservedCmd;

#[async_trait]
impl Command for ReservedCmd {
    async fn decode(
        &mut self,
        _stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<Option<Update>, MiraError> {
        Err(MiraError::ProtocolViolation(
            "opcode 0 is outbound-only; peer must not send it",
        ))
    }

    async fn skip(
        &mut self,
        _stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<(), MiraError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{PointerFormat, ScreenFormat};

    #[tokio::test]
    async fn decode_is_fatal() {
        let mock = tokio_test::io::Builder::new().build();
        let mut stream = FrameStream::new(mock);
        let mut session = Session::new(1, ScreenFormat::Rgb, PointerFormat::Rgba);

        let err = ReservedCmd
            .decode(&mut stream, &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, MiraError::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn skip_consumes_nothing() {
        let mock = tokio_test::io::Builder::new().read(&[0x01]).build();
        let mut stream = FrameStream::new(mock);
        let mut session = Session::new(1, ScreenFormat::Rgb, PointerFormat::Rgba);

        ReservedCmd.skip(&mut stream, &mut session).await.unwrap();
        assert_eq!(stream.read_opcode().await.unwrap(), Some(0x01));
    }
}
