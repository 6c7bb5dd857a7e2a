//! Opcode 1 — handshake reply.

use async_trait::async_trait;
use tracing::debug;

use crate::command::Command;
use crate::error::MiraError;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::Update;
use crate::wire::{PointerFormat, ReplyCode, ScreenFormat};

/// Decodes the peer's answer to our handshake request.
///
/// Wire layout: `{result:1, screen_fmt:1, pointer_fmt:1, width:4,
/// height:4}`. Any non-success result ends the session with the
/// code's message. On success the negotiated geometry lands on the
/// session and a [`Update::SetupScreen`] flows to the renderer.
///
/// This is the one decoder the dispatcher always runs in full mode —
/// it is what *causes* the transition out of skip mode.
pub struct HandshakeReplyCmd;

/// Wire size of the reply after the opcode byte.
const REPLY_SIZE: usize = 11;

#[async_trait]
impl Command for HandshakeReplyCmd {
    async fn decode(
        &mut self,
        stream: &mut FrameStream,
        session: &mut Session,
    ) -> Result<Option<Update>, MiraError> {
        let result = ReplyCode::from_wire(stream.read_u8().await?);
        if result != ReplyCode::Success {
            return Err(MiraError::Handshake(result));
        }

        let screen_format = ScreenFormat::from_wire(stream.read_u8().await?)?;
        let pointer_format = PointerFormat::from_wire(stream.read_u8().await?)?;
        let width = stream.read_i32().await?;
        let height = stream.read_i32().await?;
        if width <= 0 || height <= 0 {
            return Err(MiraError::ProtocolViolation(
                "handshake reply with non-positive screen dimensions",
            ));
        }

        session.complete_handshake(screen_format, pointer_format, width as u32, height as u32)?;
        debug!(width, height, ?screen_format, "handshake complete");

        Ok(Some(Update::SetupScreen {
            width: width as u32,
            height: height as u32,
        }))
    }

    async fn skip(
        &mut self,
        stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<(), MiraError> {
        // Unreachable through the dispatcher (the reply is always
        // fully decoded); kept for framing completeness.
        stream.skip(REPLY_SIZE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let mut s = Session::new(1, ScreenFormat::Rgb, PointerFormat::Rgba);
        s.handshake_sent().unwrap();
        s
    }

    fn reply_bytes(result: u8, width: i32, height: i32) -> Vec<u8> {
        let mut v = vec![result, 0x01, 0x01];
        v.extend_from_slice(&width.to_be_bytes());
        v.extend_from_slice(&height.to_be_bytes());
        v
    }

    #[tokio::test]
    async fn success_records_geometry() {
        let mock = tokio_test::io::Builder::new()
            .read(&reply_bytes(0, 800, 480))
            .build();
        let mut stream = FrameStream::new(mock);
        let mut session = session();

        let update = HandshakeReplyCmd
            .decode(&mut stream, &mut session)
            .await
            .unwrap();

        assert!(session.is_ready());
        assert_eq!(session.width(), 800);
        assert_eq!(session.height(), 480);
        match update {
            Some(Update::SetupScreen {
                width: 800,
                height: 480,
            }) => {}
            other => panic!("expected SetupScreen, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn version_mismatch_is_fatal() {
        // Decoding stops at the result byte; the rest never arrives.
        let mock = tokio_test::io::Builder::new().read(&[2]).build();
        let mut stream = FrameStream::new(mock);
        let mut session = session();

        let err = HandshakeReplyCmd
            .decode(&mut stream, &mut session)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Version mismatch"));
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn unknown_result_code_maps_to_999() {
        let mock = tokio_test::io::Builder::new().read(&[77]).build();
        let mut stream = FrameStream::new(mock);
        let mut session = session();

        let err = HandshakeReplyCmd
            .decode(&mut stream, &mut session)
            .await
            .unwrap_err();
        match err {
            MiraError::Handshake(code) => assert_eq!(code.code(), 999),
            other => panic!("expected handshake error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_screen_format_is_fatal() {
        let mock = tokio_test::io::Builder::new().read(&[0, 0x7F]).build();
        let mut stream = FrameStream::new(mock);
        let mut session = session();

        let err = HandshakeReplyCmd
            .decode(&mut stream, &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, MiraError::UnknownVariant { .. }));
    }
}
