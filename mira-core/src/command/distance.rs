//! Opcode 4 — reserved keepalive.

use async_trait::async_trait;

use crate::command::Command;
use crate::error::MiraError;
use crate::session::Session;
use crate::stream::FrameStream;
use crate::update::Update;

/// Placeholder for future depth-sensing data. Carries no payload and
/// never produces an update; it exists so the opcode stays reserved
/// and the table stays dense.
pub struct DistanceCmd;

#[async_trait]
impl Command for DistanceCmd {
    async fn decode(
        &mut self,
        _stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<Option<Update>, MiraError> {
        Ok(None)
    }

    async fn skip(
        &mut self,
        _stream: &mut FrameStream,
        _session: &mut Session,
    ) -> Result<(), MiraError> {
        Ok(())
    }
}
