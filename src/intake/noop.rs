use anyhow::Result;
use async_trait::async_trait;
use kanal::AsyncSender;

use crate::traits::EventIntake;
use crate::types::AnchorRequest;

/// Noop intake for the default initialization path.
pub struct NoopIntake;

#[async_trait]
impl EventIntake for NoopIntake {
    fn name(&self) -> &'static str {
        "noop-intake"
    }

    async fn open(&mut self, _tx: AsyncSender<AnchorRequest>) -> Result<()> {
        tracing::info!("NoopIntake: open() called - no events to send");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        tracing::info!("NoopIntake: close() called");
        Ok(())
    }
}
