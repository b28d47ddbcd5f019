use anyhow::Result;
use async_trait::async_trait;
use kanal::AsyncSender;

use crate::types::AnchorRequest;

/// Trait for event intakes that trigger anchoring runs (webhook server,
/// queue consumer, replayed fixtures in tests).
///
/// Implementations produce `AnchorRequest`s into the app's channel and
/// own whatever listener they need; errors inside the intake are logged,
/// never propagated back to the event sender.
#[async_trait]
pub trait EventIntake: Send + Sync {
    /// Human-readable intake name for logging.
    fn name(&self) -> &'static str;

    /// Open/start the intake with a channel to send requests.
    async fn open(&mut self, tx: AsyncSender<AnchorRequest>) -> Result<()>;

    /// Close/stop the intake and release resources.
    async fn close(&mut self) -> Result<()>;
}
