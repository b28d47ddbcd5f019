use anyhow::Result;
use async_trait::async_trait;
use kanal::AsyncSender;

use super::http::WebhookIntake;
use super::mock::MockIntake;
use super::noop::NoopIntake;
use crate::traits::EventIntake;
use crate::types::AnchorRequest;

/// Enum representing all possible event intake implementations.
pub enum IntakeVariant {
    Noop(NoopIntake),
    Mock(MockIntake),
    Webhook(WebhookIntake),
}

#[async_trait]
impl EventIntake for IntakeVariant {
    fn name(&self) -> &'static str {
        match self {
            IntakeVariant::Noop(inner) => inner.name(),
            IntakeVariant::Mock(inner) => inner.name(),
            IntakeVariant::Webhook(inner) => inner.name(),
        }
    }

    async fn open(&mut self, tx: AsyncSender<AnchorRequest>) -> Result<()> {
        match self {
            IntakeVariant::Noop(inner) => inner.open(tx).await,
            IntakeVariant::Mock(inner) => inner.open(tx).await,
            IntakeVariant::Webhook(inner) => inner.open(tx).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            IntakeVariant::Noop(inner) => inner.close().await,
            IntakeVariant::Mock(inner) => inner.close().await,
            IntakeVariant::Webhook(inner) => inner.close().await,
        }
    }
}
