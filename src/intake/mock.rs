use anyhow::Result;
use async_trait::async_trait;
use kanal::AsyncSender;

use crate::traits::EventIntake;
use crate::types::AnchorRequest;

/// Mock intake for testing: replays a fixed list of requests.
pub struct MockIntake {
    pub requests: Vec<AnchorRequest>,
    pub delay_ms: u64,
}

impl MockIntake {
    pub fn new(requests: Vec<AnchorRequest>, delay_ms: u64) -> Self {
        Self { requests, delay_ms }
    }
}

impl Default for MockIntake {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            delay_ms: 0,
        }
    }
}

#[async_trait]
impl EventIntake for MockIntake {
    fn name(&self) -> &'static str {
        "mock-intake"
    }

    async fn open(&mut self, tx: AsyncSender<AnchorRequest>) -> Result<()> {
        let requests = self.requests.clone();
        let delay = self.delay_ms;

        tokio::spawn(async move {
            for request in requests {
                if delay > 0 {
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                }
                if tx.send(request).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
