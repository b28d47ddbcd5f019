use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use anchorsmith::config::BaseConfig;
use anchorsmith::intake::{IntakeVariant, WebhookIntake};
use anchorsmith::network::{AnchorNetworkVariant, HttpAnchorClient};
use anchorsmith::pipeline::Anchorsmith;
use anchorsmith::source::{DocumentSourceVariant, HttpDocumentSource};
use anchorsmith::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize telemetry
    telemetry::init();
    info!("Starting anchorsmith");

    // Parse configuration from CLI arguments / environment
    let config = BaseConfig::parse();
    info!(
        "Configuration: bind_addr={}, task_store_path={}, discovery_uri={}",
        config.bind_addr, config.task_store_path, config.discovery_uri
    );

    // Initialize the app, then install the real seams
    let mut app = Anchorsmith::initialize(config.clone())?;
    app.intake = IntakeVariant::Webhook(WebhookIntake::new(
        config.bind_addr.clone(),
        config.webhook_key.clone(),
    ));
    app.network = Arc::new(AnchorNetworkVariant::Http(HttpAnchorClient::new(
        config.discovery_uri.clone(),
    )));
    app.source = Arc::new(DocumentSourceVariant::Http(HttpDocumentSource::new(
        config.source_uri.clone(),
        config.source_token.clone(),
    )));

    app.run().await?;

    info!("Anchorsmith shutdown complete");
    Ok(())
}
