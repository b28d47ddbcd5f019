//! Async task orchestration with tokio::spawn - calls pipeline logic
//! from steps.rs.

use std::time::Duration;

use anyhow::Result;
use kanal::unbounded_async;
use tracing::{error, info, span, Instrument, Level};

use crate::traits::EventIntake;
use crate::types::AnchorRequest;

use super::core::Anchorsmith;

/// UTC unix seconds.
pub fn now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before UNIX_EPOCH")
        .as_secs()
}

impl Anchorsmith {
    /// Run the application: spawn all tasks and orchestrate the system.
    ///
    /// Three long-lived tasks:
    /// 1. Intake: the event intake feeding anchor requests into the channel
    /// 2. Request loop: one spawned pipeline run per incoming document
    /// 3. Scheduler: claims due checkpoint tasks from the durable store
    pub async fn run(self) -> Result<()> {
        info!(
            "Starting anchorsmith (fast_delay={}s, full_delay={}s, nodes={})",
            self.config.fast_delay_secs, self.config.full_delay_secs, self.config.submit_node_count
        );

        // Build the run context before destructuring moves the seams.
        let context = self.context();

        let (request_tx, request_rx) = unbounded_async::<AnchorRequest>();

        let Anchorsmith {
            mut intake,
            config,
            tasks,
            ..
        } = self;

        // Tasks scheduled before a restart are picked up again here.
        match tasks.pending() {
            Ok(pending) if !pending.is_empty() => {
                info!("Resuming {} pending checkpoint tasks", pending.len())
            }
            Ok(_) => {}
            Err(e) => error!("Could not scan pending checkpoint tasks: {}", e),
        }

        // === Intake task: receive document-changed events ===
        let intake_handle = tokio::spawn(
            async move {
                info!("Opening event intake: {}", intake.name());
                if let Err(e) = intake.open(request_tx).await {
                    error!("Event intake failed to open: {}", e);
                    return Err(e);
                }

                // The intake owns its listener; keep it alive for the
                // app's lifetime.
                std::future::pending::<()>().await;
                #[allow(unreachable_code)]
                Ok::<(), anyhow::Error>(())
            }
            .instrument(span!(Level::INFO, "intake_task")),
        );

        // === Request loop: one pipeline run per incoming document ===
        let request_handle = {
            let context = context.clone();
            tokio::spawn(
                async move {
                    info!("Request loop started");

                    while let Ok(request) = request_rx.recv().await {
                        let context = context.clone();
                        tokio::spawn(async move {
                            context.run_anchoring_pipeline(&request.document_id).await;
                        });
                    }

                    info!("Request loop finished (channel closed)");
                    Ok::<(), anyhow::Error>(())
                }
                .instrument(span!(Level::INFO, "request_task")),
            )
        };

        // === Scheduler: claim due checkpoint tasks from the store ===
        let scheduler_handle = {
            let context = context.clone();
            let tick = config.scheduler_tick_secs;
            tokio::spawn(
                async move {
                    info!("Scheduler started (tick={}s)", tick);

                    loop {
                        tokio::time::sleep(Duration::from_secs(tick)).await;

                        let now = now_secs();
                        let due = match context.tasks.due(now) {
                            Ok(due) => due,
                            Err(e) => {
                                error!("Task scan failed: {}", e);
                                continue;
                            }
                        };

                        for task in due {
                            // Claim before dispatch so the next tick
                            // cannot double-fire the same task.
                            if let Err(e) = context.tasks.remove(&task) {
                                error!("Task claim failed for {}: {}", task.document_id, e);
                                continue;
                            }
                            let context = context.clone();
                            tokio::spawn(async move {
                                context.run_full_checkpoint(task).await;
                            });
                        }
                    }
                    // This will never be reached but satisfies return type
                    #[allow(unreachable_code)]
                    Ok::<(), anyhow::Error>(())
                }
                .instrument(span!(Level::INFO, "scheduler_task")),
            )
        };

        let (intake_res, request_res, scheduler_res) =
            tokio::join!(intake_handle, request_handle, scheduler_handle);

        intake_res??;
        request_res??;
        scheduler_res??;

        info!("Anchorsmith run completed");
        Ok(())
    }
}
