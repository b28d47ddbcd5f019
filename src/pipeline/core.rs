//! Core Anchorsmith struct and initialization - no business logic.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::archive::ProofArchive;
use crate::config::BaseConfig;
use crate::intake::{IntakeVariant, NoopIntake};
use crate::network::{AnchorNetworkVariant, NoopAnchorNetwork};
use crate::source::{DocumentSourceVariant, NoopSource};
use crate::task_store::TaskStore;
use crate::types::DocumentId;

/// Main application orchestrator.
///
/// Owns the three external seams (event intake, anchoring network,
/// document source), the durable checkpoint task store, and the
/// in-flight set that keeps two pipeline runs off the same document.
pub struct Anchorsmith {
    /// Event intake that triggers anchoring runs.
    pub intake: IntakeVariant,

    /// Anchoring network client, shared across concurrent pipelines.
    pub network: Arc<AnchorNetworkVariant>,

    /// Document source (accounting platform) client.
    pub source: Arc<DocumentSourceVariant>,

    /// Global/base configuration.
    pub config: BaseConfig,

    /// Durable full-checkpoint task store (RocksDB).
    pub tasks: Arc<TaskStore>,

    /// Documents with a pipeline run currently in flight.
    pub in_flight: Arc<tokio::sync::Mutex<HashSet<DocumentId>>>,
}

/// Clonable slice of the app handed to spawned pipeline runs.
#[derive(Clone)]
pub struct PipelineContext {
    pub network: Arc<AnchorNetworkVariant>,
    pub source: Arc<DocumentSourceVariant>,
    pub archive: Arc<ProofArchive>,
    pub tasks: Arc<TaskStore>,
    pub config: BaseConfig,
    pub in_flight: Arc<tokio::sync::Mutex<HashSet<DocumentId>>>,
}

impl Anchorsmith {
    /// Create a new Anchorsmith over explicit seam implementations.
    pub fn new(
        intake: IntakeVariant,
        network: AnchorNetworkVariant,
        source: DocumentSourceVariant,
        config: BaseConfig,
        tasks: TaskStore,
    ) -> Self {
        Self {
            intake,
            network: Arc::new(network),
            source: Arc::new(source),
            config,
            tasks: Arc::new(tasks),
            in_flight: Arc::new(tokio::sync::Mutex::new(HashSet::new())),
        }
    }

    /// Initialize Anchorsmith with default Noop seams. Callers install
    /// the real (or mock) implementations before `run`.
    pub fn initialize(config: BaseConfig) -> Result<Self> {
        let tasks = TaskStore::open(&config.task_store_path)?;
        info!("Task store opened at: {}", config.task_store_path);

        Ok(Self::new(
            IntakeVariant::Noop(NoopIntake),
            AnchorNetworkVariant::Noop(NoopAnchorNetwork),
            DocumentSourceVariant::Noop(NoopSource),
            config,
            tasks,
        ))
    }

    /// Build the context spawned pipeline runs operate on. Called once
    /// the seams are finalized, so the archive binds the live source.
    pub fn context(&self) -> PipelineContext {
        PipelineContext {
            network: Arc::clone(&self.network),
            source: Arc::clone(&self.source),
            archive: Arc::new(ProofArchive::new(
                Arc::clone(&self.source),
                PathBuf::from(&self.config.spool_dir),
            )),
            tasks: Arc::clone(&self.tasks),
            config: self.config.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}
