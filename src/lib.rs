// Library exports for testing and external use

pub mod archive;
pub mod config;
pub mod crypto;
pub mod error;
pub mod intake;
pub mod network;
pub mod pipeline;
pub mod poll;
pub mod source;
pub mod task_store;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod verify;

// Re-export commonly used types and traits
pub use config::BaseConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Anchorsmith, BundleReview, PipelineContext};
pub use task_store::TaskStore;
pub use traits::{AnchorNetwork, DocumentSource, EventIntake};
pub use types::{
    AnchorRequest, AnchorTask, ArchiveLocation, AttachmentMeta, BundleProof, Document, DocumentId,
    Fingerprint, NodeEndpoint, PollOutcome, Proof, ProofBundle, ProofHandle, ProofState,
    SubmissionOutcome, VerifiedProof,
};

// Re-export variant enums for convenience
pub use intake::{IntakeVariant, MockIntake, WebhookIntake};
pub use network::{AnchorNetworkVariant, HttpAnchorClient, MockAnchorNetwork};
pub use source::{DocumentSourceVariant, HttpDocumentSource, MockSource};
