//! Upload orchestration.
//!
//! Ties storage and transform providers together: the original goes to the
//! Space first, then size variants are produced and written back, and the
//! aggregated picture map is returned in a single response. Async provider
//! jobs are parked in a TTL store until their webhook fires.

pub mod callback;
pub mod orchestrator;
pub mod pending;

pub use callback::CallbackService;
pub use orchestrator::{
    Orchestrator, OrchestratorSettings, PipelineError, UploadOutcome, UploadRequest,
};
pub use pending::PendingStore;
