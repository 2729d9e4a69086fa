//! Scanner engine: card providers, the session coordinator and the resumable
//! scan runner built on top of it.
mod coordinator;
mod http_provider;
mod memory_provider;
mod persist;
mod provider;
mod runner;
mod schema;
mod types;

pub use coordinator::{ContinueRequest, CoordinatorError, ScanStep, SessionCoordinator};
pub use http_provider::{HttpCardProvider, ProviderSettings};
pub use memory_provider::MemoryCardProvider;
pub use persist::{ensure_output_dir, AtomicFileWriter, Checkpoint, CheckpointStore, PersistError};
pub use provider::{CardProvider, ProviderRegistry};
pub use runner::{RunError, RunLimits, RunStop, RunSummary, ScanRunner};
pub use schema::{HitRecord, ScanResponse};
pub use types::{FailureKind, FetchedCard, ProviderError};
