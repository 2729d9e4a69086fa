//! Scanner core: pure scan state machine and evaluation rules.
mod card;
mod config;
mod error;
mod evaluate;
mod outcome;
mod state;

pub use card::{Card, CardError};
pub use config::ScanConfig;
pub use error::ScanError;
pub use evaluate::{evaluate, Observation};
pub use outcome::{ScanOutcome, StopReason, PROVIDER_ERROR_PREFIX};
pub use state::SessionState;
