use chrono::{Local, NaiveDate};
use engine_logging::{engine_info, engine_warn};
use scanner_core::{Card, StopReason};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{Checkpoint, CheckpointStore, CoordinatorError, PersistError, SessionCoordinator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop once the checkpoint has recorded this many hits today.
    pub daily_hits: Option<u64>,
    /// Stop after this many evaluated positions in one run.
    pub max_steps: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    EndOfProfile,
    NoHitsAfterLimit,
    ProviderFailure(StopReason),
    HitLimit,
    StepLimit,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stop: RunStop,
    pub checkpoint: Checkpoint,
    pub steps: u64,
    pub hits: Vec<Card>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("checkpoint belongs to {found_platform}/{found_profile}, not {platform}/{profile_ref}")]
    CheckpointMismatch {
        platform: String,
        profile_ref: String,
        found_platform: String,
        found_profile: String,
    },
}

/// Drives a coordinator over one profile until something tells it to stop.
///
/// Progress is written to the checkpoint store after every evaluated
/// position, so a run can be interrupted at any point and resumed later.
pub struct ScanRunner {
    coordinator: SessionCoordinator,
    store: Option<CheckpointStore>,
    limits: RunLimits,
    cancel: CancellationToken,
    new_session: bool,
    today: Option<NaiveDate>,
}

impl ScanRunner {
    pub fn new(coordinator: SessionCoordinator) -> Self {
        Self {
            coordinator,
            store: None,
            limits: RunLimits::default(),
            cancel: CancellationToken::new(),
            new_session: false,
            today: None,
        }
    }

    pub fn with_store(mut self, store: CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Treat a resumed checkpoint as a new logical session: failures restart at 0.
    pub fn new_session(mut self, new_session: bool) -> Self {
        self.new_session = new_session;
        self
    }

    /// Pins the calendar day used for the daily hit limit.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub async fn run(
        &self,
        platform: &str,
        profile_ref: &str,
        start_index: u64,
    ) -> Result<RunSummary, RunError> {
        let mut checkpoint = self.initial_checkpoint(platform, profile_ref, start_index)?;
        engine_info!(
            "Scan run platform={} profile={} from index={} fails={}",
            platform,
            profile_ref,
            checkpoint.next_index,
            checkpoint.consecutive_failures
        );

        let mut steps = 0u64;
        let mut hits = Vec::new();
        let stop = loop {
            if self.cancel.is_cancelled() {
                break RunStop::Cancelled;
            }
            let today = self.today();
            if self
                .limits
                .daily_hits
                .is_some_and(|max| checkpoint.hits_on(today) >= max)
            {
                break RunStop::HitLimit;
            }
            if self.limits.max_steps.is_some_and(|max| steps >= max) {
                break RunStop::StepLimit;
            }

            let request = checkpoint.to_request();
            // Dropping an in-flight fetch loses nothing: the checkpoint only
            // moves once a step has completed.
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break RunStop::Cancelled,
                step = self.coordinator.continue_scan(&request) => step?,
            };

            steps += 1;
            checkpoint.apply(&step, today);
            self.save(&checkpoint)?;

            if let Some(card) = step.outcome.card() {
                hits.push(card.clone());
            }
            match step.outcome.error() {
                // The cursor has already moved past a malformed card.
                None | Some(StopReason::InvalidCard) => {}
                Some(StopReason::EndOfProfile) => break RunStop::EndOfProfile,
                Some(StopReason::NoHitsAfterLimit) => break RunStop::NoHitsAfterLimit,
                Some(reason) => {
                    engine_warn!("Scan run halted by provider: {}", reason);
                    break RunStop::ProviderFailure(reason.clone());
                }
            }
        };

        engine_info!(
            "Scan run stopped: {:?} steps={} hits={} next_index={}",
            stop,
            steps,
            hits.len(),
            checkpoint.next_index
        );
        Ok(RunSummary {
            stop,
            checkpoint,
            steps,
            hits,
        })
    }

    fn initial_checkpoint(
        &self,
        platform: &str,
        profile_ref: &str,
        start_index: u64,
    ) -> Result<Checkpoint, RunError> {
        let loaded = match &self.store {
            Some(store) => store.load()?,
            None => None,
        };
        let mut checkpoint = match loaded {
            Some(found) if found.matches(platform, profile_ref) => {
                engine_info!("Resuming from checkpoint at index={}", found.next_index);
                found
            }
            Some(found) => {
                return Err(RunError::CheckpointMismatch {
                    platform: platform.to_string(),
                    profile_ref: profile_ref.to_string(),
                    found_platform: found.platform,
                    found_profile: found.profile_ref,
                });
            }
            None => Checkpoint::new(platform, profile_ref, start_index),
        };
        if self.new_session {
            checkpoint.consecutive_failures = 0;
        }
        let max_failures = self.coordinator.config().max_failures();
        if checkpoint.consecutive_failures > max_failures {
            engine_warn!(
                "Checkpoint failures {} exceed max_failures {}; clamping",
                checkpoint.consecutive_failures,
                max_failures
            );
            checkpoint.consecutive_failures = max_failures;
        }
        Ok(checkpoint)
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistError> {
        match &self.store {
            Some(store) => store.save(checkpoint),
            None => Ok(()),
        }
    }
}
