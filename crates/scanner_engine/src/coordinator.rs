use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use scanner_core::{
    evaluate, Observation, ScanConfig, ScanError, ScanOutcome, SessionState, StopReason,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CardProvider;

/// Inbound "continue scanning" request.
///
/// `next_index` is signed on purpose: it is whatever the caller sent, and a
/// negative value must be reported rather than wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueRequest {
    pub profile_ref: String,
    pub next_index: i64,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<u32>,
}

impl ContinueRequest {
    pub fn new(profile_ref: impl Into<String>, next_index: i64) -> Self {
        Self {
            profile_ref: profile_ref.into(),
            next_index,
            consecutive_failures: 0,
            max_failures: None,
        }
    }

    pub fn with_failures(mut self, consecutive_failures: u32) -> Self {
        self.consecutive_failures = consecutive_failures;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = Some(max_failures);
        self
    }
}

/// One evaluated cursor position: the outcome plus the state to carry forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStep {
    pub state: SessionState,
    pub outcome: ScanOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("cursor must be non-negative, got {0}")]
    InvalidCursor(i64),
    #[error("profile reference must not be empty")]
    EmptyProfile,
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Turns one request into exactly one provider fetch and one evaluation.
///
/// Holds no per-profile state; the caller owns the cursor.
#[derive(Clone)]
pub struct SessionCoordinator {
    provider: Arc<dyn CardProvider>,
    config: ScanConfig,
}

impl SessionCoordinator {
    pub fn new(provider: Arc<dyn CardProvider>, config: ScanConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> ScanConfig {
        self.config
    }

    pub async fn continue_scan(&self, request: &ContinueRequest) -> Result<ScanStep, CoordinatorError> {
        let cursor = u64::try_from(request.next_index)
            .map_err(|_| CoordinatorError::InvalidCursor(request.next_index))?;
        if request.profile_ref.trim().is_empty() {
            return Err(CoordinatorError::EmptyProfile);
        }
        let config = match request.max_failures {
            Some(max_failures) => self.config.with_max_failures(max_failures)?,
            None => self.config,
        };
        let state =
            SessionState::resume(cursor, request.consecutive_failures, config.max_failures())?;

        let observation = match self.provider.fetch(&request.profile_ref, cursor).await {
            Ok(Some(card)) => card.into_observation(),
            Ok(None) => Observation::Missing,
            Err(err) => {
                engine_warn!(
                    "Provider failed profile={} index={}: {}",
                    request.profile_ref,
                    cursor,
                    err
                );
                let reason = if err.is_transient() {
                    StopReason::ProviderUnavailable
                } else {
                    StopReason::Provider(err.reason())
                };
                return Ok(ScanStep {
                    state,
                    outcome: ScanOutcome::stopped(cursor, reason),
                });
            }
        };

        let (state, outcome) = match evaluate(state, observation, config.threshold()) {
            Ok(evaluated) => evaluated,
            Err(ScanError::InvalidCard(err)) => {
                engine_warn!(
                    "Skipping malformed card profile={} index={}: {}",
                    request.profile_ref,
                    cursor,
                    err
                );
                let next = cursor
                    .checked_add(1)
                    .ok_or(ScanError::CursorOverflow { cursor })?;
                (state, ScanOutcome::stopped(next, StopReason::InvalidCard))
            }
            Err(err) => return Err(err.into()),
        };
        log_step(&request.profile_ref, cursor, &state, &outcome);
        Ok(ScanStep { state, outcome })
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn log_step(profile_ref: &str, cursor: u64, state: &SessionState, outcome: &ScanOutcome) {
    match (outcome.card(), outcome.error()) {
        (Some(card), _) => engine_info!(
            "HIT profile={} index={} metric={} next={}",
            profile_ref,
            card.index(),
            card.metric(),
            outcome.next_index()
        ),
        (None, Some(reason)) => engine_info!(
            "STOP profile={} index={} reason={} next={} fails={}/{}",
            profile_ref,
            cursor,
            reason,
            outcome.next_index(),
            state.consecutive_failures(),
            state.max_failures()
        ),
        (None, None) => engine_debug!(
            "MISS profile={} index={} next={} fails={}/{}",
            profile_ref,
            cursor,
            outcome.next_index(),
            state.consecutive_failures(),
            state.max_failures()
        ),
    }
}
