use chrono::{DateTime, Utc};

use crate::{Card, ScanError, ScanOutcome, SessionState, StopReason};

/// What the card provider reported for the cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// No card at this position, possibly only for now.
    Missing,
    Found {
        metric: u64,
        url: Option<String>,
        observed_at: DateTime<Utc>,
    },
}

/// Pure evaluation step: applies one observation to the session and returns
/// the updated state together with the outcome to hand back to the caller.
///
/// Rules, first match wins:
/// 1. `Missing` stops with `end_of_profile` and keeps the cursor.
/// 2. `metric >= threshold` is a hit; failures reset.
/// 3. A miss below the ceiling advances and counts the failure.
/// 4. A miss reaching the ceiling advances and signals `no_hits_after_limit`.
pub fn evaluate(
    state: SessionState,
    observation: Observation,
    threshold: u64,
) -> Result<(SessionState, ScanOutcome), ScanError> {
    if threshold == 0 {
        return Err(ScanError::ZeroThreshold);
    }

    let cursor = state.cursor();
    let (metric, url, observed_at) = match observation {
        Observation::Missing => {
            return Ok((state, ScanOutcome::stopped(cursor, StopReason::EndOfProfile)));
        }
        Observation::Found {
            metric,
            url,
            observed_at,
        } => (metric, url, observed_at),
    };

    let next_index = cursor
        .checked_add(1)
        .ok_or(ScanError::CursorOverflow { cursor })?;

    if metric >= threshold {
        let card = Card::new(cursor, url, metric, observed_at)?;
        return Ok((state.after_hit(next_index), ScanOutcome::hit(card, next_index)));
    }

    let limit_reached =
        state.consecutive_failures().saturating_add(1) >= state.max_failures();
    let outcome = if limit_reached {
        ScanOutcome::stopped(next_index, StopReason::NoHitsAfterLimit)
    } else {
        ScanOutcome::miss(next_index)
    };
    Ok((state.after_miss(next_index), outcome))
}
