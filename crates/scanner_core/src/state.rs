use crate::ScanError;

/// Progress of one logical scan over one profile.
///
/// Built fresh for every request from caller-supplied values; the caller is
/// the durable store of the cursor and, when it wants failures to carry over,
/// of `consecutive_failures`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    cursor: u64,
    consecutive_failures: u32,
    max_failures: u32,
}

impl SessionState {
    /// Fresh session starting at `cursor` with no failures recorded.
    pub fn new(cursor: u64, max_failures: u32) -> Result<Self, ScanError> {
        Self::resume(cursor, 0, max_failures)
    }

    /// Continue a session whose failure count the caller carried forward.
    pub fn resume(
        cursor: u64,
        consecutive_failures: u32,
        max_failures: u32,
    ) -> Result<Self, ScanError> {
        if max_failures == 0 {
            return Err(ScanError::ZeroMaxFailures);
        }
        if consecutive_failures > max_failures {
            return Err(ScanError::FailuresAboveLimit {
                consecutive_failures,
                max_failures,
            });
        }
        Ok(Self {
            cursor,
            consecutive_failures,
            max_failures,
        })
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// True once the configured patience is used up.
    pub fn limit_reached(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }

    pub(crate) fn after_hit(self, next_index: u64) -> Self {
        Self {
            cursor: next_index,
            consecutive_failures: 0,
            ..self
        }
    }

    // Saturates at the ceiling so the at-rest invariant holds even when the
    // caller keeps scanning after a soft stop.
    pub(crate) fn after_miss(self, next_index: u64) -> Self {
        Self {
            cursor: next_index,
            consecutive_failures: self
                .consecutive_failures
                .saturating_add(1)
                .min(self.max_failures),
            ..self
        }
    }
}
