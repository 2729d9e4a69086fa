use crate::ScanError;

/// Immutable scan policy, fixed for the lifetime of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    threshold: u64,
    max_failures: u32,
}

impl ScanConfig {
    /// Both values must be non-zero: a zero threshold makes every card a hit
    /// and a zero ceiling would stop before the first evaluation.
    pub fn new(threshold: u64, max_failures: u32) -> Result<Self, ScanError> {
        if threshold == 0 {
            return Err(ScanError::ZeroThreshold);
        }
        if max_failures == 0 {
            return Err(ScanError::ZeroMaxFailures);
        }
        Ok(Self {
            threshold,
            max_failures,
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// Same policy with a different failure ceiling, as requested per call.
    pub fn with_max_failures(self, max_failures: u32) -> Result<Self, ScanError> {
        Self::new(self.threshold, max_failures)
    }
}
