use std::fmt;

use chrono::{DateTime, Utc};
use scanner_core::Observation;

/// Card data as reported by a provider, before any threshold decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCard {
    pub metric: u64,
    pub url: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl FetchedCard {
    pub fn new(metric: u64, url: Option<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            metric,
            url,
            observed_at,
        }
    }

    pub fn into_observation(self) -> Observation {
        Observation::Found {
            metric: self.metric,
            url: self.url,
            observed_at: self.observed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failures worth replaying later with the identical request.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => code >= 500 || code == 408 || code == 429,
            FailureKind::InvalidUrl
            | FailureKind::InvalidResponse
            | FailureKind::TooLarge { .. }
            | FailureKind::Rejected => false,
        }
    }

    /// The provider's own wording, falling back to the failure kind.
    pub fn reason(&self) -> String {
        if self.message.trim().is_empty() {
            self.kind.to_string()
        } else {
            self.message.clone()
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    InvalidResponse,
    Rejected,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::Rejected => write!(f, "rejected by provider"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
