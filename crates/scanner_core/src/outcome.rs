use std::borrow::Cow;
use std::fmt;

use crate::Card;

/// Prefix that marks a raw provider message on the wire.
pub const PROVIDER_ERROR_PREFIX: &str = "provider_error: ";

/// Why an evaluation did not simply move on to the next card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The provider has no card at the cursor (yet).
    EndOfProfile,
    /// The consecutive-miss ceiling was reached.
    NoHitsAfterLimit,
    /// The provider could not be reached.
    ProviderUnavailable,
    /// The card met the threshold but could not be turned into a valid hit.
    /// The cursor moves past it.
    InvalidCard,
    /// Raw reason reported by the provider.
    Provider(String),
}

impl StopReason {
    /// Wire code. Provider messages carry [`PROVIDER_ERROR_PREFIX`], so a
    /// message can never read as one of the fixed codes.
    pub fn code(&self) -> Cow<'_, str> {
        match self {
            StopReason::EndOfProfile => Cow::Borrowed("end_of_profile"),
            StopReason::NoHitsAfterLimit => Cow::Borrowed("no_hits_after_limit"),
            StopReason::ProviderUnavailable => Cow::Borrowed("provider_unavailable"),
            StopReason::InvalidCard => Cow::Borrowed("invalid_card"),
            StopReason::Provider(message) => {
                Cow::Owned(format!("{PROVIDER_ERROR_PREFIX}{message}"))
            }
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Result of evaluating exactly one cursor position.
///
/// A hit always carries its card; the constructors are the only way to build
/// one, so `hit` without a card cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    hit: bool,
    next_index: u64,
    card: Option<Card>,
    error: Option<StopReason>,
}

impl ScanOutcome {
    pub fn hit(card: Card, next_index: u64) -> Self {
        Self {
            hit: true,
            next_index,
            card: Some(card),
            error: None,
        }
    }

    pub fn miss(next_index: u64) -> Self {
        Self {
            hit: false,
            next_index,
            card: None,
            error: None,
        }
    }

    pub fn stopped(next_index: u64, reason: StopReason) -> Self {
        Self {
            hit: false,
            next_index,
            card: None,
            error: Some(reason),
        }
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    pub fn error(&self) -> Option<&StopReason> {
        self.error.as_ref()
    }
}
