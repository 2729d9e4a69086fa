use chrono::SecondsFormat;
use scanner_core::Card;
use serde::{Deserialize, Serialize};

use crate::ScanStep;

/// Wire form of a [`ScanStep`]; everything a caller needs to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub hit: bool,
    pub next_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub consecutive_failures: u32,
}

impl From<&ScanStep> for ScanResponse {
    fn from(step: &ScanStep) -> Self {
        let card = step.outcome.card();
        Self {
            hit: step.outcome.is_hit(),
            next_index: step.outcome.next_index(),
            url: card.and_then(|card| card.url().map(str::to_string)),
            metric: card.map(Card::metric),
            error: step.outcome.error().map(ToString::to_string),
            consecutive_failures: step.state.consecutive_failures(),
        }
    }
}

/// A hit as reported by the scan runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRecord {
    pub index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub metric: u64,
    pub observed_at: String,
}

impl From<&Card> for HitRecord {
    fn from(card: &Card) -> Self {
        Self {
            index: card.index(),
            url: card.url().map(str::to_string),
            metric: card.metric(),
            observed_at: card.observed_at().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
