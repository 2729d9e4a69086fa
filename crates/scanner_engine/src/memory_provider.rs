use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::{CardProvider, FetchedCard, ProviderError};

#[derive(Debug, Default)]
struct Profile {
    cards: Vec<FetchedCard>,
    failure: Option<ProviderError>,
}

/// In-memory provider: each profile is a growable list of cards.
///
/// Appending cards models a profile that loads more content later; a
/// configured failure is returned for every fetch until cleared.
#[derive(Debug, Default)]
pub struct MemoryCardProvider {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MemoryCardProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a profile from bare metrics, with generated media urls.
    pub fn with_metrics(self, profile_ref: &str, metrics: &[u64]) -> Self {
        let observed_at = Utc::now();
        for &metric in metrics {
            self.push_metric(profile_ref, metric, observed_at);
        }
        self
    }

    pub fn push_card(&self, profile_ref: &str, card: FetchedCard) {
        self.lock()
            .entry(profile_ref.to_string())
            .or_default()
            .cards
            .push(card);
    }

    pub fn push_metric(&self, profile_ref: &str, metric: u64, observed_at: DateTime<Utc>) {
        let mut profiles = self.lock();
        let profile = profiles.entry(profile_ref.to_string()).or_default();
        let index = profile.cards.len();
        let url = format!("https://media.example.com/{profile_ref}/{index}.webp");
        profile
            .cards
            .push(FetchedCard::new(metric, Some(url), observed_at));
    }

    pub fn fail_with(&self, profile_ref: &str, error: ProviderError) {
        self.lock()
            .entry(profile_ref.to_string())
            .or_default()
            .failure = Some(error);
    }

    pub fn clear_failure(&self, profile_ref: &str) {
        if let Some(profile) = self.lock().get_mut(profile_ref) {
            profile.failure = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Profile>> {
        // A panicked writer cannot leave a half-pushed card behind.
        self.profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl CardProvider for MemoryCardProvider {
    async fn fetch(
        &self,
        profile_ref: &str,
        index: u64,
    ) -> Result<Option<FetchedCard>, ProviderError> {
        let profiles = self.lock();
        let Some(profile) = profiles.get(profile_ref) else {
            return Ok(None);
        };
        if let Some(error) = &profile.failure {
            return Err(error.clone());
        }
        let card = usize::try_from(index)
            .ok()
            .and_then(|index| profile.cards.get(index))
            .cloned();
        Ok(card)
    }
}
