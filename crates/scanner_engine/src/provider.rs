use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{FetchedCard, ProviderError};

/// Supplies card data for a profile, one index at a time.
///
/// `Ok(None)` means there is no card at `index` right now. Implementations
/// must be safe to call repeatedly with the same arguments.
#[async_trait::async_trait]
pub trait CardProvider: Send + Sync {
    async fn fetch(
        &self,
        profile_ref: &str,
        index: u64,
    ) -> Result<Option<FetchedCard>, ProviderError>;
}

/// Providers keyed by platform name; callers pick one explicitly.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn CardProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, platform: impl Into<String>, provider: Arc<dyn CardProvider>) {
        self.providers
            .insert(platform.into().to_ascii_lowercase(), provider);
    }

    pub fn with(mut self, platform: impl Into<String>, provider: Arc<dyn CardProvider>) -> Self {
        self.register(platform, provider);
        self
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn CardProvider>> {
        self.providers.get(&platform.to_ascii_lowercase()).cloned()
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("platforms", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
