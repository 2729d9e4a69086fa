use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("card url is empty")]
    EmptyUrl,
    #[error("card url '{url}' is not a valid absolute url: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("card url '{url}' uses unsupported scheme '{scheme}'")]
    UnsupportedScheme { url: String, scheme: String },
}

/// One observed item of a profile's ordered sequence.
///
/// * `index`       - 0-based position in the provider's ordering
/// * `url`         - absolute http(s) locator of the media, when known
/// * `metric`      - saves/likes count used for the threshold decision
/// * `observed_at` - when the provider captured the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    index: u64,
    url: Option<String>,
    metric: u64,
    observed_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        index: u64,
        url: Option<String>,
        metric: u64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        if let Some(raw) = url.as_deref() {
            validate_url(raw)?;
        }
        Ok(Self {
            index,
            url,
            metric,
            observed_at,
        })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn metric(&self) -> u64 {
        self.metric
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

fn validate_url(raw: &str) -> Result<(), CardError> {
    if raw.trim().is_empty() {
        return Err(CardError::EmptyUrl);
    }
    let parsed = Url::parse(raw).map_err(|err| CardError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(CardError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}
