use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::{CardProvider, FailureKind, FetchedCard, ProviderError};

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CardBody {
    metric: u64,
    #[serde(default)]
    url: Option<String>,
}

/// Card provider backed by a remote service that does the actual page work.
///
/// Cards are read from `GET {base}/profiles/{profile_ref}/cards/{index}`:
/// a 2xx JSON body `{"metric": .., "url": ..}` is a card, 404 means there is
/// no card at that index.
#[derive(Debug, Clone)]
pub struct HttpCardProvider {
    base_url: Url,
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl HttpCardProvider {
    pub fn new(base_url: &str, settings: ProviderSettings) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ProviderError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} cannot be used as a base url"),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ProviderError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            base_url,
            settings,
            client,
        })
    }

    fn card_url(&self, profile_ref: &str, index: u64) -> Result<Url, ProviderError> {
        let index = index.to_string();
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::new(
                    FailureKind::InvalidUrl,
                    format!("{} cannot be used as a base url", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(["profiles", profile_ref, "cards", index.as_str()]);
        Ok(url)
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, ProviderError> {
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(Some(content_len)));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    fn too_large(&self, actual: Option<u64>) -> ProviderError {
        ProviderError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl CardProvider for HttpCardProvider {
    async fn fetch(
        &self,
        profile_ref: &str,
        index: u64,
    ) -> Result<Option<FetchedCard>, ProviderError> {
        let url = self.card_url(profile_ref, index)?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = self.read_body(response).await?;
        if !status.is_success() {
            let reason = String::from_utf8_lossy(&body).trim().to_string();
            let kind = FailureKind::HttpStatus(status.as_u16());
            let error = ProviderError::new(kind, reason);
            if error.is_transient() {
                return Err(error);
            }
            return Err(ProviderError::new(FailureKind::Rejected, error.reason()));
        }

        let card: CardBody = serde_json::from_slice(&body)
            .map_err(|err| ProviderError::new(FailureKind::InvalidResponse, err.to_string()))?;
        let url = card.url.filter(|url| !url.trim().is_empty());
        Ok(Some(FetchedCard::new(card.metric, url, Utc::now())))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        return ProviderError::new(FailureKind::Timeout, err.to_string());
    }
    ProviderError::new(FailureKind::Network, err.to_string())
}
