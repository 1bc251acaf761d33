//! Wire contract and HTTP transport for the geocoding/place-search provider.
//!
//! Both endpoints share one shape: `GET {base}/{segment}.json?access_token=…`
//! answering with a `features` array. The clients in [`super::geocoding`] and
//! [`super::places`] build URLs through [`ProviderConfig::endpoint`] and hand them
//! to a [`ProviderTransport`], which keeps the network out of unit tests.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::ProviderConfig;

use super::domain::Coordinate;

const ERROR_BODY_PREVIEW: usize = 200;

/// Escapes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`. The provider
/// reads a literal `;` as a batch separator, so it must never pass through.
const QUERY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Provider response body.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<ProviderFeature>,
}

/// One entry of the provider's `features` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderFeature {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub place_name: String,
    pub center: [f64; 2],
    #[serde(default)]
    pub properties: FeatureProperties,
}

impl ProviderFeature {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.center[0], self.center[1])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
    #[error("provider base url '{0}' cannot take path segments")]
    InvalidUrl(String),
}

/// Fetches and decodes one provider URL.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn fetch(&self, url: Url) -> Result<FeatureCollection, ProviderError>;
}

impl ProviderConfig {
    /// Builds `{base}/{segment}.json` with the access token and extra query
    /// parameters. The segment is percent-encoded as a single path component.
    pub fn endpoint(&self, segment: &str, params: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        if url.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(self.base_url.to_string()));
        }

        let path = format!(
            "{}/{}.json",
            url.path().trim_end_matches('/'),
            utf8_percent_encode(segment, QUERY_SEGMENT)
        );
        url.set_path(&path);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("access_token", &self.access_token);
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

/// Renders a provider URL for logs without the access token.
pub fn redacted(url: &Url) -> String {
    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != "access_token")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if pairs.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(pairs);
    }
    clean.to_string()
}

/// `reqwest`-backed transport with the configured per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn fetch(&self, url: Url) -> Result<FeatureCollection, ProviderError> {
        debug!(url = %redacted(&url), "provider request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        response
            .json::<FeatureCollection>()
            .await
            .map_err(|err| ProviderError::Decode(err.without_url().to_string()))
    }
}
