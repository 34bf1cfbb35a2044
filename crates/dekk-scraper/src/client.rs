use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::ScraperError;

/// HTTP client shared by the supplier adapters.
///
/// Every call is a single `GET` with `Accept: application/json` and a bounded
/// timeout. Nothing is retried: a failed call is reported to the adapter,
/// which logs it and moves on without that source's records.
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// Creates a `FeedClient` with the given request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` and decodes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnexpectedStatus`]: any status other than 200.
    /// - [`ScraperError::Http`]: network, timeout or TLS failure.
    /// - [`ScraperError::Deserialize`]: body is not valid JSON or does not
    ///   match the expected shape.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| ScraperError::Deserialize {
            context: format!("feed response from {url}"),
            source: e,
        })
    }
}

/// Appends a single query parameter to `base`, preserving any query it
/// already carries.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidFeedUrl`] if `base` is not an absolute URL.
pub fn with_query(base: &str, key: &str, value: &str) -> Result<String, ScraperError> {
    let mut url = reqwest::Url::parse(base).map_err(|e| ScraperError::InvalidFeedUrl {
        url: base.to_owned(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair(key, value);
    Ok(url.to_string())
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
