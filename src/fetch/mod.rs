use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Request for {1} failed with status: {0}")]
    StatusError(u16, String),
}

/// Outbound byte fetching. The pipeline and the star aggregator only ever
/// need "give me the body bytes of this URL", so that is the whole seam;
/// tests substitute a canned implementation with a call counter.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: u64, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Request for {} failed with status: {}", url, status);
            return Err(FetchError::StatusError(status.as_u16(), url.to_string()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
