use std::collections::BTreeMap;

use log::info;
use serde_json::Value;
use thiserror::Error;

use crate::fetch::{FetchError, Fetcher, HttpFetcher};

#[derive(Error, Debug)]
pub enum StarError {
    #[error("Not Found: {0}")]
    InvalidOrigin(String),

    #[error("Bad star API url: {0}")]
    ApiUrl(String),

    #[error(transparent)]
    FetchError(#[from] FetchError),

    #[error("Malformed star payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Proxies the external star-count API for a batch of page URLs and
/// collapses each entry's star groups into a single integer.
pub struct StarAggregator<F: Fetcher> {
    fetcher: F,
    api_url: String,
    url_prefix: String,
}

pub type HttpStarAggregator = StarAggregator<HttpFetcher>;

impl<F: Fetcher> StarAggregator<F> {
    pub fn new(fetcher: F, api_url: String, url_prefix: String) -> Self {
        Self {
            fetcher,
            api_url,
            url_prefix,
        }
    }

    /// `urls` is the comma-separated batch from the query string. One
    /// URL outside the allow-listed origin fails the whole batch.
    pub async fn aggregate(&self, urls: &str) -> Result<BTreeMap<String, i64>, StarError> {
        let list: Vec<&str> = urls.split(',').collect();

        for url in &list {
            if !url.starts_with(&self.url_prefix) {
                return Err(StarError::InvalidOrigin(url.to_string()));
            }
        }

        let mut query_url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| StarError::ApiUrl(e.to_string()))?;
        query_url
            .query_pairs_mut()
            .extend_pairs(list.iter().map(|url| ("uri", *url)));

        info!("Querying star counts for {} urls", list.len());
        let body = self.fetcher.fetch(query_url.as_str()).await?;
        let document: Value = serde_json::from_slice(&body)?;

        Ok(aggregate_entries(&document))
    }
}

/// Sum star counts per entry. Each entry carries a `stars` group and
/// zero or more `colored_stars` groups, each with its own `stars`. A
/// star whose `count` is missing or not an integer counts as 1, not 0.
pub fn aggregate_entries(document: &Value) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();

    let entries = document
        .get("entries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    for entry in entries {
        let mut total = stars_total(entry.get("stars"));

        if let Some(colored) = entry.get("colored_stars").and_then(Value::as_array) {
            for group in colored {
                total += stars_total(group.get("stars"));
            }
        }

        let uri = entry.get("uri").and_then(Value::as_str).unwrap_or("");
        counts.insert(uri.to_string(), total);
    }

    counts
}

fn stars_total(stars: Option<&Value>) -> i64 {
    let Some(stars) = stars.and_then(Value::as_array) else {
        return 0;
    };

    stars
        .iter()
        .map(|star| star.get("count").and_then(Value::as_i64).unwrap_or(1))
        .sum()
}
