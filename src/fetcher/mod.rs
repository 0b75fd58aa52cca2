pub mod http_fetcher;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;

use crate::app::{AdlogError, Result};
use crate::config::HttpConfig;

pub use http_fetcher::HttpFetcher;

#[async_trait]
pub trait Fetcher {
    /// Fetch a page once and return its markup.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Build a client carrying the configured identity headers.
pub(crate) fn build_client(config: &HttpConfig, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let accept_language = HeaderValue::from_str(&config.accept_language)
        .map_err(|e| AdlogError::Config(format!("invalid accept_language: {}", e)))?;
    headers.insert(ACCEPT_LANGUAGE, accept_language);

    let client = Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .build()?;

    Ok(client)
}
