//! Page fetching.

use std::net::SocketAddr;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::CrawlError;

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub text: String,
    /// Address of the server that answered.
    pub remote_addr: Option<SocketAddr>,
}

impl FetchedPage {
    /// Server IP as text, or empty when unknown.
    pub fn ip(&self) -> String {
        self.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }
}

/// Fetch collaborator.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError>;
}

/// `reqwest` backed fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, CrawlError> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| CrawlError::Config(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let fetch_error = |message: String| CrawlError::Fetch {
            url: url.to_string(),
            message,
        };

        let url = url::Url::parse(url).map_err(|e| fetch_error(format!("invalid URL: {}", e)))?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let remote_addr = response.remote_addr();
        let text = response
            .text()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?;

        debug!("Fetched {} ({} bytes)", final_url, text.len());
        Ok(FetchedPage {
            url: final_url,
            text,
            remote_addr,
        })
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
