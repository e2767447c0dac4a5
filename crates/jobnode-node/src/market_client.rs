//! HTTP client for the market lookup service.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use jobnode_core::{BoxError, Market, MarketSource};

use crate::error::NodeError;

/// [`MarketSource`] backed by a REST API.
pub struct HttpMarketClient {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpMarketClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BoxError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}: {path}").into());
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketSource for HttpMarketClient {
    async fn get_market(&self, id: &str) -> Result<Market, BoxError> {
        self.get_json(&format!("/markets/{id}")).await
    }

    async fn list_markets(&self) -> Result<Vec<Market>, BoxError> {
        self.get_json("/markets").await
    }
}

/// Look up a market, wrapping any source failure as [`NodeError::MarketFetch`].
pub async fn fetch_market(source: &dyn MarketSource, id: &str) -> Result<Market, NodeError> {
    let market = source
        .get_market(id)
        .await
        .map_err(|source| NodeError::MarketFetch { source })?;
    info!(market = %market.address, queue = market.queue_len(), "market fetched");
    Ok(market)
}

/// List all markets known to the source.
pub async fn list_markets(source: &dyn MarketSource) -> Result<Vec<Market>, NodeError> {
    source
        .list_markets()
        .await
        .map_err(|source| NodeError::MarketFetch { source })
}
